// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Queue Management for RabbitMQ
//!
//! This module provides types for defining RabbitMQ queues and their bindings.
//! A queue may carry a retry queue and a Dead Letter Queue (DLQ); both are plain
//! queues on the default exchange, linked to the main queue with
//! `x-dead-letter-*` arguments.

use lapin::types::{AMQPValue, LongInt, LongString, ShortString};
use std::collections::BTreeMap;

/// Constant for the header field used to specify a dead letter exchange
pub const AMQP_HEADERS_DEAD_LETTER_EXCHANGE: &str = "x-dead-letter-exchange";
/// Constant for the header field used to specify a dead letter routing key
pub const AMQP_HEADERS_DEAD_LETTER_ROUTING_KEY: &str = "x-dead-letter-routing-key";
/// Constant for the header field used to specify message TTL
pub const AMQP_HEADERS_MESSAGE_TTL: &str = "x-message-ttl";

/// Definition of a RabbitMQ queue with its configuration parameters.
///
/// This struct implements the builder pattern. Retry and DLQ names are derived
/// from the queue name (`<name>-retry`, `<name>-dlq`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueDefinition {
    pub(crate) name: String,
    pub(crate) durable: bool,
    pub(crate) dlq_name: Option<String>,
    pub(crate) retry_name: Option<String>,
    pub(crate) retry_ttl: Option<u32>,
    pub(crate) retries: Option<u32>,
}

impl QueueDefinition {
    /// Creates a new queue definition with the given name.
    ///
    /// By default, the queue is non-durable and has neither a retry queue nor a
    /// DLQ.
    pub fn new(name: &str) -> QueueDefinition {
        QueueDefinition {
            name: name.to_owned(),
            ..QueueDefinition::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_durable(&self) -> bool {
        self.durable
    }

    pub fn dlq_name(&self) -> Option<&str> {
        self.dlq_name.as_deref()
    }

    pub fn retry_name(&self) -> Option<&str> {
        self.retry_name.as_deref()
    }

    /// Maximum redeliveries through the retry queue, `0` without one.
    pub fn retries(&self) -> u32 {
        self.retries.unwrap_or_default()
    }

    /// Makes the queue durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }

    /// Adds a Dead Letter Queue (DLQ) to the queue.
    ///
    /// The DLQ receives messages that failed permanently or ran out of retries.
    pub fn with_dlq(mut self) -> Self {
        self.dlq_name = Some(format!("{}-dlq", self.name));
        self
    }

    /// Adds a retry queue to the queue.
    ///
    /// Rejected messages wait `ttl` milliseconds in `<name>-retry` and then go
    /// back to this queue, at most `retries` times.
    pub fn with_retry(mut self, ttl: u32, retries: u32) -> Self {
        self.retry_name = Some(format!("{}-retry", self.name));
        self.retries = Some(retries);
        self.retry_ttl = Some(ttl);
        self
    }

    /// Declaration arguments of the main queue.
    ///
    /// Rejected messages are dead-lettered to the retry queue when there is one,
    /// otherwise to the DLQ.
    pub(crate) fn arguments(&self) -> BTreeMap<ShortString, AMQPValue> {
        let mut args = BTreeMap::new();

        let target = self.retry_name.as_ref().or(self.dlq_name.as_ref());
        if let Some(target) = target {
            dead_letter_to(&mut args, target);
        }

        args
    }

    /// Declaration arguments of the retry queue: expired messages return to the
    /// main queue.
    pub(crate) fn retry_arguments(&self) -> BTreeMap<ShortString, AMQPValue> {
        let mut args = BTreeMap::new();

        dead_letter_to(&mut args, &self.name);
        let ttl = LongInt::try_from(self.retry_ttl.unwrap_or_default()).unwrap_or(LongInt::MAX);
        args.insert(
            ShortString::from(AMQP_HEADERS_MESSAGE_TTL),
            AMQPValue::LongInt(ttl),
        );

        args
    }
}

fn dead_letter_to(args: &mut BTreeMap<ShortString, AMQPValue>, queue: &str) {
    args.insert(
        ShortString::from(AMQP_HEADERS_DEAD_LETTER_EXCHANGE),
        AMQPValue::LongString(LongString::from("")),
    );
    args.insert(
        ShortString::from(AMQP_HEADERS_DEAD_LETTER_ROUTING_KEY),
        AMQPValue::LongString(LongString::from(queue)),
    );
}

/// Configuration for binding a queue to an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueBinding {
    pub(crate) queue_name: String,
    pub(crate) exchange_name: String,
    pub(crate) routing_key: String,
}

impl QueueBinding {
    /// Creates a new queue binding for the given queue.
    ///
    /// The exchange name and routing key start empty and are set with
    /// [`QueueBinding::exchange`] and [`QueueBinding::routing_key`].
    pub fn new(queue: &str) -> QueueBinding {
        QueueBinding {
            queue_name: queue.to_owned(),
            exchange_name: String::new(),
            routing_key: String::new(),
        }
    }

    /// Sets the exchange to bind the queue to.
    pub fn exchange(mut self, exchange: &str) -> Self {
        self.exchange_name = exchange.to_owned();
        self
    }

    /// Sets the routing key for the binding.
    pub fn routing_key(mut self, key: &str) -> Self {
        self.routing_key = key.to_owned();
        self
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn exchange_name(&self) -> &str {
        &self.exchange_name
    }

    pub fn key(&self) -> &str {
        &self.routing_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long_string(args: &BTreeMap<ShortString, AMQPValue>, key: &str) -> Option<String> {
        match args.get(&ShortString::from(key)) {
            Some(AMQPValue::LongString(v)) => Some(String::from_utf8_lossy(v.as_bytes()).into_owned()),
            _ => None,
        }
    }

    #[test]
    fn plain_queue_has_no_arguments() {
        let def = QueueDefinition::new("cdb").durable();

        assert!(def.is_durable());
        assert!(def.arguments().is_empty());
        assert_eq!(def.retries(), 0);
    }

    #[test]
    fn derives_companion_names() {
        let def = QueueDefinition::new("cdb").with_dlq().with_retry(1000, 3);

        assert_eq!(def.dlq_name(), Some("cdb-dlq"));
        assert_eq!(def.retry_name(), Some("cdb-retry"));
        assert_eq!(def.retries(), 3);
    }

    #[test]
    fn dlq_only_dead_letters_to_dlq() {
        let args = QueueDefinition::new("cdb").with_dlq().arguments();

        assert_eq!(long_string(&args, AMQP_HEADERS_DEAD_LETTER_EXCHANGE).as_deref(), Some(""));
        assert_eq!(
            long_string(&args, AMQP_HEADERS_DEAD_LETTER_ROUTING_KEY).as_deref(),
            Some("cdb-dlq")
        );
    }

    #[test]
    fn retry_takes_precedence_over_dlq() {
        let def = QueueDefinition::new("cdb").with_dlq().with_retry(2500, 2);

        let args = def.arguments();
        assert_eq!(
            long_string(&args, AMQP_HEADERS_DEAD_LETTER_ROUTING_KEY).as_deref(),
            Some("cdb-retry")
        );

        let retry = def.retry_arguments();
        assert_eq!(
            long_string(&retry, AMQP_HEADERS_DEAD_LETTER_ROUTING_KEY).as_deref(),
            Some("cdb")
        );
        assert_eq!(
            retry.get(&ShortString::from(AMQP_HEADERS_MESSAGE_TTL)),
            Some(&AMQPValue::LongInt(2500))
        );
    }

    #[test]
    fn binding_builder() {
        let binding = QueueBinding::new("cdb")
            .exchange("fixed-income")
            .routing_key("cdb.created");

        assert_eq!(binding.queue_name(), "cdb");
        assert_eq!(binding.exchange_name(), "fixed-income");
        assert_eq!(binding.key(), "cdb.created");
    }
}
