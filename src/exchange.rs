// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Exchange Management for RabbitMQ
//!
//! Exchanges are the routing mechanism in RabbitMQ that determine how messages are
//! distributed to queues. Registrations travel point to point, so every exchange
//! declared here is a Direct exchange: a message reaches the queues whose binding
//! key equals its routing key, and nothing else.

/// Definition of a Direct exchange installed by [`crate::topology::AmqpTopology`].
///
/// New definitions are non-durable; use [`ExchangeDefinition::durable`] to keep
/// the exchange across broker restarts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeDefinition {
    pub(crate) name: String,
    pub(crate) durable: bool,
}

impl ExchangeDefinition {
    /// Creates a new exchange definition with the given name.
    pub fn new(name: &str) -> ExchangeDefinition {
        ExchangeDefinition {
            name: name.to_owned(),
            durable: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_durable(&self) -> bool {
        self.durable
    }

    /// Makes the exchange durable, persisting across broker restarts.
    pub fn durable(mut self) -> Self {
        self.durable = true;
        self
    }
}
