// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Dispatcher
//!
//! This module consumes messages from RabbitMQ queues and hands them to the
//! handler subscribed on each queue. One lapin consumer is created per
//! subscription; deliveries of a subscription are processed with at most
//! `concurrency` in flight, so a concurrency of one keeps queue order.

use crate::{
    consumer::consume,
    messaging::{
        dispatcher::{Dispatcher, Shutdown},
        errors::MessagingError,
        handler::ConsumerHandler,
    },
    queue::QueueDefinition,
};
use async_trait::async_trait;
use futures_util::{future::join_all, StreamExt};
use lapin::{
    options::{BasicConsumeOptions, BasicQosOptions},
    types::FieldTable,
    Channel,
};
use opentelemetry::global;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Links a queue definition with the handler of its messages.
#[derive(Clone)]
pub struct RabbitMQDispatcherDefinition {
    pub(crate) queue_def: QueueDefinition,
    pub(crate) handler: Arc<dyn ConsumerHandler>,
}

/// How deliveries are pulled from the broker and fanned out to handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// `basic.qos` prefetch count for the channel.
    pub prefetch: u16,
    /// Deliveries processed at once per subscription.
    pub concurrency: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        DispatchOptions {
            prefetch: 1,
            concurrency: 1,
        }
    }
}

/// RabbitMQ implementation of the Dispatcher trait.
pub struct RabbitMQDispatcher {
    channel: Arc<Channel>,
    queues_def: Vec<QueueDefinition>,
    options: DispatchOptions,
    pub(crate) dispatchers_def: Vec<RabbitMQDispatcherDefinition>,
}

impl RabbitMQDispatcher {
    /// Creates a new RabbitMQ dispatcher.
    ///
    /// # Parameters
    /// * `channel` - A channel to the RabbitMQ server
    /// * `queues_def` - Definitions of the queues that can be subscribed to; they
    ///   carry the retry and DLQ settings used when settling deliveries
    /// * `options` - Prefetch and concurrency
    pub fn new(
        channel: Arc<Channel>,
        queues_def: Vec<QueueDefinition>,
        options: DispatchOptions,
    ) -> Self {
        RabbitMQDispatcher {
            channel,
            queues_def,
            options,
            dispatchers_def: vec![],
        }
    }
}

#[async_trait]
impl Dispatcher for RabbitMQDispatcher {
    /// Registers `handler` for the queue named `queue`.
    ///
    /// A queue missing from the known definitions is consumed with plain
    /// settings: no retry queue and no DLQ.
    fn subscribe(mut self, queue: &str, handler: Arc<dyn ConsumerHandler>) -> Self {
        let queue_def = self
            .queues_def
            .iter()
            .find(|def| def.name == queue)
            .cloned()
            .unwrap_or_else(|| QueueDefinition::new(queue));

        self.dispatchers_def
            .retain(|def| def.queue_def.name != queue_def.name);
        self.dispatchers_def
            .push(RabbitMQDispatcherDefinition { queue_def, handler });

        self
    }

    /// Starts one consumer per subscription and processes deliveries until every
    /// stream ends or `shutdown` resolves. On shutdown the consumers are
    /// cancelled; deliveries in flight are dropped unacked and redelivered by the
    /// broker.
    async fn consume_until(&self, shutdown: Shutdown) -> Result<(), MessagingError> {
        if self.dispatchers_def.is_empty() {
            return Err(MessagingError::NoSubscriptionError);
        }

        if let Err(err) = self
            .channel
            .basic_qos(self.options.prefetch, BasicQosOptions { global: false })
            .await
        {
            error!(error = err.to_string(), "failure to configure qos");
            return Err(MessagingError::ConsumerConfigurationError(err.to_string()));
        }

        let mut spawns = vec![];

        for def in &self.dispatchers_def {
            let consumer_tag = format!("{}-{}", def.queue_def.name, uuid::Uuid::new_v4());

            let consumer = match self
                .channel
                .basic_consume(
                    &def.queue_def.name,
                    &consumer_tag,
                    BasicConsumeOptions {
                        no_local: false,
                        no_ack: false,
                        exclusive: false,
                        nowait: false,
                    },
                    FieldTable::default(),
                )
                .await
            {
                Err(err) => {
                    error!(error = err.to_string(), "failure to create the consumer");
                    Err(MessagingError::CreatingConsumerError)
                }
                Ok(c) => Ok(c),
            }?;

            info!(
                queue = %def.queue_def.name,
                consumer_tag,
                concurrency = self.options.concurrency,
                "consuming"
            );

            let def = def.clone();
            let channel = self.channel.clone();
            let concurrency = self.options.concurrency.max(1);

            spawns.push(tokio::spawn(async move {
                consumer
                    .for_each_concurrent(concurrency, |result| {
                        let def = def.clone();
                        let channel = channel.clone();
                        async move {
                            match result {
                                Ok(delivery) => {
                                    let tracer = global::tracer("amqp consumer");
                                    if let Err(err) = consume(&tracer, &delivery, &def, channel).await
                                    {
                                        error!(error = err.to_string(), "error consume msg");
                                    }
                                }

                                Err(err) => error!(error = err.to_string(), "errors consume msg"),
                            }
                        }
                    })
                    .await;
            }));
        }

        let aborts: Vec<_> = spawns.iter().map(|s| s.abort_handle()).collect();

        tokio::select! {
            spawned = join_all(spawns) => {
                for res in spawned {
                    if let Err(err) = res {
                        error!(error = err.to_string(), "tokio process error");
                        return Err(MessagingError::InternalError);
                    }
                }
                debug!("all consumers finished");
            }

            _ = shutdown => {
                info!("shutdown requested, stopping consumers");
                for abort in aborts {
                    abort.abort();
                }
            }
        }

        Ok(())
    }
}
