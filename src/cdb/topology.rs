// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! The fixed-income topology: one durable direct exchange, one durable queue and
//! the binding between them, all named from configuration.

use crate::{
    configs::Configs,
    dispatcher::DispatchOptions,
    errors::AmqpError,
    exchange::ExchangeDefinition,
    queue::{QueueBinding, QueueDefinition},
    topology::{AmqpTopology, Topology},
};
use lapin::Channel;
use std::sync::Arc;
use tracing::info;

/// Declarations shared by the producer and the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedIncomeTopology {
    pub exchange: ExchangeDefinition,
    pub queue: QueueDefinition,
    pub binding: QueueBinding,
    pub dispatch: DispatchOptions,
}

impl FixedIncomeTopology {
    pub fn from_configs(cfg: &Configs) -> FixedIncomeTopology {
        let names = &cfg.fixed_income.queue;
        let consumer = &cfg.consumer;

        let exchange = ExchangeDefinition::new(&names.exchange).durable();

        let mut queue = QueueDefinition::new(&names.name).durable();
        if consumer.dead_letter {
            queue = queue.with_dlq();
        }
        if consumer.retries > 0 {
            queue = queue.with_retry(consumer.retry_ttl_ms, consumer.retries);
        }

        let binding = QueueBinding::new(&names.name)
            .exchange(&names.exchange)
            .routing_key(&names.routing_key);

        let dispatch = DispatchOptions {
            prefetch: consumer.prefetch,
            concurrency: consumer.concurrency,
        };

        FixedIncomeTopology {
            exchange,
            queue,
            binding,
            dispatch,
        }
    }

    pub fn queue_name(&self) -> &str {
        self.queue.name()
    }

    pub fn exchange_name(&self) -> &str {
        self.exchange.name()
    }

    /// Routing key used both for the binding and for publishing.
    pub fn routing_key(&self) -> &str {
        self.binding.key()
    }

    /// Declares the exchange, the queue with its companions and the binding.
    pub async fn install(&self, channel: Arc<Channel>) -> Result<(), AmqpError> {
        AmqpTopology::new(channel)
            .exchange(self.exchange.clone())
            .queue(self.queue.clone())
            .queue_binding(self.binding.clone())
            .install()
            .await?;

        info!(
            exchange = self.exchange_name(),
            queue = self.queue_name(),
            routing_key = self.routing_key(),
            "fixed-income topology installed"
        );

        Ok(())
    }
}
