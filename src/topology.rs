// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Topology Management
//!
//! Declarations are collected with the [`Topology`] builder methods and sent to
//! the broker in one [`Topology::install`] call. Queues carrying a retry queue or
//! a DLQ get their companion queues declared alongside.

use crate::{
    errors::AmqpError,
    exchange::ExchangeDefinition,
    queue::{QueueBinding, QueueDefinition},
};
use async_trait::async_trait;
use lapin::{
    options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions},
    types::FieldTable,
    Channel, ExchangeKind,
};
use std::sync::Arc;
use tracing::{debug, error};

/// Collects declarations and installs them on the broker.
#[async_trait]
pub trait Topology {
    /// Adds an exchange definition to the topology.
    fn exchange(self, def: ExchangeDefinition) -> Self;

    /// Adds a queue definition to the topology.
    fn queue(self, def: QueueDefinition) -> Self;

    /// Adds a queue-to-exchange binding to the topology.
    fn queue_binding(self, binding: QueueBinding) -> Self;

    /// Installs the topology to the RabbitMQ server.
    ///
    /// Declarations are idempotent on the broker as long as the arguments match
    /// what is already declared.
    async fn install(&self) -> Result<(), AmqpError>;
}

pub struct AmqpTopology {
    channel: Arc<Channel>,
    pub(crate) queues: Vec<QueueDefinition>,
    pub(crate) queues_binding: Vec<QueueBinding>,
    pub(crate) exchanges: Vec<ExchangeDefinition>,
}

impl AmqpTopology {
    pub fn new(channel: Arc<Channel>) -> AmqpTopology {
        AmqpTopology {
            channel,
            queues: vec![],
            queues_binding: vec![],
            exchanges: vec![],
        }
    }
}

#[async_trait]
impl Topology for AmqpTopology {
    fn exchange(mut self, def: ExchangeDefinition) -> Self {
        self.exchanges.push(def);
        self
    }

    fn queue(mut self, def: QueueDefinition) -> Self {
        self.queues.push(def);
        self
    }

    fn queue_binding(mut self, binding: QueueBinding) -> Self {
        self.queues_binding.push(binding);
        self
    }

    /// Exchanges first, then queues, then bindings.
    async fn install(&self) -> Result<(), AmqpError> {
        self.install_exchange().await?;
        self.install_queue().await?;
        self.binding_queues().await
    }
}

impl AmqpTopology {
    async fn install_exchange(&self) -> Result<(), AmqpError> {
        for exch in &self.exchanges {
            let options = ExchangeDeclareOptions {
                durable: exch.durable,
                ..ExchangeDeclareOptions::default()
            };

            self.channel
                .exchange_declare(&exch.name, ExchangeKind::Direct, options, FieldTable::default())
                .await
                .map_err(|err| {
                    error!(error = err.to_string(), exchange = %exch.name, "exchange declaration failed");
                    AmqpError::DeclareExchangeError(exch.name.clone())
                })?;

            debug!(exchange = %exch.name, durable = exch.durable, "exchange declared");
        }

        Ok(())
    }

    /// Declares every queue. The DLQ and the retry queue of a definition go
    /// first so the dead-letter target of the main queue already exists.
    async fn install_queue(&self) -> Result<(), AmqpError> {
        for def in &self.queues {
            if let Some(dlq_name) = &def.dlq_name {
                self.declare(def, dlq_name, FieldTable::default()).await?;
            }

            if let Some(retry_name) = &def.retry_name {
                self.declare(def, retry_name, FieldTable::from(def.retry_arguments()))
                    .await?;
            }

            self.declare(def, &def.name, FieldTable::from(def.arguments()))
                .await?;
        }

        Ok(())
    }

    /// Declares `name` with the durability of `def`.
    async fn declare(
        &self,
        def: &QueueDefinition,
        name: &str,
        args: FieldTable,
    ) -> Result<(), AmqpError> {
        let options = QueueDeclareOptions {
            durable: def.durable,
            ..QueueDeclareOptions::default()
        };

        self.channel
            .queue_declare(name, options, args)
            .await
            .map_err(|err| {
                error!(error = err.to_string(), queue = name, "queue declaration failed");
                AmqpError::DeclareQueueError(name.to_owned())
            })?;

        debug!(queue = name, durable = def.durable, "queue declared");
        Ok(())
    }

    async fn binding_queues(&self) -> Result<(), AmqpError> {
        for binding in &self.queues_binding {
            self.channel
                .queue_bind(
                    &binding.queue_name,
                    &binding.exchange_name,
                    &binding.routing_key,
                    QueueBindOptions { nowait: false },
                    FieldTable::default(),
                )
                .await
                .map_err(|err| {
                    error!(
                        error = err.to_string(),
                        queue = %binding.queue_name,
                        exchange = %binding.exchange_name,
                        "queue binding failed"
                    );
                    AmqpError::BindingExchangeToQueueError(
                        binding.exchange_name.clone(),
                        binding.queue_name.clone(),
                    )
                })?;

            debug!(
                queue = %binding.queue_name,
                exchange = %binding.exchange_name,
                routing_key = %binding.routing_key,
                "queue bound"
            );
        }

        Ok(())
    }
}

