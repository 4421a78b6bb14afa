// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use super::{
    codec::JsonCodec, registry::CdbRegistry, topology::FixedIncomeTopology, CDB_REGISTRY_CREATED,
};
use crate::messaging::{
    errors::MessagingError,
    publisher::{PublishMessage, Publisher},
};
use opentelemetry::Context;
use std::sync::Arc;
use tracing::{error, info};

/// Publishes registrations to the fixed-income exchange.
///
/// The routing key is the one the queue is bound with, so every published
/// registration lands in the fixed-income queue.
pub struct CdbRegistryProducer {
    publisher: Arc<dyn Publisher>,
    codec: JsonCodec,
    exchange: String,
    routing_key: String,
}

impl CdbRegistryProducer {
    pub fn new(publisher: Arc<dyn Publisher>, topology: &FixedIncomeTopology) -> Self {
        CdbRegistryProducer {
            publisher,
            codec: JsonCodec,
            exchange: topology.exchange_name().to_owned(),
            routing_key: topology.routing_key().to_owned(),
        }
    }

    /// Serializes `registry` and publishes it.
    ///
    /// # Errors
    /// * `MessagingError::SerializationError` - the record could not be encoded
    /// * `MessagingError::PublisherError` - the broker did not accept the message
    pub async fn publish(
        &self,
        ctx: &Context,
        registry: &CdbRegistry,
    ) -> Result<(), MessagingError> {
        let data = self.codec.encode(registry).map_err(|err| {
            error!(error = err.to_string(), "error serializing registry");
            MessagingError::SerializationError
        })?;

        let msg = PublishMessage::new(
            &self.exchange,
            Some(&self.routing_key),
            Some(CDB_REGISTRY_CREATED),
            data,
        );

        self.publisher.publish(ctx, &msg).await?;

        info!(
            registry_id = registry.registry_id(),
            exchange = %self.exchange,
            routing_key = %self.routing_key,
            "CDB registry published"
        );

        Ok(())
    }
}
