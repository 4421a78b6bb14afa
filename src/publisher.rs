// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Publisher
//!
//! This module publishes JSON messages to RabbitMQ exchanges. Messages are marked
//! persistent so they survive a broker restart once they sit in a durable queue,
//! and carry the OpenTelemetry context in their headers.

use crate::{
    messaging::{
        errors::MessagingError,
        publisher::{PublishMessage, Publisher},
    },
    otel,
};
use async_trait::async_trait;
use lapin::{
    options::BasicPublishOptions, publisher_confirm::Confirmation, types::ShortString,
    BasicProperties, Channel,
};
use opentelemetry::Context;
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

/// Default content type for JSON messages
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// AMQP delivery mode of messages written to disk by the broker.
pub const PERSISTENT_DELIVERY_MODE: u8 = 2;

/// RabbitMQ implementation of the Publisher trait.
pub struct RabbitMQPublisher {
    channel: Arc<Channel>,
}

impl RabbitMQPublisher {
    /// Creates a new RabbitMQ publisher on `channel`.
    ///
    /// When the channel is in confirm mode every publish waits for the broker ack.
    pub fn new(channel: Arc<Channel>) -> Arc<RabbitMQPublisher> {
        Arc::new(RabbitMQPublisher { channel })
    }
}

/// Properties attached to every published message.
pub(crate) fn message_properties(ctx: &Context, infos: &PublishMessage) -> BasicProperties {
    BasicProperties::default()
        .with_content_type(ShortString::from(JSON_CONTENT_TYPE))
        .with_type(ShortString::from(infos.msg_type.clone().unwrap_or_default()))
        .with_message_id(ShortString::from(Uuid::new_v4().to_string()))
        .with_delivery_mode(PERSISTENT_DELIVERY_MODE)
        .with_headers(otel::inject(ctx))
}

#[async_trait]
impl Publisher for RabbitMQPublisher {
    /// Publishes `infos.data` to exchange `infos.to` with routing key `infos.key`.
    ///
    /// # Errors
    /// `MessagingError::PublisherError` when the channel refuses the message or
    /// the broker nacks it.
    async fn publish(&self, ctx: &Context, infos: &PublishMessage) -> Result<(), MessagingError> {
        let confirm = match self
            .channel
            .basic_publish(
                &infos.to,
                infos.key.as_deref().unwrap_or_default(),
                BasicPublishOptions {
                    immediate: false,
                    mandatory: false,
                },
                &infos.data,
                message_properties(ctx, infos),
            )
            .await
        {
            Err(err) => {
                error!(error = err.to_string(), "error publishing message");
                Err(MessagingError::PublisherError)
            }
            Ok(confirm) => Ok(confirm),
        }?;

        match confirm.await {
            Err(err) => {
                error!(error = err.to_string(), "error waiting for publisher confirm");
                Err(MessagingError::PublisherError)
            }
            Ok(Confirmation::Nack(_)) => {
                error!(exchange = %infos.to, "message was nacked by the broker");
                Err(MessagingError::PublisherError)
            }
            Ok(_) => {
                debug!(exchange = %infos.to, "message published");
                Ok(())
            }
        }
    }
}
