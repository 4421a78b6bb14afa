// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # RabbitMQ Message Consumer
//!
//! Processing of a single delivery: run the handler, then settle the delivery
//! according to the outcome. Deliveries are acked only after the handler
//! returns; failures go through the retry queue or the Dead Letter Queue (DLQ)
//! as configured on the queue definition.

use crate::{
    dispatcher::RabbitMQDispatcherDefinition,
    errors::AmqpError,
    messaging::handler::{ConsumerMessage, HandlerError},
    otel,
    queue::QueueDefinition,
};
use lapin::{
    message::Delivery,
    options::{BasicAckOptions, BasicNackOptions, BasicPublishOptions},
    protocol::basic::AMQPProperties,
    publisher_confirm::Confirmation,
    types::AMQPValue,
    Channel,
};
use opentelemetry::{
    global::BoxedTracer,
    trace::{Span, Status},
};
use std::{borrow::Cow, sync::Arc};
use tracing::{debug, error, warn};

/// Constant for the x-death header used in RabbitMQ's dead-lettering mechanism
pub const AMQP_HEADERS_X_DEATH: &str = "x-death";
/// Constant for the count field in the x-death header
pub const AMQP_HEADERS_COUNT: &str = "count";
/// Constant for the queue field in the x-death header
pub const AMQP_HEADERS_QUEUE: &str = "queue";

/// What to do with a delivery once its handler returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Settlement {
    /// Processed; remove it from the queue.
    Ack,
    /// Reject without requeue so the broker moves it to the retry queue.
    Retry,
    /// Copy it to the DLQ, then ack.
    DeadLetter,
    /// Ack without processing; the message is lost.
    Drop,
}

/// Decides the settlement of a delivery seen `attempts` times before.
pub(crate) fn settlement(
    result: &Result<(), HandlerError>,
    def: &QueueDefinition,
    attempts: i64,
) -> Settlement {
    let err = match result {
        Ok(_) => return Settlement::Ack,
        Err(err) => err,
    };

    let can_retry = def.retry_name.is_some() && attempts < i64::from(def.retries());
    if !err.is_permanent() && can_retry {
        return Settlement::Retry;
    }

    if def.dlq_name.is_some() {
        Settlement::DeadLetter
    } else {
        Settlement::Drop
    }
}

/// Consumes and processes a message from RabbitMQ.
///
/// 1. Reads the message type and the retry count from the properties
/// 2. Opens a consumer span parented by the propagated context
/// 3. Runs the handler
/// 4. Settles the delivery (see [`settlement`])
///
/// # Errors
/// Returns the settlement failure; the handler's own error is only logged.
pub(crate) async fn consume(
    tracer: &BoxedTracer,
    delivery: &Delivery,
    def: &RabbitMQDispatcherDefinition,
    channel: Arc<Channel>,
) -> Result<(), AmqpError> {
    let queue_def = &def.queue_def;
    let msg_type = message_type(&delivery.properties);
    let attempts = death_count(&delivery.properties, &queue_def.name);

    let (ctx, mut span) = otel::new_span(&delivery.properties, tracer, &queue_def.name);

    debug!(
        queue = %queue_def.name,
        msg_type,
        attempts,
        exchange = %delivery.exchange,
        "received message"
    );

    let content_type = delivery
        .properties
        .content_type()
        .as_ref()
        .map(|v| v.as_str());

    let msg = ConsumerMessage::new(&queue_def.name, &msg_type, &delivery.data, content_type)
        .redelivered(delivery.redelivered);

    let result = def.handler.exec(&ctx, &msg).await;
    if let Err(err) = &result {
        span.record_error(err);
        span.set_status(Status::Error {
            description: Cow::from(err.to_string()),
        });
    }

    match settlement(&result, queue_def, attempts) {
        Settlement::Ack => {
            debug!("message successfully processed");
            span.set_status(Status::Ok);
            ack(delivery).await
        }

        Settlement::Retry => {
            warn!(attempts, "error whiling handling msg, requeuing for latter");
            match delivery
                .nack(BasicNackOptions {
                    multiple: false,
                    requeue: false,
                })
                .await
            {
                Ok(_) => Ok(()),
                Err(e) => {
                    error!(error = e.to_string(), "error whiling requeuing");
                    span.record_error(&e);
                    Err(AmqpError::RequeuingMessageError {})
                }
            }
        }

        Settlement::DeadLetter => {
            let dlq_name = queue_def.dlq_name.as_deref().unwrap_or_default();
            error!(attempts, dlq = dlq_name, "giving up on message, sending to dlq");

            // Unacked on failure, so the broker redelivers it.
            if let Err(e) = publish_to_dlq(&channel, dlq_name, delivery).await {
                span.record_error(&e);
                return Err(e);
            }

            ack(delivery).await
        }

        Settlement::Drop => {
            error!(attempts, "giving up on message, no dlq configured, dropping it");
            ack(delivery).await
        }
    }
}

async fn ack(delivery: &Delivery) -> Result<(), AmqpError> {
    match delivery.ack(BasicAckOptions { multiple: false }).await {
        Err(e) => {
            error!(error = e.to_string(), "error whiling ack msg");
            Err(AmqpError::AckMessageError {})
        }
        _ => Ok(()),
    }
}

/// Publishes a copy of the delivery to `dlq_name` on the default exchange and
/// waits for the broker confirm when the channel is in confirm mode.
async fn publish_to_dlq(
    channel: &Channel,
    dlq_name: &str,
    delivery: &Delivery,
) -> Result<(), AmqpError> {
    let confirmation = channel
        .basic_publish(
            "",
            dlq_name,
            BasicPublishOptions::default(),
            &delivery.data,
            delivery.properties.clone(),
        )
        .await
        .map_err(|err| {
            error!(error = err.to_string(), dlq = dlq_name, "error whiling sending to dlq");
            AmqpError::PublishingToDQLError
        })?
        .await
        .map_err(|err| {
            error!(error = err.to_string(), dlq = dlq_name, "error waiting for dlq confirm");
            AmqpError::PublishingToDQLError
        })?;

    dlq_confirmed(&confirmation, dlq_name)
}

/// The original delivery may only be acked once the broker took the copy.
pub(crate) fn dlq_confirmed(confirmation: &Confirmation, dlq_name: &str) -> Result<(), AmqpError> {
    match confirmation {
        Confirmation::Nack(_) => {
            error!(dlq = dlq_name, "dlq copy was nacked by the broker");
            Err(AmqpError::PublishingToDQLError)
        }
        Confirmation::Ack(_) | Confirmation::NotRequested => Ok(()),
    }
}

fn message_type(props: &AMQPProperties) -> String {
    match props.kind() {
        Some(value) => value.to_string(),
        _ => "".to_owned(),
    }
}

/// Number of times the message was dead-lettered from `queue`, read from the
/// `x-death` header. Falls back to the first entry when none names `queue`.
pub(crate) fn death_count(props: &AMQPProperties, queue: &str) -> i64 {
    let Some(headers) = props.headers() else {
        return 0;
    };

    let Some(deaths) = headers
        .inner()
        .get(AMQP_HEADERS_X_DEATH)
        .and_then(AMQPValue::as_array)
    else {
        return 0;
    };

    let tables: Vec<_> = deaths
        .as_slice()
        .iter()
        .filter_map(AMQPValue::as_field_table)
        .collect();

    let entry = tables
        .iter()
        .find(|table| {
            matches!(
                table.inner().get(AMQP_HEADERS_QUEUE),
                Some(AMQPValue::LongString(name)) if name.as_bytes() == queue.as_bytes()
            )
        })
        .or_else(|| tables.first());

    entry
        .and_then(|table| table.inner().get(AMQP_HEADERS_COUNT))
        .and_then(AMQPValue::as_long_long_int)
        .unwrap_or_default()
}
