// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Consumer Handler
//!
//! A [`ConsumerHandler`] processes one delivered message. Its result decides how the
//! dispatcher settles the delivery: `Ok` acks it, [`HandlerError::Transient`]
//! sends it through the retry queue and [`HandlerError::Permanent`] sends it
//! straight to the dead-letter queue.

use async_trait::async_trait;
use opentelemetry::Context;
use thiserror::Error;

/// A delivered message as seen by a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerMessage {
    /// Queue the message was consumed from.
    pub from: String,
    /// The AMQP `type` property, empty when absent.
    pub msg_type: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
    /// Set when the broker has delivered this message before.
    pub redelivered: bool,
}

impl ConsumerMessage {
    pub fn new(from: &str, msg_type: &str, data: &[u8], content_type: Option<&str>) -> Self {
        ConsumerMessage {
            from: from.to_owned(),
            msg_type: msg_type.to_owned(),
            content_type: content_type.map(str::to_owned),
            data: data.to_vec(),
            redelivered: false,
        }
    }

    pub fn redelivered(mut self, redelivered: bool) -> Self {
        self.redelivered = redelivered;
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandlerError {
    /// May succeed if delivered again later.
    #[error("transient failure (will retry): {0}")]
    Transient(String),

    /// Will fail the same way on every delivery.
    #[error("permanent failure (will not retry): {0}")]
    Permanent(String),
}

impl HandlerError {
    pub fn is_permanent(&self) -> bool {
        matches!(self, HandlerError::Permanent(_))
    }
}

#[async_trait]
pub trait ConsumerHandler: Send + Sync {
    async fn exec(&self, ctx: &Context, msg: &ConsumerMessage) -> Result<(), HandlerError>;
}
