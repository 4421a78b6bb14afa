// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use super::errors::MessagingError;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use opentelemetry::Context;

/// An outgoing message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishMessage {
    /// Destination exchange.
    pub to: String,
    pub key: Option<String>,
    pub msg_type: Option<String>,
    pub data: Vec<u8>,
}

impl PublishMessage {
    pub fn new(to: &str, key: Option<&str>, msg_type: Option<&str>, data: Vec<u8>) -> Self {
        PublishMessage {
            to: to.to_owned(),
            key: key.map(str::to_owned),
            msg_type: msg_type.map(str::to_owned),
            data,
        }
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, ctx: &Context, infos: &PublishMessage) -> Result<(), MessagingError>;
}
