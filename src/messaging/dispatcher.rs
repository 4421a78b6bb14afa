// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use super::{errors::MessagingError, handler::ConsumerHandler};
use async_trait::async_trait;
use std::{future::Future, pin::Pin, sync::Arc};

/// Resolves when the dispatcher should stop consuming.
pub type Shutdown = Pin<Box<dyn Future<Output = ()> + Send>>;

#[async_trait]
pub trait Dispatcher {
    /// Routes every message delivered on `queue` to `handler`.
    fn subscribe(self, queue: &str, handler: Arc<dyn ConsumerHandler>) -> Self;

    /// Consumes until the streams end or `shutdown` resolves.
    async fn consume_until(&self, shutdown: Shutdown) -> Result<(), MessagingError>;
}
