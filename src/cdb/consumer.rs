// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Consumer side of the fixed-income queue: decode, validate, then hand the
//! registration to a [`RegistryListener`]. Anything that fails before the
//! listener runs is a permanent failure and goes to the dead-letter queue.

use super::{codec::JsonCodec, registry::CdbRegistry};
use crate::{
    messaging::handler::{ConsumerHandler, ConsumerMessage, HandlerError},
    publisher::JSON_CONTENT_TYPE,
};
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use opentelemetry::Context;
use std::sync::Arc;
use tracing::{info, warn};

/// Side effect run for every well-formed registration.
#[cfg_attr(test, automock)]
pub trait RegistryListener: Send + Sync {
    fn on_registry(&self, registry: &CdbRegistry) -> Result<(), HandlerError>;
}

/// Writes every registration to the log.
#[derive(Debug, Default)]
pub struct LoggingListener;

impl RegistryListener for LoggingListener {
    fn on_registry(&self, registry: &CdbRegistry) -> Result<(), HandlerError> {
        info!(
            registry_id = registry.registry_id(),
            client_id = registry.client_id(),
            "processing CDB registry: {registry}"
        );
        Ok(())
    }
}

pub struct CdbRegistryHandler {
    codec: JsonCodec,
    listener: Arc<dyn RegistryListener>,
}

impl CdbRegistryHandler {
    pub fn new(listener: Arc<dyn RegistryListener>) -> Arc<CdbRegistryHandler> {
        Arc::new(CdbRegistryHandler {
            codec: JsonCodec,
            listener,
        })
    }

    /// Handler that only logs, as deployed by `cdb-consumer`.
    pub fn logging() -> Arc<CdbRegistryHandler> {
        Self::new(Arc::new(LoggingListener))
    }

    fn decode(&self, msg: &ConsumerMessage) -> Result<CdbRegistry, HandlerError> {
        if let Some(content_type) = msg.content_type.as_deref() {
            if !is_json(content_type) {
                return Err(HandlerError::Permanent(format!(
                    "unsupported content type `{content_type}`"
                )));
            }
        }

        let registry = self
            .codec
            .decode(&msg.data)
            .map_err(|err| HandlerError::Permanent(err.to_string()))?;

        registry
            .validate()
            .map_err(|err| HandlerError::Permanent(err.to_string()))?;

        Ok(registry)
    }
}

/// Compares the media type only, so `application/json; charset=utf-8` passes.
fn is_json(content_type: &str) -> bool {
    let media_type = content_type.split(';').next().unwrap_or_default();
    media_type.trim().eq_ignore_ascii_case(JSON_CONTENT_TYPE)
}

#[async_trait]
impl ConsumerHandler for CdbRegistryHandler {
    async fn exec(&self, _ctx: &Context, msg: &ConsumerMessage) -> Result<(), HandlerError> {
        let registry = match self.decode(msg) {
            Ok(r) => r,
            Err(err) => {
                warn!(
                    queue = %msg.from,
                    redelivered = msg.redelivered,
                    error = err.to_string(),
                    "rejecting CDB registry payload"
                );
                return Err(err);
            }
        };

        self.listener.on_registry(&registry)
    }
}
