// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use thiserror::Error;

/// Errors surfaced by publishers and dispatchers.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MessagingError {
    #[error("internal error")]
    InternalError,

    #[error("failure to serialize the message payload")]
    SerializationError,

    #[error("failure to publish the message")]
    PublisherError,

    #[error("failure to configure the consumer `{0}`")]
    ConsumerConfigurationError(String),

    #[error("failure to create the consumer")]
    CreatingConsumerError,

    #[error("nothing subscribed")]
    NoSubscriptionError,
}
