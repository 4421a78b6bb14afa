// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Error Types for RabbitMQ Implementation
//!
//! The `AmqpError` enum represents the failures that can occur while talking to
//! the broker: connecting, opening channels, declaring the topology, publishing
//! and settling deliveries.

use thiserror::Error;

/// Represents errors that can occur during AMQP/RabbitMQ operations.
///
/// Connectivity failures (`ConnectionError`, `ChannelError`) and declaration
/// failures are fatal at startup. Settlement failures (`AckMessageError`,
/// `RequeuingMessageError`, `PublishingToDQLError`) are reported per delivery.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmqpError {
    /// Error establishing a connection to the RabbitMQ server
    #[error("failure to connect")]
    ConnectionError,

    /// Error creating or configuring a channel on an established connection
    #[error("failure to create a channel")]
    ChannelError,

    /// Error closing the channel or the connection
    #[error("failure to close the connection")]
    CloseError,

    /// Error declaring an exchange with the given name
    #[error("failure to declare an exchange `{0}`")]
    DeclareExchangeError(String),

    /// Error declaring a queue with the given name
    #[error("failure to declare a queue `{0}`")]
    DeclareQueueError(String),

    /// Error binding an exchange to a queue
    #[error("failure to bind queue `{1}` to exchange `{0}`")]
    BindingExchangeToQueueError(String, String),

    /// Error acknowledging a message
    #[error("failure to ack message")]
    AckMessageError,

    /// Error rejecting a message towards the retry queue
    #[error("failure to reject message for retry")]
    RequeuingMessageError,

    /// Error publishing a message to the Dead Letter Queue (DLQ)
    #[error("failure to publish to dlq")]
    PublishingToDQLError,
}
