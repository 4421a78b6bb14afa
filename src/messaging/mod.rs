// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Messaging Abstractions
//!
//! Broker-neutral seams between the domain and the RabbitMQ implementation:
//! [`publisher::Publisher`] for outgoing messages, [`dispatcher::Dispatcher`] for
//! subscriptions and [`handler::ConsumerHandler`] for per-message processing.

pub mod dispatcher;
pub mod errors;
pub mod handler;
pub mod publisher;
