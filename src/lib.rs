// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

mod consumer;
mod otel;

pub mod cdb;
pub mod channel;
pub mod configs;
pub mod dispatcher;
pub mod errors;
pub mod exchange;
pub mod logging;
pub mod messaging;
pub mod publisher;
pub mod queue;
pub mod topology;
