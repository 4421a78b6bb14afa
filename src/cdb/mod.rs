// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # CDB Registration Events
//!
//! The fixed-income domain on top of the messaging layer: the [`registry::CdbRegistry`]
//! record, its JSON codec, the topology it travels through, the producer that
//! publishes it and the handler that consumes it.

pub mod codec;
pub mod consumer;
pub mod producer;
pub mod registry;
pub mod topology;

/// AMQP `type` property of published registrations.
pub const CDB_REGISTRY_CREATED: &str = "CdbRegistryCreated";
