// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! Tests against a running RabbitMQ. Enabled with `--features integration-tests`;
//! the broker is located through the usual configuration (`config/default.toml`
//! and `CDB_RABBITMQ__*` variables).

#[cfg(feature = "integration-tests")]
mod delivery;
#[cfg(feature = "integration-tests")]
mod helper;
#[cfg(feature = "integration-tests")]
mod routing;
