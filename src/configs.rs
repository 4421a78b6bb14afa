// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! # Application Configuration
//!
//! Typed configuration shared by the producer and the consumer. Values are layered
//! from serde defaults, an optional TOML file and `CDB_`-prefixed environment
//! variables, in that order. Nested keys use `__` in the environment, so
//! `fixed-income.queue.routing-key` becomes `CDB_FIXED_INCOME__QUEUE__ROUTING_KEY`.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Default location of the configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";

/// Prefix of the environment variables read by [`Configs::load`].
pub const ENV_PREFIX: &str = "CDB";

// Hyphenated keys cannot be spelled in an environment variable name, so they
// are read explicitly and applied as overrides.
const HYPHENATED_KEYS: &[&str] = &[
    "fixed-income.queue.name",
    "fixed-income.queue.exchange",
    "fixed-income.queue.routing-key",
    "consumer.retry-ttl-ms",
    "consumer.dead-letter",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failure to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("missing configuration value `{0}`")]
    Missing(&'static str),

    #[error("invalid configuration value `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Root of the configuration tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Configs {
    pub app: AppConfigs,
    pub rabbitmq: RabbitMQConfigs,
    #[serde(rename = "fixed-income")]
    pub fixed_income: FixedIncomeConfigs,
    pub consumer: ConsumerConfigs,
    pub publisher: PublisherConfigs,
    pub log: LogConfigs,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfigs {
    /// Reported to the broker as the connection name.
    pub name: String,
}

impl Default for AppConfigs {
    fn default() -> Self {
        Self {
            name: "cdb-registry".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RabbitMQConfigs {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub vhost: String,
}

impl Default for RabbitMQConfigs {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 5672,
            user: "guest".to_owned(),
            password: "guest".to_owned(),
            vhost: "%2f".to_owned(),
        }
    }
}

impl RabbitMQConfigs {
    /// AMQP URI built from the connection settings.
    pub fn uri(&self) -> String {
        format!(
            "amqp://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.vhost
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixedIncomeConfigs {
    pub queue: FixedIncomeQueueConfigs,
}

/// Names shared by the topology declaration, the publisher and the subscription.
/// The producer and the consumer must agree on all three.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FixedIncomeQueueConfigs {
    pub name: String,
    pub exchange: String,
    #[serde(rename = "routing-key")]
    pub routing_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConsumerConfigs {
    /// `basic.qos` prefetch count.
    pub prefetch: u16,
    /// Maximum number of deliveries handled at once. `1` keeps queue order.
    pub concurrency: usize,
    /// Redeliveries through the retry queue before a message is dead-lettered.
    /// `0` disables the retry queue.
    pub retries: u32,
    #[serde(rename = "retry-ttl-ms")]
    pub retry_ttl_ms: u32,
    #[serde(rename = "dead-letter")]
    pub dead_letter: bool,
}

impl Default for ConsumerConfigs {
    fn default() -> Self {
        Self {
            prefetch: 1,
            concurrency: 1,
            retries: 3,
            retry_ttl_ms: 5_000,
            dead_letter: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PublisherConfigs {
    /// Waits for a broker ack on every publish.
    pub confirms: bool,
}

impl Default for PublisherConfigs {
    fn default() -> Self {
        Self { confirms: true }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfigs {
    /// Default `EnvFilter` directive, overridden by `RUST_LOG`.
    pub level: String,
}

impl Default for LogConfigs {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

impl Configs {
    /// Loads the configuration from `path` (or [`DEFAULT_CONFIG_FILE`]) and the
    /// environment, then validates it.
    ///
    /// An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Configs, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let mut builder = Config::builder().add_source(file).add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        for key in HYPHENATED_KEYS {
            builder = builder.set_override_option(*key, std::env::var(env_var_name(key)).ok())?;
        }

        let cfg: Configs = builder.build()?.try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Parses a TOML document without consulting the environment.
    pub fn from_toml(doc: &str) -> Result<Configs, ConfigError> {
        let cfg: Configs = Config::builder()
            .add_source(File::from_str(doc, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let queue = &self.fixed_income.queue;
        if queue.name.trim().is_empty() {
            return Err(ConfigError::Missing("fixed-income.queue.name"));
        }
        if queue.exchange.trim().is_empty() {
            return Err(ConfigError::Missing("fixed-income.queue.exchange"));
        }
        if queue.routing_key.trim().is_empty() {
            return Err(ConfigError::Missing("fixed-income.queue.routing-key"));
        }

        if self.consumer.concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "consumer.concurrency",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.consumer.prefetch == 0 {
            return Err(ConfigError::Invalid {
                key: "consumer.prefetch",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.consumer.retries > 0 && self.consumer.retry_ttl_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "consumer.retry-ttl-ms",
                reason: "must be positive when retries are enabled".to_owned(),
            });
        }

        Ok(())
    }
}

/// Environment variable that overrides `key`, e.g. `consumer.retry-ttl-ms`
/// -> `CDB_CONSUMER__RETRY_TTL_MS`.
pub fn env_var_name(key: &str) -> String {
    format!(
        "{}_{}",
        ENV_PREFIX,
        key.replace('.', "__").replace('-', "_").to_uppercase()
    )
}
