// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("`{0}` must not be empty")]
    EmptyIdentifier(&'static str),

    #[error("amount must be a non-negative number, got {0}")]
    InvalidAmount(f64),

    #[error("duration must be at least one day")]
    InvalidDuration,

    #[error("interest rate must be a non-negative number, got {0}")]
    InvalidInterestRate(f64),
}

/// A certificate-of-deposit registration event.
///
/// Built once by the producer and never modified afterwards; the consumer gets
/// its own copy by decoding the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CdbRegistry {
    registry_id: String,
    client_id: String,
    amount: f64,
    duration_days: u32,
    interest_rate: f64,
}

impl CdbRegistry {
    /// Creates a validated registration.
    ///
    /// `amount` is a monetary value and `interest_rate` a percentage (`12.5`
    /// means 12.5%).
    pub fn new(
        registry_id: impl Into<String>,
        client_id: impl Into<String>,
        amount: f64,
        duration_days: u32,
        interest_rate: f64,
    ) -> Result<CdbRegistry, RegistryError> {
        let registry = CdbRegistry {
            registry_id: registry_id.into(),
            client_id: client_id.into(),
            amount,
            duration_days,
            interest_rate,
        };

        registry.validate()?;
        Ok(registry)
    }

    /// Checks the field constraints. Decoded records have not been through
    /// [`CdbRegistry::new`], so the consumer calls this explicitly.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.registry_id.trim().is_empty() {
            return Err(RegistryError::EmptyIdentifier("registryId"));
        }
        if self.client_id.trim().is_empty() {
            return Err(RegistryError::EmptyIdentifier("clientId"));
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(RegistryError::InvalidAmount(self.amount));
        }
        if self.duration_days == 0 {
            return Err(RegistryError::InvalidDuration);
        }
        if !self.interest_rate.is_finite() || self.interest_rate < 0.0 {
            return Err(RegistryError::InvalidInterestRate(self.interest_rate));
        }

        Ok(())
    }

    pub fn registry_id(&self) -> &str {
        &self.registry_id
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn duration_days(&self) -> u32 {
        self.duration_days
    }

    pub fn interest_rate(&self) -> f64 {
        self.interest_rate
    }
}

impl fmt::Display for CdbRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Registry ID: {}, Client: {}, Amount: {}, Duration: {} days, Interest Rate: {}%",
            self.registry_id,
            self.client_id,
            Amount(self.amount),
            self.duration_days,
            self.interest_rate
        )
    }
}

/// Money with at least two decimals; finer amounts are printed in full, never
/// rounded.
struct Amount(f64);

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exact = self.0.to_string();

        match exact.split_once('.') {
            Some((_, decimals)) if decimals.len() > 2 => f.write_str(&exact),
            _ => write!(f, "{:.2}", self.0),
        }
    }
}
