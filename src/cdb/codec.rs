// Copyright (c) 2025, The Ruskit Authors
// MIT License
// All rights reserved.

//! JSON wire format of [`CdbRegistry`]:
//!
//! ```json
//! {"registryId":"R1","clientId":"C1","amount":1000.0,"durationDays":365,"interestRate":12.5}
//! ```

use super::registry::CdbRegistry;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failure to serialize registry: {0}")]
    Serialization(#[source] serde_json::Error),

    #[error("payload is not a CDB registry: {0}")]
    Deserialization(#[source] serde_json::Error),
}

/// Converts registrations to and from JSON. Stateless; one instance is shared by
/// the producer or the handler that owns it.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn encode(&self, registry: &CdbRegistry) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(registry).map_err(CodecError::Serialization)
    }

    /// Decodes a payload. All five fields are required and numeric fields must
    /// be JSON numbers; extra fields are ignored.
    pub fn decode(&self, payload: &[u8]) -> Result<CdbRegistry, CodecError> {
        serde_json::from_slice(payload).map_err(CodecError::Deserialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn uses_camel_case_field_names() {
        let registry = CdbRegistry::new("R1", "C1", 1000.0, 365, 12.5).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&JsonCodec.encode(&registry).unwrap()).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "registryId": "R1",
                "clientId": "C1",
                "amount": 1000.0,
                "durationDays": 365,
                "interestRate": 12.5
            })
        );
    }

    #[test]
    fn decodes_the_published_shape() {
        let payload = br#"{"registryId":"R1","clientId":"C1","amount":1000.00,"durationDays":365,"interestRate":12.5}"#;
        let registry = JsonCodec.decode(payload).unwrap();

        assert_eq!(registry, CdbRegistry::new("R1", "C1", 1000.0, 365, 12.5).unwrap());
    }

    #[test]
    fn ignores_unknown_fields() {
        let payload = br#"{"registryId":"R1","clientId":"C1","amount":1,"durationDays":30,"interestRate":1,"channel":"web"}"#;
        assert!(JsonCodec.decode(payload).is_ok());
    }

    #[test]
    fn rejects_missing_fields() {
        let payload = br#"{"registryId":"R1","clientId":"C1","amount":1000.0,"durationDays":365}"#;
        let err = JsonCodec.decode(payload).unwrap_err();

        assert!(matches!(err, CodecError::Deserialization(_)));
        assert!(err.to_string().contains("interestRate"));
    }

    #[test]
    fn rejects_non_numeric_amounts() {
        let payload = br#"{"registryId":"R1","clientId":"C1","amount":"1000","durationDays":365,"interestRate":12.5}"#;
        assert!(matches!(
            JsonCodec.decode(payload),
            Err(CodecError::Deserialization(_))
        ));
    }

    #[test]
    fn rejects_fractional_and_negative_durations() {
        for duration in ["36.5", "-1"] {
            let payload = format!(
                r#"{{"registryId":"R1","clientId":"C1","amount":1,"durationDays":{duration},"interestRate":1}}"#
            );
            assert!(JsonCodec.decode(payload.as_bytes()).is_err(), "{duration}");
        }
    }

    proptest! {
        #[test]
        fn round_trips_valid_registrations(
            registry_id in "[A-Za-z0-9-]{1,36}",
            client_id in "[A-Za-z0-9-]{1,36}",
            amount in 0.0f64..1.0e12,
            duration_days in 1u32..=36_500,
            interest_rate in 0.0f64..1_000.0,
        ) {
            let registry = CdbRegistry::new(registry_id, client_id, amount, duration_days, interest_rate).unwrap();
            let decoded = JsonCodec.decode(&JsonCodec.encode(&registry).unwrap()).unwrap();

            prop_assert_eq!(decoded, registry);
        }
    }
}
