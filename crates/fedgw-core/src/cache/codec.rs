//! Versioned storage envelope.
//!
//! Every value written to the hash store is wrapped as
//! `{"version": 1, "kind": "<payload kind>", "value": "<base64 payload>"}` so the
//! storage format can evolve independently of the payload encoding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use fedgw_types::{AssignedPolicies, CacheError, ChargingRuleNameSet, PolicyRule};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::marker::PhantomData;

/// Envelope schema version written by this codec.
pub const SCHEMA_VERSION: u32 = 1;

/// A domain type that can be stored in a cache map.
pub trait Payload: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable name recorded in the envelope.
    const KIND: &'static str;
}

impl Payload for PolicyRule {
    const KIND: &'static str = "policy_rule";
}

impl Payload for ChargingRuleNameSet {
    const KIND: &'static str = "charging_rule_name_set";
}

impl Payload for AssignedPolicies {
    const KIND: &'static str = "assigned_policies";
}

pub trait Serializer<T>: Send + Sync {
    fn serialize(&self, value: &T) -> Result<Vec<u8>, CacheError>;
}

pub trait Deserializer<T>: Send + Sync {
    fn deserialize(&self, raw: &[u8]) -> Result<T, CacheError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    kind: String,
    value: String,
}

/// Serializer/deserializer pair for one payload kind.
pub struct VersionedCodec<T> {
    _payload: PhantomData<fn() -> T>,
}

impl<T> Default for VersionedCodec<T> {
    fn default() -> Self {
        Self { _payload: PhantomData }
    }
}

impl<T> Clone for VersionedCodec<T> {
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl<T: Payload> VersionedCodec<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize a dynamically typed value, rejecting anything that is not `T`.
    pub fn serialize_any(&self, value: &dyn Any) -> Result<Vec<u8>, CacheError> {
        match value.downcast_ref::<T>() {
            Some(typed) => self.serialize(typed),
            None => Err(CacheError::TypeMismatch {
                expected: T::KIND.to_string(),
                actual: format!("{:?}", value.type_id()),
            }),
        }
    }
}

impl<T: Payload> Serializer<T> for VersionedCodec<T> {
    fn serialize(&self, value: &T) -> Result<Vec<u8>, CacheError> {
        let inner = serde_json::to_vec(value).map_err(|e| CacheError::EncodeError {
            what: T::KIND.to_string(),
            message: e.to_string(),
        })?;
        let envelope = Envelope {
            version: SCHEMA_VERSION,
            kind: T::KIND.to_string(),
            value: STANDARD.encode(inner),
        };
        serde_json::to_vec(&envelope).map_err(|e| CacheError::EncodeError {
            what: "envelope".to_string(),
            message: e.to_string(),
        })
    }
}

impl<T: Payload> Deserializer<T> for VersionedCodec<T> {
    fn deserialize(&self, raw: &[u8]) -> Result<T, CacheError> {
        let envelope: Envelope =
            serde_json::from_slice(raw).map_err(|e| CacheError::decode("envelope", e))?;

        if envelope.version == 0 || envelope.version > SCHEMA_VERSION {
            return Err(CacheError::decode(
                "envelope",
                format!("unsupported schema version {}", envelope.version),
            ));
        }
        if envelope.kind != T::KIND {
            return Err(CacheError::TypeMismatch {
                expected: T::KIND.to_string(),
                actual: envelope.kind,
            });
        }

        let inner = STANDARD
            .decode(envelope.value.as_bytes())
            .map_err(|e| CacheError::decode("envelope value", e))?;
        serde_json::from_slice(&inner).map_err(|e| CacheError::decode(T::KIND, e))
    }
}
