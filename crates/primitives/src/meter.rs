//! Meter identities and public-key records.
//!
//! Keys are supplied by an external meter registry and are immutable for
//! the lifetime of a meter record; the engine resolves each meter identity
//! once per verification run and never writes back.

use crate::RawSignature;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A signature attesting to a public key's provenance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyAttestation {
    /// Curve of the attesting signer's key.
    pub algorithm: String,
    /// Hex-encoded SEC1 key of the attesting signer.
    pub signer_key: String,
    /// Signature over the attested key material.
    pub signature: RawSignature,
}

/// Public key registered for one meter identity.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyRecord {
    /// Curve identifier, as the registry names it (e.g. `ECC secp224k1`).
    pub algorithm: String,
    /// Hex-encoded SEC1 key material.
    pub key: String,
    /// Optional chain of signatures attesting to key provenance.
    #[serde(default)]
    pub attestations: Vec<KeyAttestation>,
}

impl PublicKeyRecord {
    /// Record without attestations.
    pub fn new(algorithm: impl Into<String>, key: impl Into<String>) -> Self {
        Self { algorithm: algorithm.into(), key: key.into(), attestations: Vec::new() }
    }

    /// Hex-decoded key material.
    pub fn key_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        hex::decode(&self.key)
    }

    /// Lowercase hex of the key material, for audit display.
    pub fn key_hex(&self) -> String {
        self.key.to_lowercase()
    }
}

/// Read-only lookup of public keys by meter identity.
pub trait MeterRegistry {
    /// The key record registered for `meter_id`, if any.
    fn meter(&self, meter_id: &str) -> Option<PublicKeyRecord>;
}

/// In-memory registry for tests and single-process embedders.
#[derive(Clone, Debug, Default)]
pub struct InMemoryMeterRegistry {
    keys: HashMap<String, PublicKeyRecord>,
}

impl InMemoryMeterRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `record` for `meter_id`, replacing any previous record.
    pub fn insert(&mut self, meter_id: impl Into<String>, record: PublicKeyRecord) {
        self.keys.insert(meter_id.into(), record);
    }
}

impl MeterRegistry for InMemoryMeterRegistry {
    fn meter(&self, meter_id: &str) -> Option<PublicKeyRecord> {
        self.keys.get(meter_id).cloned()
    }
}
