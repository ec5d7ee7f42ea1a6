//! Parsed charging-session records.
//!
//! These types are the normalized form every ingestion path (file, pasted
//! text, HTTP body) produces before verification. They carry vendor data
//! verbatim: hex stays hex, counters stay at vendor scale, and nothing is
//! cleaned up — the canonical buffers rebuilt from these fields must match
//! what the meter signed bit for bit.

use crate::{DecimalValue, ObisCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use time::OffsetDateTime;

/// Signature material as it arrived in the input record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSignature {
    /// ECDSA `(r, s)` pair, each hex-encoded.
    Pair {
        /// Hex-encoded `r` component.
        r: String,
        /// Hex-encoded `s` component.
        s: String,
    },
    /// One ASN.1 DER-encoded blob, hex-encoded.
    Der {
        /// Hex-encoded DER blob.
        der: String,
    },
}

impl RawSignature {
    /// Hex-decoded `(r, s)` pair; `None` if this is a DER signature.
    pub fn decode_pair(&self) -> Option<Result<(Vec<u8>, Vec<u8>), hex::FromHexError>> {
        match self {
            Self::Pair { r, s } => Some(
                hex::decode(r).and_then(|r_bytes| Ok((r_bytes, hex::decode(s)?))),
            ),
            Self::Der { .. } => None,
        }
    }

    /// Hex-decoded DER blob; `None` if this is an `(r, s)` pair.
    pub fn decode_der(&self) -> Option<Result<Vec<u8>, hex::FromHexError>> {
        match self {
            Self::Pair { .. } => None,
            Self::Der { der } => Some(hex::decode(der)),
        }
    }

    /// Byte-exact hex rendering for audit display (`r` and `s`
    /// concatenated, or the DER blob).
    pub fn to_hex(&self) -> String {
        match self {
            Self::Pair { r, s } => format!("{}{}", r.to_lowercase(), s.to_lowercase()),
            Self::Der { der } => der.to_lowercase(),
        }
    }
}

/// One signed meter reading.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementValue {
    /// UTC instant the reading was taken.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Reading in the measurement's vendor-native unit and scale.
    pub value: DecimalValue,
    /// Vendor-specific meter device-status bitfield.
    #[serde(default)]
    pub meter_status: u32,
    /// Vendor-specific adapter device-status bitfield.
    #[serde(default)]
    pub adapter_status: u32,
    /// Monotonic record sequence counter, where the vendor provides one.
    #[serde(default)]
    pub sequence: u32,
    /// Pagination counter, where the vendor provides one.
    #[serde(default)]
    pub paging: u32,
    /// Per-value signature; absent for formats that sign the session.
    #[serde(default)]
    pub signature: Option<RawSignature>,
    /// Format-specific fields (adapter ids, firmware versions, timezone
    /// offsets), kept verbatim as text.
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl MeasurementValue {
    /// Format-specific extra field, if present.
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}

/// A named physical quantity recorded by one energy meter.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    /// Identity of the signing meter; key-registry lookup key.
    pub meter_id: String,
    /// OBIS code of the metered quantity.
    pub obis: ObisCode,
    /// Vendor unit code (e.g. DLMS 0x1e for Wh).
    pub unit: u8,
    /// Decimal scale of the raw counter (`raw * 10^scale` = value).
    pub scale: i32,
    /// Declared curve/hash/signature-format triple, as a vendor string.
    pub algorithm: String,
    /// Chronologically ordered readings; first is the session start, last
    /// the stop.
    pub values: Vec<MeasurementValue>,
}

/// A charging session: one or more measurements plus session identifiers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargingSession {
    /// Vendor session identifier.
    pub session_id: String,
    /// Authorization identifier (RFID UID or token), if any.
    #[serde(default)]
    pub authorization_id: String,
    /// EVSE reference, if any.
    #[serde(default)]
    pub evse_id: String,
    /// Format/context identifier selecting the vendor format.
    pub format_context: String,
    /// The session's measurements.
    pub measurements: Vec<Measurement>,
    /// Session-level signature, for formats that sign one session-wide
    /// buffer instead of individual values.
    #[serde(default)]
    pub signature: Option<RawSignature>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_forms_deserialize_untagged() {
        let pair: RawSignature = serde_json::from_str(r#"{"r":"aa","s":"bb"}"#).unwrap();
        assert_eq!(
            pair,
            RawSignature::Pair { r: "aa".into(), s: "bb".into() }
        );
        let (r, s) = pair.decode_pair().unwrap().unwrap();
        assert_eq!((r, s), (vec![0xaa], vec![0xbb]));
        assert!(pair.decode_der().is_none());

        let der: RawSignature = serde_json::from_str(r#"{"der":"3006020101020102"}"#).unwrap();
        assert_eq!(der.decode_der().unwrap().unwrap()[0], 0x30);
        assert_eq!(der.to_hex(), "3006020101020102");
    }

    #[test]
    fn session_deserializes_from_normalized_json() {
        let json = r#"{
            "sessionId": "S-1",
            "authorizationId": "04A224E9",
            "evseId": "DE*ABC*E123",
            "formatContext": "EMH",
            "measurements": [{
                "meterId": "0901454d480000123456",
                "obis": "0100010800ff",
                "unit": 30,
                "scale": -3,
                "algorithm": "ECC secp224k1",
                "values": [{
                    "timestamp": "2023-04-05T10:00:00Z",
                    "value": "1.234",
                    "meterStatus": 0,
                    "signature": {"r": "aa", "s": "bb"}
                }]
            }]
        }"#;
        let session: ChargingSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.measurements.len(), 1);
        let m = &session.measurements[0];
        assert_eq!(m.obis.to_string(), "1-0:1.8.0*255");
        assert_eq!(m.values[0].value.scaled_u64(-3).unwrap(), 1234);
        assert_eq!(m.values[0].timestamp.unix_timestamp(), 1680688800);
        assert!(session.signature.is_none());
    }
}
