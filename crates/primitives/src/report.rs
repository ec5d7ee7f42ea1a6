//! Verification reports.
//!
//! Results are a side table keyed by position, not annotations written
//! into the parsed session: the engine consumes sessions read-only and
//! returns these types, so independent sessions (and independent values)
//! can be verified in parallel and folded back in declared order.

use crate::{FormatId, ObisCode, VerificationStatus};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// One encoded field of a canonical buffer, hex-exact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldHex {
    /// Field name from the format's field table.
    pub name: String,
    /// The bytes written for this field, as lowercase hex.
    pub hex: String,
}

/// Byte-exact evidence an external auditor needs to recompute a result.
///
/// Every string is the literal hex of the bytes involved, never an
/// interpretation; empty when the corresponding stage was not reached.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrail {
    /// The canonical buffer that was (or would have been) hashed.
    pub canonical_buffer: String,
    /// The message digest handed to signature verification.
    pub digest: String,
    /// The public key used, SEC1 hex.
    pub public_key: String,
    /// The signature checked against the digest.
    pub signature: String,
    /// Per-field breakdown of the canonical buffer, where the format has
    /// a binary field table.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldHex>,
}

/// Verification outcome for one measurement value.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueReport {
    /// Index of the value in its measurement's declared order.
    pub index: usize,
    /// The value's timestamp, echoed for display.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Outcome, after session-level position classification.
    pub status: VerificationStatus,
    /// Human-readable diagnostics (field name, offending value, expected
    /// vs actual); empty on success.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Byte-exact evidence.
    pub audit: AuditTrail,
}

/// Verification outcome for one measurement's value sequence.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasurementReport {
    /// Meter identity the values were checked against.
    pub meter_id: String,
    /// OBIS code of the measurement.
    pub obis: ObisCode,
    /// Per-value outcomes, in declared order.
    pub values: Vec<ValueReport>,
}

/// Aggregated verification outcome for a charging session.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    /// Session identifier, echoed for display.
    pub session_id: String,
    /// The vendor format the session was verified as.
    pub format: FormatId,
    /// Session-level status.
    pub status: VerificationStatus,
    /// Session-level diagnostics; empty on success.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Evidence for the session-wide signature, for formats that sign one
    /// session buffer; empty otherwise.
    #[serde(default)]
    pub audit: AuditTrail,
    /// Per-measurement outcomes; empty when a session-fatal status was
    /// decided before per-value verification ran.
    pub measurements: Vec<MeasurementReport>,
}

impl SessionReport {
    /// All value reports of the session, in declared order.
    pub fn values(&self) -> impl Iterator<Item = &ValueReport> {
        self.measurements.iter().flat_map(|m| m.values.iter())
    }
}
