//! Vendor format strategies.
//!
//! One strategy per vendor wires the canonical encoder, the digest
//! selector and the signature verifier together with its own field table,
//! curve choice and consistency invariants. Strategies live in a closed
//! registry resolved from the session's format context; anything
//! unrecognized is reported as `UnknownFormat` by the orchestrator.

use crate::digest::CurveId;
use crate::encoder::EncodeError;
use crate::verifier::{self, SignatureData, VerifierError};
use crate::EngineError;
use core::fmt;
use once_cell::sync::OnceCell;
use primitives::{
    AuditTrail, ChargingSession, FieldHex, FormatId, Measurement, MeasurementValue,
    PublicKeyRecord, RawSignature, VerificationStatus,
};
use std::collections::HashMap;

pub mod alfen;
pub mod bsm;
pub mod chargepoint;
pub mod emh;
pub mod gdf;

/// Session-level defect found before any cryptography runs.
///
/// Every variant is fatal to the whole session: no partial credit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionDefect {
    /// Fewer than two values: no start/stop pair exists.
    TooFewValues {
        /// Number of values present.
        count: usize,
    },
    /// A timestamp decreased in declared value order.
    NonMonotonicTimestamps {
        /// Index of the offending value.
        index: usize,
        /// The predecessor's timestamp, rendered.
        previous: String,
        /// The offending timestamp, rendered.
        current: String,
    },
    /// A field that must be identical across the session's records was not.
    Inconsistent {
        /// Field name.
        field: &'static str,
        /// Value on the first record.
        expected: String,
        /// Deviating value.
        actual: String,
    },
    /// A mandatory field was absent.
    Missing {
        /// Field name.
        field: String,
    },
    /// A mandatory field was present but unusable.
    Malformed {
        /// Field name.
        field: String,
        /// What was wrong with it.
        reason: String,
    },
}

impl SessionDefect {
    /// The session status this defect maps to.
    pub fn status(&self) -> VerificationStatus {
        match self {
            Self::TooFewValues { .. } => VerificationStatus::AtLeastTwoValuesRequired,
            Self::NonMonotonicTimestamps { .. } => VerificationStatus::InconsistentTimestamps,
            Self::Inconsistent { .. } | Self::Missing { .. } | Self::Malformed { .. } => {
                VerificationStatus::InvalidFormat
            }
        }
    }
}

impl fmt::Display for SessionDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewValues { count } => {
                write!(f, "session has {count} value(s), at least two are required")
            }
            Self::NonMonotonicTimestamps { index, previous, current } => write!(
                f,
                "timestamp of value {index} ({current}) is before its predecessor ({previous})"
            ),
            Self::Inconsistent { field, expected, actual } => write!(
                f,
                "field {field:?} differs across records: {expected:?} vs {actual:?}"
            ),
            Self::Missing { field } => write!(f, "mandatory field {field:?} is missing"),
            Self::Malformed { field, reason } => {
                write!(f, "field {field:?} is unusable: {reason}")
            }
        }
    }
}

impl From<EncodeError> for SessionDefect {
    fn from(e: EncodeError) -> Self {
        Self::Malformed { field: e.field().to_string(), reason: e.to_string() }
    }
}

/// Everything a strategy needs to verify one value.
#[derive(Clone, Copy, Debug)]
pub struct ValueContext<'a> {
    /// The session the value belongs to.
    pub session: &'a ChargingSession,
    /// The measurement the value belongs to.
    pub measurement: &'a Measurement,
    /// The value itself.
    pub value: &'a MeasurementValue,
    /// Index of the value in declared order.
    pub index: usize,
    /// Number of values in the measurement.
    pub total: usize,
    /// Resolved key record for the measurement's meter, if registered.
    pub key: Option<&'a PublicKeyRecord>,
}

/// Outcome of one verification step: a status plus its evidence.
#[derive(Clone, Debug)]
pub struct Outcome {
    /// The decided status.
    pub status: VerificationStatus,
    /// Human-readable diagnostics; empty on success.
    pub errors: Vec<String>,
    /// Byte-exact evidence for audit display.
    pub audit: AuditTrail,
}

impl Outcome {
    fn new(status: VerificationStatus, audit: AuditTrail) -> Self {
        Self { status, errors: Vec::new(), audit }
    }

    fn with_error(status: VerificationStatus, audit: AuditTrail, error: impl Into<String>) -> Self {
        Self { status, errors: vec![error.into()], audit }
    }
}

/// A vendor signing format.
pub trait FormatStrategy: Send + Sync + fmt::Debug {
    /// The format's identifier.
    fn id(&self) -> FormatId;

    /// The curve this format's meters sign with.
    fn curve(&self) -> CurveId;

    /// Whether individual values carry signatures. Formats returning
    /// `false` sign one session-wide buffer instead.
    fn signs_values(&self) -> bool {
        true
    }

    /// Format-specific consistency invariants, checked before any
    /// cryptography. A defect is fatal to the session.
    fn check_session(&self, session: &ChargingSession) -> Result<(), SessionDefect>;

    /// Verify a single value. Position classification happens later, at
    /// session level.
    fn verify_value(&self, ctx: &ValueContext<'_>) -> Result<Outcome, EngineError>;

    /// Verify the session-wide signature. `None` for per-value formats.
    fn verify_session_signature(
        &self,
        session: &ChargingSession,
        key: Option<&PublicKeyRecord>,
    ) -> Option<Result<Outcome, EngineError>> {
        let _ = (session, key);
        None
    }
}

/// Closed registry of the known format strategies.
#[derive(Debug)]
pub struct Formats {
    inner: HashMap<FormatId, &'static dyn FormatStrategy>,
}

impl Formats {
    /// The standard registry with every built-in vendor format.
    pub fn standard() -> &'static Self {
        static INSTANCE: OnceCell<Formats> = OnceCell::new();
        INSTANCE.get_or_init(|| {
            let mut formats = Formats { inner: HashMap::new() };
            formats.register(&alfen::Alfen);
            formats.register(&chargepoint::ChargePoint);
            formats.register(&emh::Emh);
            formats.register(&gdf::Gdf);
            formats.register(&bsm::Bsm);
            formats
        })
    }

    fn register(&mut self, strategy: &'static dyn FormatStrategy) {
        self.inner.insert(strategy.id(), strategy);
    }

    /// Strategy for a format identifier, if registered.
    pub fn get(&self, id: FormatId) -> Option<&'static dyn FormatStrategy> {
        self.inner.get(&id).copied()
    }

    /// Strategy for a session's format context.
    pub fn for_context(&self, context: &str) -> Option<&'static dyn FormatStrategy> {
        self.get(FormatId::from_context(context))
    }

    /// Registered format identifiers.
    pub fn ids(&self) -> impl Iterator<Item = FormatId> + '_ {
        self.inner.keys().copied()
    }
}

// ---- shared session checks -------------------------------------------------

/// Every measurement needs at least a start and a stop value.
pub(crate) fn check_min_values(measurement: &Measurement) -> Result<(), SessionDefect> {
    let count = measurement.values.len();
    if count < 2 {
        return Err(SessionDefect::TooFewValues { count });
    }
    Ok(())
}

/// Timestamps must be non-decreasing in declared array order.
pub(crate) fn check_monotonic_timestamps(measurement: &Measurement) -> Result<(), SessionDefect> {
    for (index, pair) in measurement.values.windows(2).enumerate() {
        if pair[1].timestamp < pair[0].timestamp {
            return Err(SessionDefect::NonMonotonicTimestamps {
                index: index + 1,
                previous: pair[0].timestamp.to_string(),
                current: pair[1].timestamp.to_string(),
            });
        }
    }
    Ok(())
}

/// A format-specific extra field that must be present on every value.
pub(crate) fn require_extra<'a>(
    value: &'a MeasurementValue,
    field: &'static str,
) -> Result<&'a str, SessionDefect> {
    value
        .extra(field)
        .ok_or_else(|| SessionDefect::Missing { field: field.to_string() })
}

/// An extra field that must be present and identical on every value.
pub(crate) fn check_consistent_extra(
    measurement: &Measurement,
    field: &'static str,
) -> Result<(), SessionDefect> {
    let mut expected: Option<&str> = None;
    for value in &measurement.values {
        let actual = require_extra(value, field)?;
        match expected {
            None => expected = Some(actual),
            Some(expected) if expected != actual => {
                return Err(SessionDefect::Inconsistent {
                    field,
                    expected: expected.to_string(),
                    actual: actual.to_string(),
                })
            }
            Some(_) => {}
        }
    }
    Ok(())
}

// ---- shared verification path ----------------------------------------------

/// Run the key-resolution / signature-verification tail every per-value
/// format shares, converting structural failures into their statuses.
///
/// `buffer_hex`, `fields` and `message_digest` describe the canonical
/// buffer the caller already built; they are preserved in the audit trail
/// whatever the outcome, so an auditor can recompute the digest even for a
/// value that failed on key lookup.
pub(crate) fn verify_against_key(
    curve: CurveId,
    buffer_hex: String,
    fields: Vec<FieldHex>,
    message_digest: &[u8],
    signature: Option<&RawSignature>,
    key: Option<&PublicKeyRecord>,
) -> Result<Outcome, EngineError> {
    let audit = AuditTrail {
        canonical_buffer: buffer_hex,
        digest: hex::encode(message_digest),
        public_key: key.map(PublicKeyRecord::key_hex).unwrap_or_default(),
        signature: signature.map(RawSignature::to_hex).unwrap_or_default(),
        fields,
    };

    let Some(key) = key else {
        return Ok(Outcome::with_error(
            VerificationStatus::PublicKeyNotFound,
            audit,
            "no public key registered for this meter",
        ));
    };

    match CurveId::parse(&key.algorithm) {
        None => {
            return Ok(Outcome::with_error(
                VerificationStatus::InvalidPublicKey,
                audit,
                format!("key declares unrecognized curve {:?}", key.algorithm),
            ))
        }
        Some(declared) if declared != curve => {
            return Ok(Outcome::with_error(
                VerificationStatus::InvalidPublicKey,
                audit,
                format!(
                    "key declares curve {}, format requires {}",
                    declared.name(),
                    curve.name()
                ),
            ))
        }
        Some(_) => {}
    }

    let key_bytes = match key.key_bytes() {
        Ok(bytes) => bytes,
        Err(e) => {
            return Ok(Outcome::with_error(
                VerificationStatus::InvalidPublicKey,
                audit,
                format!("key material is not hex: {e}"),
            ))
        }
    };

    let Some(signature) = signature else {
        return Ok(Outcome::with_error(
            VerificationStatus::InvalidFormat,
            audit,
            "record carries no signature",
        ));
    };

    let data = match SignatureData::from_raw(signature) {
        Ok(data) => data,
        Err(e) => {
            return Ok(Outcome::with_error(
                VerificationStatus::InvalidSignature,
                audit,
                e.to_string(),
            ))
        }
    };

    match verifier::verify_digest(curve, message_digest, &data, &key_bytes) {
        Ok(true) => Ok(Outcome::new(VerificationStatus::ValidSignature, audit)),
        Ok(false) => Ok(Outcome::with_error(
            VerificationStatus::InvalidSignature,
            audit,
            "signature does not match the computed digest",
        )),
        Err(VerifierError::Fatal(msg)) => Err(EngineError::Arithmetic(msg)),
        Err(e @ (VerifierError::InvalidPublicKey(_) | VerifierError::UnknownCurve(_))) => Ok(
            Outcome::with_error(VerificationStatus::InvalidPublicKey, audit, e.to_string()),
        ),
        Err(e @ VerifierError::MalformedSignature(_)) => Ok(Outcome::with_error(
            VerificationStatus::InvalidSignature,
            audit,
            e.to_string(),
        )),
    }
}
