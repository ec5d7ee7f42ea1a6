//! # meterproof-primitives
//!
//! Data model shared by the meterproof verification engine and its
//! embedders: parsed charging sessions, measurement values, public-key
//! records, the verification status taxonomy, and the report types the
//! engine produces.
//!
//! All types here are plain data. Parsing collaborators build them (for
//! example from JSON via serde), the engine consumes them read-only and
//! returns [`report::SessionReport`] side tables; nothing in this crate
//! performs cryptography.

pub mod decimal;
pub mod format;
pub mod meter;
pub mod obis;
pub mod report;
pub mod session;
pub mod status;

pub use decimal::{DecimalError, DecimalValue};
pub use format::FormatId;
pub use meter::{InMemoryMeterRegistry, KeyAttestation, MeterRegistry, PublicKeyRecord};
pub use obis::{ObisCode, ObisError};
pub use report::{AuditTrail, FieldHex, MeasurementReport, SessionReport, ValueReport};
pub use session::{ChargingSession, Measurement, MeasurementValue, RawSignature};
pub use status::{ValuePosition, VerificationStatus};
