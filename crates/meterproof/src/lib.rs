//! # meterproof
//!
//! Multi-format cryptographic verification engine for signed EV
//! charging-session meter readings.
//!
//! Given a parsed [`primitives::ChargingSession`] and a
//! [`primitives::MeterRegistry`], the engine reconstructs — per vendor
//! format — the exact byte sequence each meter signed, hashes it with the
//! hash paired to the key's curve, verifies the elliptic-curve signature,
//! and folds per-value outcomes into one session-level
//! [`primitives::SessionReport`].
//!
//! The moving parts, leaf first:
//!
//! - [`encoder`] — bit-exact canonical buffer construction from per-format
//!   field tables
//! - [`digest`] — curve-to-hash pairing and digest computation
//! - [`verifier`] — signature normalization and per-curve ECDSA dispatch
//! - [`formats`] — one strategy per vendor format, in a closed registry
//! - [`verify`] — the session orchestrator
//!
//! Verification is synchronous, deterministic and free of shared mutable
//! state; results are returned as side tables, never written into the
//! parsed session.

pub mod digest;
pub mod encoder;
pub mod formats;
pub mod utilities;
pub mod verifier;
pub mod verify;

pub use primitives;
pub use secp224k1;

pub use digest::CurveId;
pub use formats::{FormatStrategy, Formats, Outcome, SessionDefect, ValueContext};
pub use verifier::{verify_attestation, verify_key_provenance, SignatureData, VerifierError};
pub use verify::{verify_session, verify_single_value};

use core::fmt;

/// Non-recoverable engine fault.
///
/// Validation failures are statuses, not errors; this type only surfaces
/// faults in the verification machinery itself (a modular inverse that
/// cannot exist over a prime field). Embedders should log it and abort the
/// affected run rather than map it to a verification status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// Curve arithmetic reported an impossible condition.
    Arithmetic(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arithmetic(msg) => write!(f, "curve arithmetic fault: {msg}"),
        }
    }
}

impl core::error::Error for EngineError {}
