//! Verification status taxonomy.
//!
//! One closed enum covers format-level, consistency-level and
//! cryptography-level outcomes, plus the positional labels applied after
//! session-level classification. Exactly one status holds per value (or
//! session) at any time; the only permitted relabeling is
//! [`VerificationStatus::classified`].

use core::fmt;
use serde::{Deserialize, Serialize};

/// Position of a value inside a session's ordered value sequence.
///
/// The first value of a measurement is the session start, the last is the
/// stop; everything in between is intermediate. With exactly two values
/// there is no intermediate position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValuePosition {
    /// First value of the session.
    Start,
    /// Interior value.
    Intermediate,
    /// Last value of the session.
    Stop,
}

impl ValuePosition {
    /// Position of index `index` in a sequence of `total` values.
    pub fn of(index: usize, total: usize) -> Self {
        if index == 0 {
            Self::Start
        } else if index + 1 == total {
            Self::Stop
        } else {
            Self::Intermediate
        }
    }
}

/// Outcome of verifying a measurement value or a charging session.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationStatus {
    // format-level outcomes, decided before any cryptography runs
    /// The session's format context matched no known vendor format.
    UnknownFormat = 0x00,
    /// Mandatory fields were missing or malformed for the chosen format.
    InvalidFormat,

    // consistency-level outcomes, fatal to the whole session
    /// A value's timestamp decreased relative to its predecessor.
    InconsistentTimestamps = 0x10,
    /// A session needs at least a start and a stop value.
    AtLeastTwoValuesRequired,

    // cryptography-level outcomes, fatal to the individual value only
    /// No public key is registered for the meter identity.
    PublicKeyNotFound = 0x20,
    /// The registered key material could not be decoded for the declared curve.
    InvalidPublicKey,
    /// The signature did not verify (or was structurally undecodable).
    InvalidSignature,
    /// The signature verified against the registered public key.
    ValidSignature,

    // positional outcomes for formats that do not sign individual values
    /// Value carries no individual signature; nothing was checked.
    NoOperation = 0x30,
    /// Unchecked value in start position.
    StartValue,
    /// Unchecked value in intermediate position.
    IntermediateValue,
    /// Unchecked value in stop position.
    StopValue,

    // per-value outcomes after session-level classification
    /// Verified value in start position.
    ValidStartValue = 0x40,
    /// Verified value in intermediate position.
    ValidIntermediateValue,
    /// Verified value in stop position.
    ValidStopValue,
    /// Failed value in start position.
    InvalidStartValue,
    /// Failed value in intermediate position.
    InvalidIntermediateValue,
    /// Failed value in stop position.
    InvalidStopValue,
}

impl VerificationStatus {
    /// Whether this status counts as cryptographically sound when folding a
    /// session result. Positional labels of non-signing formats count as
    /// sound: they were never supposed to carry a signature.
    pub fn is_ok(&self) -> bool {
        matches!(
            self,
            Self::ValidSignature
                | Self::ValidStartValue
                | Self::ValidIntermediateValue
                | Self::ValidStopValue
                | Self::NoOperation
                | Self::StartValue
                | Self::IntermediateValue
                | Self::StopValue
        )
    }

    /// Whether this status aborts the whole session before or during
    /// verification (no partial credit).
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownFormat
                | Self::InvalidFormat
                | Self::InconsistentTimestamps
                | Self::AtLeastTwoValuesRequired
        )
    }

    /// Relabel a per-value status by its position in the session.
    ///
    /// Only the three pre-classification statuses are affected; every other
    /// status is returned unchanged.
    pub fn classified(self, position: ValuePosition) -> Self {
        match (self, position) {
            (Self::ValidSignature, ValuePosition::Start) => Self::ValidStartValue,
            (Self::ValidSignature, ValuePosition::Intermediate) => Self::ValidIntermediateValue,
            (Self::ValidSignature, ValuePosition::Stop) => Self::ValidStopValue,
            (Self::InvalidSignature, ValuePosition::Start) => Self::InvalidStartValue,
            (Self::InvalidSignature, ValuePosition::Intermediate) => {
                Self::InvalidIntermediateValue
            }
            (Self::InvalidSignature, ValuePosition::Stop) => Self::InvalidStopValue,
            (Self::NoOperation, ValuePosition::Start) => Self::StartValue,
            (Self::NoOperation, ValuePosition::Intermediate) => Self::IntermediateValue,
            (Self::NoOperation, ValuePosition::Stop) => Self::StopValue,
            (status, _) => status,
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnknownFormat => "unknown format",
            Self::InvalidFormat => "invalid format",
            Self::InconsistentTimestamps => "inconsistent timestamps",
            Self::AtLeastTwoValuesRequired => "at least two values required",
            Self::PublicKeyNotFound => "public key not found",
            Self::InvalidPublicKey => "invalid public key",
            Self::InvalidSignature => "invalid signature",
            Self::ValidSignature => "valid signature",
            Self::NoOperation => "no operation",
            Self::StartValue => "start value",
            Self::IntermediateValue => "intermediate value",
            Self::StopValue => "stop value",
            Self::ValidStartValue => "valid start value",
            Self::ValidIntermediateValue => "valid intermediate value",
            Self::ValidStopValue => "valid stop value",
            Self::InvalidStartValue => "invalid start value",
            Self::InvalidIntermediateValue => "invalid intermediate value",
            Self::InvalidStopValue => "invalid stop value",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_of_two_values_has_no_intermediate() {
        assert_eq!(ValuePosition::of(0, 2), ValuePosition::Start);
        assert_eq!(ValuePosition::of(1, 2), ValuePosition::Stop);
    }

    #[test]
    fn position_of_interior_values() {
        assert_eq!(ValuePosition::of(0, 4), ValuePosition::Start);
        assert_eq!(ValuePosition::of(1, 4), ValuePosition::Intermediate);
        assert_eq!(ValuePosition::of(2, 4), ValuePosition::Intermediate);
        assert_eq!(ValuePosition::of(3, 4), ValuePosition::Stop);
    }

    #[test]
    fn classification_relabels_only_preclassified_statuses() {
        use ValuePosition::*;
        use VerificationStatus::*;

        assert_eq!(ValidSignature.classified(Start), ValidStartValue);
        assert_eq!(ValidSignature.classified(Intermediate), ValidIntermediateValue);
        assert_eq!(ValidSignature.classified(Stop), ValidStopValue);
        assert_eq!(InvalidSignature.classified(Stop), InvalidStopValue);
        assert_eq!(NoOperation.classified(Start), StartValue);
        assert_eq!(NoOperation.classified(Stop), StopValue);

        // statuses outside the classification set are untouched
        assert_eq!(PublicKeyNotFound.classified(Start), PublicKeyNotFound);
        assert_eq!(InvalidPublicKey.classified(Stop), InvalidPublicKey);
        assert_eq!(ValidStartValue.classified(Stop), ValidStartValue);
    }

    #[test]
    fn ok_statuses() {
        assert!(VerificationStatus::ValidSignature.is_ok());
        assert!(VerificationStatus::NoOperation.is_ok());
        assert!(VerificationStatus::StopValue.is_ok());
        assert!(!VerificationStatus::InvalidSignature.is_ok());
        assert!(!VerificationStatus::PublicKeyNotFound.is_ok());
        assert!(!VerificationStatus::UnknownFormat.is_ok());
    }
}
