//! Curve identifiers and the curve-to-hash pairing.
//!
//! Every vendor format signs a digest of its canonical buffer; which hash
//! produced that digest is determined by the curve the key lives on:
//! SHA-256 for the 192/224/256-bit curves, SHA-384 for 384-bit, SHA-512
//! for 521-bit. secp224k1 additionally right-shifts the digest by 31 bits
//! to fit the curve order — a quirk of the deployed signers that must be
//! reproduced exactly, not corrected.

use num_bigint::{BigInt, Sign};
use sha2::{Digest, Sha256, Sha384, Sha512};

/// The closed set of curves deployed meters sign with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CurveId {
    /// NIST P-192 / secp192r1.
    Secp192r1,
    /// SEC2 secp224k1 (Koblitz), handled by the in-tree arithmetic.
    Secp224k1,
    /// NIST P-256 / secp256r1.
    Secp256r1,
    /// NIST P-384 / secp384r1.
    Secp384r1,
    /// NIST P-521 / secp521r1.
    Secp521r1,
}

/// Hash algorithm paired with a curve.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashAlg {
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl CurveId {
    /// Parse a registry/vendor curve name.
    ///
    /// Accepts the SEC name, the NIST alias, and the `ECC `/`ECDSA `
    /// prefixed spellings key registries use (`ECC secp224k1`,
    /// `NIST P-256`, `prime256v1`).
    pub fn parse(name: &str) -> Option<Self> {
        let lowered = name.trim().to_lowercase();
        let stripped = lowered
            .strip_prefix("ecdsa ")
            .or_else(|| lowered.strip_prefix("ecc "))
            .unwrap_or(&lowered);
        match stripped {
            "secp192r1" | "p-192" | "nist p-192" | "prime192v1" => Some(Self::Secp192r1),
            "secp224k1" => Some(Self::Secp224k1),
            "secp256r1" | "p-256" | "nist p-256" | "prime256v1" => Some(Self::Secp256r1),
            "secp384r1" | "p-384" | "nist p-384" => Some(Self::Secp384r1),
            "secp521r1" | "p-521" | "nist p-521" => Some(Self::Secp521r1),
            _ => None,
        }
    }

    /// Canonical SEC name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Secp192r1 => "secp192r1",
            Self::Secp224k1 => "secp224k1",
            Self::Secp256r1 => "secp256r1",
            Self::Secp384r1 => "secp384r1",
            Self::Secp521r1 => "secp521r1",
        }
    }

    /// Field width in bits.
    pub fn field_bits(&self) -> u32 {
        match self {
            Self::Secp192r1 => 192,
            Self::Secp224k1 => 224,
            Self::Secp256r1 => 256,
            Self::Secp384r1 => 384,
            Self::Secp521r1 => 521,
        }
    }

    /// Width of one signature scalar in bytes.
    pub fn field_len(&self) -> usize {
        (self.field_bits() as usize).div_ceil(8)
    }

    /// The hash algorithm paired with this curve.
    pub fn hash(&self) -> HashAlg {
        match self.field_bits() {
            384 => HashAlg::Sha384,
            521 => HashAlg::Sha512,
            _ => HashAlg::Sha256,
        }
    }
}

impl HashAlg {
    /// Digest of `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }
}

/// Digest of a canonical buffer under the hash paired with `curve`.
pub fn digest(curve: CurveId, data: &[u8]) -> Vec<u8> {
    curve.hash().digest(data)
}

/// The integer secp224k1 signers actually sign: the SHA-256 digest
/// right-shifted by 31 bits.
pub fn secp224k1_digest_scalar(digest: &[u8]) -> BigInt {
    BigInt::from_bytes_be(Sign::Plus, digest) >> 31u32
}
