//! Signature normalization and per-curve ECDSA dispatch.
//!
//! The curve carried by a meter's key record decides where verification
//! runs: secp224k1 goes to the in-tree affine arithmetic, the NIST curves
//! go to the `p192`/`p256`/`p384`/`p521` crates' prehash verification.
//! Signatures are normalized first — an ASN.1 DER blob is decoded to its
//! `(r, s)` pair, a raw pair is used directly.
//!
//! A checked-and-rejected signature is `Ok(false)`; `Err` is reserved for
//! structurally malformed input (wrong-length key, undecodable DER) and
//! for arithmetic faults, which callers convert into the distinct
//! `InvalidPublicKey` / `InvalidSignature` statuses or abort on.

use crate::digest::{self, CurveId};
use crate::utilities::left_pad_vec;
use core::fmt;
use num_bigint::{BigInt, Sign};
use primitives::{KeyAttestation, PublicKeyRecord, RawSignature};
use secp224k1::{CurveError, Signature as K1Signature};

/// Signature material normalized to bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureData {
    /// Raw `(r, s)` scalars, big-endian.
    Pair {
        /// `r` component bytes.
        r: Vec<u8>,
        /// `s` component bytes.
        s: Vec<u8>,
    },
    /// ASN.1 DER-encoded `SEQUENCE { INTEGER r, INTEGER s }`.
    Der(Vec<u8>),
}

impl SignatureData {
    /// Normalize a parsed [`RawSignature`], hex-decoding its material.
    pub fn from_raw(raw: &RawSignature) -> Result<Self, VerifierError> {
        match raw {
            RawSignature::Pair { .. } => {
                let (r, s) = raw
                    .decode_pair()
                    .expect("pair variant")
                    .map_err(|e| VerifierError::MalformedSignature(e.to_string()))?;
                Ok(Self::Pair { r, s })
            }
            RawSignature::Der { .. } => {
                let der = raw
                    .decode_der()
                    .expect("der variant")
                    .map_err(|e| VerifierError::MalformedSignature(e.to_string()))?;
                Ok(Self::Der(der))
            }
        }
    }
}

/// Verification failure that is not a plain signature mismatch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifierError {
    /// The key record names a curve outside the supported set.
    UnknownCurve(String),
    /// Key material did not decode for the declared curve.
    InvalidPublicKey(String),
    /// Signature material was structurally undecodable.
    MalformedSignature(String),
    /// Arithmetic fault; never caused by input data.
    Fatal(String),
}

impl fmt::Display for VerifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCurve(name) => write!(f, "unknown curve {name:?}"),
            Self::InvalidPublicKey(msg) => write!(f, "invalid public key: {msg}"),
            Self::MalformedSignature(msg) => write!(f, "malformed signature: {msg}"),
            Self::Fatal(msg) => write!(f, "fatal: {msg}"),
        }
    }
}

impl core::error::Error for VerifierError {}

/// Strict reader for `SEQUENCE { INTEGER, INTEGER }`, the DER shape of an
/// ECDSA signature. Trailing bytes are rejected.
fn der_integer_pair(blob: &[u8]) -> Result<(BigInt, BigInt), VerifierError> {
    fn malformed(msg: &str) -> VerifierError {
        VerifierError::MalformedSignature(format!("DER: {msg}"))
    }

    fn read_len(data: &[u8]) -> Result<(usize, usize), VerifierError> {
        match data.first() {
            Some(&b) if b < 0x80 => Ok((b as usize, 1)),
            Some(&0x81) => match data.get(1) {
                Some(&l) if l >= 0x80 => Ok((l as usize, 2)),
                _ => Err(malformed("non-minimal long-form length")),
            },
            Some(_) => Err(malformed("unsupported length form")),
            None => Err(malformed("truncated length")),
        }
    }

    fn read_integer(data: &[u8]) -> Result<(BigInt, &[u8]), VerifierError> {
        if data.first() != Some(&0x02) {
            return Err(malformed("expected INTEGER tag"));
        }
        let (len, len_bytes) = read_len(&data[1..])?;
        let start = 1 + len_bytes;
        let end = start + len;
        if len == 0 || data.len() < end {
            return Err(malformed("truncated INTEGER"));
        }
        let value = &data[start..end];
        if value[0] & 0x80 != 0 {
            return Err(malformed("negative INTEGER"));
        }
        Ok((BigInt::from_bytes_be(Sign::Plus, value), &data[end..]))
    }

    if blob.first() != Some(&0x30) {
        return Err(malformed("expected SEQUENCE tag"));
    }
    let (seq_len, len_bytes) = read_len(&blob[1..])?;
    let body_start = 1 + len_bytes;
    if blob.len() != body_start + seq_len {
        return Err(malformed("length does not cover the blob"));
    }

    let body = &blob[body_start..];
    let (r, rest) = read_integer(body)?;
    let (s, rest) = read_integer(rest)?;
    if !rest.is_empty() {
        return Err(malformed("trailing bytes after INTEGER pair"));
    }
    Ok((r, s))
}

/// Fixed-width `r || s` bytes for the RustCrypto `Signature::from_slice`
/// constructors.
fn fixed_width_pair(
    curve: CurveId,
    signature: &SignatureData,
) -> Result<Vec<u8>, VerifierError> {
    let field_len = curve.field_len();
    let (r, s) = match signature {
        SignatureData::Pair { r, s } => (r.clone(), s.clone()),
        SignatureData::Der(blob) => {
            let (r, s) = der_integer_pair(blob)?;
            (r.to_bytes_be().1, s.to_bytes_be().1)
        }
    };
    let mut bytes = left_pad_vec(&r, field_len).ok_or_else(|| {
        VerifierError::MalformedSignature(format!("r wider than {field_len} bytes"))
    })?;
    bytes.extend(left_pad_vec(&s, field_len).ok_or_else(|| {
        VerifierError::MalformedSignature(format!("s wider than {field_len} bytes"))
    })?);
    Ok(bytes)
}

macro_rules! verify_with {
    ($curve_crate:ident, $curve_id:expr, $digest:expr, $signature:expr, $key:expr) => {{
        use $curve_crate::ecdsa::signature::hazmat::PrehashVerifier;
        let key = $curve_crate::ecdsa::VerifyingKey::from_sec1_bytes($key)
            .map_err(|e| VerifierError::InvalidPublicKey(e.to_string()))?;
        let rs = fixed_width_pair($curve_id, $signature)?;
        let signature = $curve_crate::ecdsa::Signature::from_slice(&rs)
            .map_err(|e| VerifierError::MalformedSignature(e.to_string()))?;
        Ok(key.verify_prehash($digest, &signature).is_ok())
    }};
}

fn verify_secp224k1(
    message_digest: &[u8],
    signature: &SignatureData,
    key: &[u8],
) -> Result<bool, VerifierError> {
    let curve = secp224k1::secp224k1();
    let point = secp224k1::decode_sec1(curve, key).map_err(|e| match e {
        CurveError::InvalidEncoding(_) | CurveError::PointNotOnCurve => {
            VerifierError::InvalidPublicKey(e.to_string())
        }
        other => VerifierError::Fatal(other.to_string()),
    })?;

    let sig = match signature {
        SignatureData::Pair { r, s } => K1Signature::from_be_bytes(r, s),
        SignatureData::Der(blob) => {
            let (r, s) = der_integer_pair(blob)?;
            K1Signature { r, s }
        }
    };

    let e = digest::secp224k1_digest_scalar(message_digest);
    secp224k1::verify(curve, &e, &sig, &point).map_err(|e| VerifierError::Fatal(e.to_string()))
}

/// Verify `signature` over `message_digest` against SEC1 `key` bytes on
/// `curve`.
///
/// `message_digest` is the full digest from [`crate::digest::digest`];
/// per-curve truncation (leftmost bits for the NIST curves, the 31-bit
/// shift for secp224k1) happens inside.
pub fn verify_digest(
    curve: CurveId,
    message_digest: &[u8],
    signature: &SignatureData,
    key: &[u8],
) -> Result<bool, VerifierError> {
    tracing::trace!(curve = curve.name(), "verifying signature");
    match curve {
        CurveId::Secp224k1 => verify_secp224k1(message_digest, signature, key),
        CurveId::Secp192r1 => verify_with!(p192, curve, message_digest, signature, key),
        CurveId::Secp256r1 => verify_with!(p256, curve, message_digest, signature, key),
        CurveId::Secp384r1 => verify_with!(p384, curve, message_digest, signature, key),
        CurveId::Secp521r1 => verify_with!(p521, curve, message_digest, signature, key),
    }
}

/// Check one provenance attestation over `attested_key` bytes.
///
/// The attestation's signer key and curve come from the registry record;
/// the digest is the attested key material hashed with the signer curve's
/// paired hash. Delegates to the same dispatch as value verification.
pub fn verify_attestation(
    attested_key: &[u8],
    attestation: &KeyAttestation,
) -> Result<bool, VerifierError> {
    let curve = CurveId::parse(&attestation.algorithm)
        .ok_or_else(|| VerifierError::UnknownCurve(attestation.algorithm.clone()))?;
    let signer_key = hex::decode(&attestation.signer_key)
        .map_err(|e| VerifierError::InvalidPublicKey(e.to_string()))?;
    let signature = SignatureData::from_raw(&attestation.signature)?;
    let message_digest = digest::digest(curve, attested_key);
    verify_digest(curve, &message_digest, &signature, &signer_key)
}

/// Check every provenance attestation attached to a key record, in
/// declared order.
pub fn verify_key_provenance(record: &PublicKeyRecord) -> Result<Vec<bool>, VerifierError> {
    let attested_key = record
        .key_bytes()
        .map_err(|e| VerifierError::InvalidPublicKey(e.to_string()))?;
    record
        .attestations
        .iter()
        .map(|attestation| verify_attestation(&attested_key, attestation))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::digest;
    use num_bigint::BigInt;
    use p256::ecdsa::signature::hazmat::PrehashSigner;
    use p256::elliptic_curve::sec1::ToEncodedPoint;

    fn p256_keypair() -> (p256::ecdsa::SigningKey, Vec<u8>) {
        let sk = p256::ecdsa::SigningKey::from_slice(&[
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
            0x0f, 0x10, 0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c,
            0x1d, 0x1e, 0x1f, 0x20,
        ])
        .unwrap();
        let key = sk.verifying_key().to_encoded_point(false).as_bytes().to_vec();
        (sk, key)
    }

    #[test]
    fn p256_pair_and_der_forms_verify() {
        let (sk, key) = p256_keypair();
        let message_digest = digest(CurveId::Secp256r1, b"meter record");
        let sig: p256::ecdsa::Signature = sk.sign_prehash(&message_digest).unwrap();

        let (r, s) = {
            let bytes = sig.to_bytes();
            (bytes[..32].to_vec(), bytes[32..].to_vec())
        };
        let pair = SignatureData::Pair { r, s };
        assert!(verify_digest(CurveId::Secp256r1, &message_digest, &pair, &key).unwrap());

        let der = SignatureData::Der(sig.to_der().as_bytes().to_vec());
        assert!(verify_digest(CurveId::Secp256r1, &message_digest, &der, &key).unwrap());

        let other_digest = digest(CurveId::Secp256r1, b"altered record");
        assert!(!verify_digest(CurveId::Secp256r1, &other_digest, &pair, &key).unwrap());
    }

    #[test]
    fn p256_structural_failures_are_typed() {
        let (sk, key) = p256_keypair();
        let message_digest = digest(CurveId::Secp256r1, b"meter record");
        let sig: p256::ecdsa::Signature = sk.sign_prehash(&message_digest).unwrap();
        let pair = {
            let bytes = sig.to_bytes();
            SignatureData::Pair { r: bytes[..32].to_vec(), s: bytes[32..].to_vec() }
        };

        // truncated key
        let err = verify_digest(CurveId::Secp256r1, &message_digest, &pair, &key[..30]).unwrap_err();
        assert!(matches!(err, VerifierError::InvalidPublicKey(_)));

        // undecodable DER
        let err = verify_digest(
            CurveId::Secp256r1,
            &message_digest,
            &SignatureData::Der(vec![0x31, 0x00]),
            &key,
        )
        .unwrap_err();
        assert!(matches!(err, VerifierError::MalformedSignature(_)));

        // oversized r scalar
        let err = verify_digest(
            CurveId::Secp256r1,
            &message_digest,
            &SignatureData::Pair { r: vec![1; 33], s: vec![1; 32] },
            &key,
        )
        .unwrap_err();
        assert!(matches!(err, VerifierError::MalformedSignature(_)));
    }

    #[test]
    fn secp224k1_dispatches_to_custom_arithmetic() {
        let curve = secp224k1::secp224k1();
        let d = BigInt::parse_bytes(
            b"6b2cd71c34fd7b2b2e24c8d3ec44ecb21e98e46a8274b06d34021e15",
            16,
        )
        .unwrap();
        let q = curve.scalar_multiply(&curve.g, &d).unwrap();
        let key = {
            let (x, y) = match &q {
                secp224k1::Point::Affine { x, y } => (x.clone(), y.clone()),
                secp224k1::Point::Identity => unreachable!(),
            };
            let mut bytes = vec![0x04];
            bytes.extend(left_pad_vec(&x.to_bytes_be().1, 28).unwrap());
            bytes.extend(left_pad_vec(&y.to_bytes_be().1, 28).unwrap());
            bytes
        };

        let message_digest = digest(CurveId::Secp224k1, b"meter record");
        let e = crate::digest::secp224k1_digest_scalar(&message_digest);
        let k = BigInt::parse_bytes(
            b"00d2e4a3f9b1c06dbd7ab70a9b2cbf6b8a1ec9dbae981b0ee17e00a3",
            16,
        )
        .unwrap();
        let sig = secp224k1::sign(curve, &e, &k, &d).unwrap();

        let pair = SignatureData::Pair {
            r: sig.r.to_bytes_be().1,
            s: sig.s.to_bytes_be().1,
        };
        assert!(verify_digest(CurveId::Secp224k1, &message_digest, &pair, &key).unwrap());

        let tampered = digest(CurveId::Secp224k1, b"altered record");
        assert!(!verify_digest(CurveId::Secp224k1, &tampered, &pair, &key).unwrap());

        // compressed keys are not a supported encoding on this curve
        let mut compressed = key[..29].to_vec();
        compressed[0] = 0x02;
        let err = verify_digest(CurveId::Secp224k1, &message_digest, &pair, &compressed).unwrap_err();
        assert!(matches!(err, VerifierError::InvalidPublicKey(_)));
    }

    #[test]
    fn der_reader_round_trip() {
        // SEQUENCE { INTEGER 1, INTEGER 2 }
        let blob = [0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02];
        let (r, s) = der_integer_pair(&blob).unwrap();
        assert_eq!(r, BigInt::from(1));
        assert_eq!(s, BigInt::from(2));

        assert!(der_integer_pair(&[0x30, 0x03, 0x02, 0x01, 0x01]).is_err()); // one INTEGER
        assert!(der_integer_pair(&[0x30, 0x07, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02, 0x00]).is_err());
        assert!(der_integer_pair(&[]).is_err());
    }

    #[test]
    fn attestation_check_uses_signer_curve() {
        let (sk, signer_key) = p256_keypair();
        let attested_key = hex::decode("04a1b2c3").unwrap();
        let message_digest = digest(CurveId::Secp256r1, &attested_key);
        let sig: p256::ecdsa::Signature = sk.sign_prehash(&message_digest).unwrap();

        let attestation = KeyAttestation {
            algorithm: "ECC secp256r1".into(),
            signer_key: hex::encode(&signer_key),
            signature: primitives::RawSignature::Der { der: hex::encode(sig.to_der().as_bytes()) },
        };
        assert!(verify_attestation(&attested_key, &attestation).unwrap());

        let mut record = PublicKeyRecord::new("ECC secp256r1", hex::encode(&attested_key));
        record.attestations.push(attestation.clone());
        assert_eq!(verify_key_provenance(&record).unwrap(), vec![true]);

        let bad = KeyAttestation { algorithm: "curve25519".into(), ..attestation };
        assert!(matches!(
            verify_attestation(&attested_key, &bad),
            Err(VerifierError::UnknownCurve(_))
        ));
    }
}
