//! ECDSA over the affine arithmetic in [`crate::curve`].

use crate::arith::{mod_inverse, modulo};
use crate::curve::{Curve, CurveError, Point};
use num_bigint::{BigInt, Sign};
use num_traits::Zero;

/// An ECDSA signature as its two scalars.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    /// The `r` component.
    pub r: BigInt,
    /// The `s` component.
    pub s: BigInt,
}

impl Signature {
    /// Signature from big-endian component bytes.
    pub fn from_be_bytes(r: &[u8], s: &[u8]) -> Self {
        Self {
            r: BigInt::from_bytes_be(Sign::Plus, r),
            s: BigInt::from_bytes_be(Sign::Plus, s),
        }
    }
}

/// Decode a SEC1 uncompressed public key (`04 || X || Y`).
///
/// Compressed encodings are rejected: the signing vendors emit
/// uncompressed keys and decompression would need a field square root this
/// crate has no use for otherwise.
pub fn decode_sec1(curve: &Curve, bytes: &[u8]) -> Result<Point, CurveError> {
    let field_len = curve.field_len();
    match bytes.first() {
        Some(0x04) => {}
        Some(0x02) | Some(0x03) => {
            return Err(CurveError::InvalidEncoding(
                "compressed points are not supported".into(),
            ))
        }
        _ => {
            return Err(CurveError::InvalidEncoding(
                "missing SEC1 uncompressed tag".into(),
            ))
        }
    }
    if bytes.len() != 1 + 2 * field_len {
        return Err(CurveError::InvalidEncoding(format!(
            "expected {} key bytes, got {}",
            1 + 2 * field_len,
            bytes.len()
        )));
    }

    let x = BigInt::from_bytes_be(Sign::Plus, &bytes[1..1 + field_len]);
    let y = BigInt::from_bytes_be(Sign::Plus, &bytes[1 + field_len..]);
    let point = Point::affine(x, y);
    if !curve.contains(&point) {
        return Err(CurveError::PointNotOnCurve);
    }
    Ok(point)
}

/// Sign digest value `e` with private scalar `d` and nonce `k`.
///
/// `e` is the (possibly truncated) digest interpreted as an integer; the
/// caller owns nonce generation. Fails with
/// [`CurveError::UnsuitableNonce`] when `k` yields a zero component — pick
/// another nonce and retry.
pub fn sign(curve: &Curve, e: &BigInt, k: &BigInt, d: &BigInt) -> Result<Signature, CurveError> {
    let kg = curve.scalar_multiply(&curve.g, k)?;
    let r = match &kg {
        Point::Identity => BigInt::zero(),
        Point::Affine { x, .. } => modulo(x, &curve.n),
    };
    if r.is_zero() {
        return Err(CurveError::UnsuitableNonce);
    }

    let k_inv = mod_inverse(k, &curve.n).ok_or(CurveError::NonInvertible)?;
    let s = modulo(&(&k_inv * (e + &r * d)), &curve.n);
    if s.is_zero() {
        return Err(CurveError::UnsuitableNonce);
    }

    Ok(Signature { r, s })
}

/// Verify signature `(r, s)` over digest value `e` against public point
/// `q`.
///
/// Zero or out-of-order components fail fast as invalid before any point
/// arithmetic. `Ok(false)` is a checked-and-rejected signature; `Err` is
/// reserved for arithmetic faults.
pub fn verify(
    curve: &Curve,
    e: &BigInt,
    signature: &Signature,
    q: &Point,
) -> Result<bool, CurveError> {
    let n = &curve.n;
    let (r, s) = (&signature.r, &signature.s);
    if r.is_zero() || s.is_zero() || r >= n || s >= n {
        return Ok(false);
    }

    let w = mod_inverse(s, n).ok_or(CurveError::NonInvertible)?;
    let u1 = modulo(&(e * &w), n);
    let u2 = modulo(&(r * &w), n);

    let u1g = if u1.is_zero() {
        Point::Identity
    } else {
        curve.scalar_multiply(&curve.g, &u1)?
    };
    let u2q = curve.scalar_multiply(q, &u2)?;

    match curve.point_add(&u1g, &u2q)? {
        Point::Identity => Ok(false),
        Point::Affine { x, .. } => Ok(modulo(&x, n) == *r),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::secp224k1;
    use num_bigint::BigInt;

    fn test_scalar(hex_digits: &str) -> BigInt {
        BigInt::parse_bytes(hex_digits.as_bytes(), 16).unwrap()
    }

    #[test]
    fn sign_verify_round_trip() {
        let curve = secp224k1();
        let d = test_scalar("6b2cd71c34fd7b2b2e24c8d3ec44ecb21e98e46a8274b06d34021e15");
        let q = curve.scalar_multiply(&curve.g, &d).unwrap();

        let e = test_scalar("1ec9dbae981b0ee17e00a3ec63d4a3f9e1c06dbd7ab70a9b2cbf6b8a");
        let k = test_scalar("00d2e4a3f9b1c06dbd7ab70a9b2cbf6b8a1ec9dbae981b0ee17e00a3");

        let sig = sign(curve, &e, &k, &d).unwrap();
        assert!(verify(curve, &e, &sig, &q).unwrap());

        // any perturbation of the digest value must fail
        let tampered = &e + 1;
        assert!(!verify(curve, &tampered, &sig, &q).unwrap());
    }

    #[test]
    fn round_trip_for_sampled_scalars() {
        let curve = secp224k1();
        let e = test_scalar("0deadbeef00aa5512cf00d1e");
        // fixed sample of private scalars spread over the scalar range
        for d_hex in [
            "03",
            "ffeeddccbbaa99887766554433221100ffeeddccbbaa998877665544",
            "010000000000000000000000000001dce8d2ec6184caf0a971769fb1f6", // n - 1
        ] {
            let d = test_scalar(d_hex);
            let q = curve.scalar_multiply(&curve.g, &d).unwrap();
            let k = test_scalar("5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a5a");
            let sig = sign(curve, &e, &k, &d).unwrap();
            assert!(verify(curve, &e, &sig, &q).unwrap(), "d = {d_hex}");
        }
    }

    #[test]
    fn malformed_components_fail_fast() {
        let curve = secp224k1();
        let d = test_scalar("0123456789abcdef0123456789abcdef0123456789abcdef01234567");
        let q = curve.scalar_multiply(&curve.g, &d).unwrap();
        let e = test_scalar("aa");

        let zero_r = Signature { r: BigInt::zero(), s: BigInt::from(7) };
        assert!(!verify(curve, &e, &zero_r, &q).unwrap());

        let zero_s = Signature { r: BigInt::from(7), s: BigInt::zero() };
        assert!(!verify(curve, &e, &zero_s, &q).unwrap());

        let big_r = Signature { r: curve.n.clone(), s: BigInt::from(7) };
        assert!(!verify(curve, &e, &big_r, &q).unwrap());

        let big_s = Signature { r: BigInt::from(7), s: curve.n.clone() };
        assert!(!verify(curve, &e, &big_s, &q).unwrap());
    }

    #[test]
    fn sec1_round_trip_and_rejections() {
        let curve = secp224k1();
        let d = test_scalar("0777");
        let q = curve.scalar_multiply(&curve.g, &d).unwrap();
        let (x, y) = match &q {
            Point::Affine { x, y } => (x.clone(), y.clone()),
            Point::Identity => unreachable!(),
        };

        let mut encoded = vec![0x04];
        let (_, x_bytes) = x.to_bytes_be();
        let (_, y_bytes) = y.to_bytes_be();
        let field_len = curve.field_len();
        encoded.extend(std::iter::repeat(0).take(field_len - x_bytes.len()));
        encoded.extend_from_slice(&x_bytes);
        encoded.extend(std::iter::repeat(0).take(field_len - y_bytes.len()));
        encoded.extend_from_slice(&y_bytes);

        assert_eq!(decode_sec1(curve, &encoded).unwrap(), q);

        // compressed tag
        let mut compressed = encoded.clone();
        compressed[0] = 0x02;
        compressed.truncate(1 + field_len);
        assert!(matches!(
            decode_sec1(curve, &compressed),
            Err(CurveError::InvalidEncoding(_))
        ));

        // wrong length
        assert!(matches!(
            decode_sec1(curve, &encoded[..encoded.len() - 1]),
            Err(CurveError::InvalidEncoding(_))
        ));

        // off-curve point
        let mut off_curve = encoded.clone();
        let last = off_curve.len() - 1;
        off_curve[last] ^= 0x01;
        assert_eq!(decode_sec1(curve, &off_curve), Err(CurveError::PointNotOnCurve));
    }

    #[test]
    fn signature_from_be_bytes() {
        let sig = Signature::from_be_bytes(&[0x01, 0x02], &[0xff]);
        assert_eq!(sig.r, BigInt::from(0x0102));
        assert_eq!(sig.s, BigInt::from(0xff));
    }
}
