//! Curve parameters and affine point operations.

use crate::arith::{mod_inverse, modulo};
use core::fmt;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use once_cell::sync::Lazy;

/// Error from curve or signature arithmetic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CurveError {
    /// Scalar was zero or not below the curve order.
    ScalarOutOfRange,
    /// A modular inverse did not exist. Unreachable over a prime field
    /// with the guards in place; surfacing it is a fatal algorithm error.
    NonInvertible,
    /// Encoded point failed the curve equation or range checks.
    PointNotOnCurve,
    /// Key or signature bytes were not a supported encoding.
    InvalidEncoding(String),
    /// The chosen nonce produced a zero signature component.
    UnsuitableNonce,
}

impl fmt::Display for CurveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ScalarOutOfRange => f.write_str("scalar is zero or not below the curve order"),
            Self::NonInvertible => f.write_str("modular inverse does not exist"),
            Self::PointNotOnCurve => f.write_str("point is not on the curve"),
            Self::InvalidEncoding(msg) => write!(f, "invalid point encoding: {msg}"),
            Self::UnsuitableNonce => f.write_str("nonce produced a zero signature component"),
        }
    }
}

impl core::error::Error for CurveError {}

/// Affine curve point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Point {
    /// The point at infinity (group identity).
    Identity,
    /// Finite point with coordinates in `[0, p)`.
    Affine {
        /// x coordinate.
        x: BigInt,
        /// y coordinate.
        y: BigInt,
    },
}

impl Point {
    /// Finite point from coordinates.
    pub fn affine(x: BigInt, y: BigInt) -> Self {
        Self::Affine { x, y }
    }

    /// Whether this is the point at infinity.
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }
}

/// Short-Weierstrass curve `y^2 = x^3 + a*x + b` over the prime field `p`,
/// with generator `g` of prime order `n`.
#[derive(Clone, Debug)]
pub struct Curve {
    /// Canonical curve name.
    pub name: &'static str,
    /// Field prime.
    pub p: BigInt,
    /// Equation coefficient `a`.
    pub a: BigInt,
    /// Equation coefficient `b`.
    pub b: BigInt,
    /// Group generator.
    pub g: Point,
    /// Group order.
    pub n: BigInt,
}

fn from_hex(hex_digits: &str) -> BigInt {
    BigInt::parse_bytes(hex_digits.as_bytes(), 16).expect("valid curve constant")
}

/// SEC2 secp224k1: Koblitz curve, `a = 0`, `b = 5`, 224-bit field prime,
/// 225-bit group order.
pub fn secp224k1() -> &'static Curve {
    static SECP224K1: Lazy<Curve> = Lazy::new(|| Curve {
        name: "secp224k1",
        p: from_hex("fffffffffffffffffffffffffffffffffffffffffffffffeffffe56d"),
        a: BigInt::zero(),
        b: BigInt::from(5),
        g: Point::affine(
            from_hex("a1455b334df099df30fc28a169a467e9e47075a90f7e650eb6b7a45c"),
            from_hex("7e089fed7fba344282cafbd6f7e319f7c0b0bd59e2ca4bdb556d61a5"),
        ),
        n: from_hex("010000000000000000000000000001dce8d2ec6184caf0a971769fb1f7"),
    });
    &SECP224K1
}

impl Curve {
    /// Curve from hex-encoded parameters. Intended for additional curve
    /// definitions in tests; production code uses the named presets.
    pub fn from_hex_params(
        name: &'static str,
        p: &str,
        a: &str,
        b: &str,
        gx: &str,
        gy: &str,
        n: &str,
    ) -> Self {
        Self {
            name,
            p: from_hex(p),
            a: from_hex(a),
            b: from_hex(b),
            g: Point::affine(from_hex(gx), from_hex(gy)),
            n: from_hex(n),
        }
    }

    /// Width of one field element in bytes.
    pub fn field_len(&self) -> usize {
        ((self.p.bits() as usize) + 7) / 8
    }

    /// Whether `point` satisfies the curve equation (the identity counts
    /// as on-curve).
    pub fn contains(&self, point: &Point) -> bool {
        match point {
            Point::Identity => true,
            Point::Affine { x, y } => {
                if x.is_negative() || y.is_negative() || x >= &self.p || y >= &self.p {
                    return false;
                }
                let lhs = modulo(&(y * y), &self.p);
                let rhs = modulo(&(x * x * x + &self.a * x + &self.b), &self.p);
                lhs == rhs
            }
        }
    }

    /// Point addition. Doubling is delegated whenever both operands are
    /// the same point.
    pub fn point_add(&self, lhs: &Point, rhs: &Point) -> Result<Point, CurveError> {
        let (x1, y1, x2, y2) = match (lhs, rhs) {
            (Point::Identity, _) => return Ok(rhs.clone()),
            (_, Point::Identity) => return Ok(lhs.clone()),
            (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) => (x1, y1, x2, y2),
        };

        if x1 == x2 {
            return if y1 == y2 {
                self.point_double(lhs)
            } else {
                // vertical chord: y2 == -y1 (mod p)
                Ok(Point::Identity)
            };
        }

        let slope = modulo(
            &((y2 - y1) * mod_inverse(&(x2 - x1), &self.p).ok_or(CurveError::NonInvertible)?),
            &self.p,
        );
        let x3 = modulo(&(&slope * &slope - x1 - x2), &self.p);
        let y3 = modulo(&(&slope * (x1 - &x3) - y1), &self.p);
        Ok(Point::affine(x3, y3))
    }

    /// Point doubling.
    pub fn point_double(&self, point: &Point) -> Result<Point, CurveError> {
        let (x, y) = match point {
            Point::Identity => return Ok(Point::Identity),
            Point::Affine { x, y } => (x, y),
        };
        if y.is_zero() {
            return Ok(Point::Identity);
        }

        let slope = modulo(
            &((BigInt::from(3) * x * x + &self.a)
                * mod_inverse(&(BigInt::from(2) * y), &self.p).ok_or(CurveError::NonInvertible)?),
            &self.p,
        );
        let x3 = modulo(&(&slope * &slope - x - x), &self.p);
        let y3 = modulo(&(&slope * (x - &x3) - y), &self.p);
        Ok(Point::affine(x3, y3))
    }

    /// Scalar multiplication by double-and-add over the binary expansion
    /// of `k`, most significant bit first.
    ///
    /// `k` must lie in `[1, n)`.
    pub fn scalar_multiply(&self, point: &Point, k: &BigInt) -> Result<Point, CurveError> {
        if k.is_zero() || k.is_negative() || k >= &self.n {
            return Err(CurveError::ScalarOutOfRange);
        }

        let bits = k.magnitude();
        let mut acc = Point::Identity;
        for i in (0..bits.bits()).rev() {
            acc = self.point_double(&acc)?;
            if bits.bit(i) {
                acc = self.point_add(&acc, point)?;
            }
        }
        Ok(acc)
    }

    /// Additive inverse of a point.
    pub fn negate(&self, point: &Point) -> Point {
        match point {
            Point::Identity => Point::Identity,
            Point::Affine { x, y } => Point::affine(x.clone(), modulo(&(-y), &self.p)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    #[test]
    fn generator_is_on_curve() {
        let curve = secp224k1();
        assert!(curve.contains(&curve.g));
        assert_eq!(curve.field_len(), 28);
    }

    #[test]
    fn identity_is_neutral() {
        let curve = secp224k1();
        assert_eq!(curve.point_add(&Point::Identity, &curve.g).unwrap(), curve.g);
        assert_eq!(curve.point_add(&curve.g, &Point::Identity).unwrap(), curve.g);
        assert_eq!(curve.point_double(&Point::Identity).unwrap(), Point::Identity);
    }

    #[test]
    fn vertical_chord_yields_identity() {
        let curve = secp224k1();
        let neg_g = curve.negate(&curve.g);
        assert!(curve.contains(&neg_g));
        assert_eq!(curve.point_add(&curve.g, &neg_g).unwrap(), Point::Identity);
    }

    #[test]
    fn doubling_matches_addition_of_equal_points() {
        let curve = secp224k1();
        let doubled = curve.point_double(&curve.g).unwrap();
        assert!(curve.contains(&doubled));
        assert_eq!(curve.point_add(&curve.g, &curve.g).unwrap(), doubled);
        assert_eq!(
            curve.scalar_multiply(&curve.g, &BigInt::from(2)).unwrap(),
            doubled
        );
    }

    #[test]
    fn small_multiples_are_consistent() {
        let curve = secp224k1();
        let two_g = curve.point_double(&curve.g).unwrap();
        let three_g = curve.point_add(&two_g, &curve.g).unwrap();
        let five_g = curve
            .point_add(&three_g, &two_g)
            .unwrap();
        assert_eq!(curve.scalar_multiply(&curve.g, &BigInt::from(3)).unwrap(), three_g);
        assert_eq!(curve.scalar_multiply(&curve.g, &BigInt::from(5)).unwrap(), five_g);
    }

    #[test]
    fn order_minus_one_negates_the_generator() {
        let curve = secp224k1();
        let k = &curve.n - BigInt::one();
        let result = curve.scalar_multiply(&curve.g, &k).unwrap();
        assert_eq!(result, curve.negate(&curve.g));
    }

    #[test]
    fn out_of_range_scalars_are_rejected() {
        let curve = secp224k1();
        assert_eq!(
            curve.scalar_multiply(&curve.g, &BigInt::zero()),
            Err(CurveError::ScalarOutOfRange)
        );
        assert_eq!(
            curve.scalar_multiply(&curve.g, &curve.n.clone()),
            Err(CurveError::ScalarOutOfRange)
        );
        assert_eq!(
            curve.scalar_multiply(&curve.g, &BigInt::from(-2)),
            Err(CurveError::ScalarOutOfRange)
        );
    }
}
