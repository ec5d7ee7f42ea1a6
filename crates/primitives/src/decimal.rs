//! Arbitrary-precision fixed-point decimals.
//!
//! Meter readings arrive with vendor-native units and decimal scales
//! (`1.234` kWh at scale -3 is the raw counter `1234`). Reconstructing a
//! canonical buffer requires the exact raw counter; a single lost digit
//! silently produces a wrong signature check, so values are kept as an
//! exact mantissa/exponent pair and every rescale is checked.

use core::fmt;
use core::str::FromStr;
use num_bigint::BigInt;
use num_traits::{Signed, ToPrimitive, Zero};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Exact decimal number: `mantissa * 10^exponent`.
///
/// Stored normalized (no trailing zero digits in the mantissa), so equal
/// values compare equal regardless of the textual form they arrived in.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DecimalValue {
    mantissa: BigInt,
    exponent: i32,
}

/// Error converting or rescaling a decimal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecimalError {
    /// Input was not a plain decimal literal.
    Syntax(String),
    /// Rescaling would drop non-zero fractional digits.
    Inexact {
        /// Requested target scale.
        scale: i32,
    },
    /// The rescaled integer does not fit the target machine type.
    Overflow {
        /// Requested target scale.
        scale: i32,
    },
    /// A negative value was rescaled into an unsigned field.
    Negative,
}

impl fmt::Display for DecimalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(s) => write!(f, "malformed decimal literal: {s:?}"),
            Self::Inexact { scale } => {
                write!(f, "value has more precision than scale {scale} can carry")
            }
            Self::Overflow { scale } => write!(f, "value at scale {scale} overflows the field"),
            Self::Negative => f.write_str("negative value in unsigned field"),
        }
    }
}

impl core::error::Error for DecimalError {}

impl DecimalValue {
    /// Value from an exact mantissa/exponent pair.
    pub fn new(mantissa: BigInt, exponent: i32) -> Self {
        let mut v = Self { mantissa, exponent };
        v.normalize();
        v
    }

    /// Zero.
    pub fn zero() -> Self {
        Self { mantissa: BigInt::zero(), exponent: 0 }
    }

    fn normalize(&mut self) {
        if self.mantissa.is_zero() {
            self.exponent = 0;
            return;
        }
        let ten = BigInt::from(10);
        while (&self.mantissa % &ten).is_zero() {
            self.mantissa /= &ten;
            self.exponent += 1;
        }
    }

    /// The raw integer `n` such that `n * 10^scale` equals this value.
    ///
    /// Fails with [`DecimalError::Inexact`] when the value carries more
    /// fractional digits than the scale can represent; digits are never
    /// silently dropped.
    pub fn scaled_integer(&self, scale: i32) -> Result<BigInt, DecimalError> {
        let shift = self.exponent - scale;
        if shift >= 0 {
            Ok(&self.mantissa * BigInt::from(10).pow(shift as u32))
        } else {
            let divisor = BigInt::from(10).pow((-shift) as u32);
            let (q, r) = (&self.mantissa / &divisor, &self.mantissa % &divisor);
            if r.is_zero() {
                Ok(q)
            } else {
                Err(DecimalError::Inexact { scale })
            }
        }
    }

    /// Raw counter at `scale`, as the unsigned 64-bit integer vendors embed
    /// in binary layouts.
    pub fn scaled_u64(&self, scale: i32) -> Result<u64, DecimalError> {
        let n = self.scaled_integer(scale)?;
        if n.is_negative() {
            return Err(DecimalError::Negative);
        }
        n.to_u64().ok_or(DecimalError::Overflow { scale })
    }

    /// Raw counter at `scale` as a signed 64-bit integer.
    pub fn scaled_i64(&self, scale: i32) -> Result<i64, DecimalError> {
        self.scaled_integer(scale)?
            .to_i64()
            .ok_or(DecimalError::Overflow { scale })
    }

    /// Decimal digits of the raw counter at `scale`, for text-record
    /// formats that sign the digit string itself.
    pub fn scaled_digits(&self, scale: i32) -> Result<String, DecimalError> {
        Ok(self.scaled_integer(scale)?.to_string())
    }

    /// Whether the value is negative.
    pub fn is_negative(&self) -> bool {
        self.mantissa.is_negative()
    }
}

impl From<i64> for DecimalValue {
    fn from(v: i64) -> Self {
        Self::new(BigInt::from(v), 0)
    }
}

impl From<u64> for DecimalValue {
    fn from(v: u64) -> Self {
        Self::new(BigInt::from(v), 0)
    }
}

impl FromStr for DecimalValue {
    type Err = DecimalError;

    /// Parses plain decimal literals: optional sign, digits, optional
    /// fractional part (`-12.034`). Exponent notation is not a vendor
    /// transport form and is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let syntax = || DecimalError::Syntax(s.to_string());

        let (sign, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f_part)) => (i, f_part),
            None => (digits, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(syntax());
        }
        if !int_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(syntax());
        }

        let mut mantissa = BigInt::zero();
        for c in int_part.chars().chain(frac_part.chars()) {
            mantissa = mantissa * 10 + (c as u8 - b'0');
        }
        if sign < 0 {
            mantissa = -mantissa;
        }
        Ok(Self::new(mantissa, -(frac_part.len() as i32)))
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exponent >= 0 {
            let shifted = &self.mantissa * BigInt::from(10).pow(self.exponent as u32);
            return write!(f, "{shifted}");
        }
        let digits = self.mantissa.magnitude().to_string();
        let frac_len = (-self.exponent) as usize;
        let sign = if self.mantissa.is_negative() { "-" } else { "" };
        if digits.len() > frac_len {
            let (int_part, frac_part) = digits.split_at(digits.len() - frac_len);
            write!(f, "{sign}{int_part}.{frac_part}")
        } else {
            write!(f, "{sign}0.{digits:0>width$}", width = frac_len)
        }
    }
}

impl Serialize for DecimalValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DecimalValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DecimalVisitor;

        impl de::Visitor<'_> for DecimalVisitor {
            type Value = DecimalValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal number or decimal string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(DecimalValue::from(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(DecimalValue::from(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                // shortest round-trip rendering, then exact parse
                format!("{v}").parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(DecimalVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_round_trip() {
        for s in ["0", "1", "-1", "1.234", "-0.037", "120.5", "0.001"] {
            let v: DecimalValue = s.parse().unwrap();
            assert_eq!(v.to_string(), s, "round trip of {s}");
        }
    }

    #[test]
    fn textual_variants_compare_equal() {
        let a: DecimalValue = "1.200".parse().unwrap();
        let b: DecimalValue = "1.2".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rescaling_is_exact() {
        let v: DecimalValue = "1.234".parse().unwrap();
        assert_eq!(v.scaled_u64(-3).unwrap(), 1234);
        assert_eq!(v.scaled_u64(-4).unwrap(), 12340);
        assert_eq!(v.scaled_digits(-3).unwrap(), "1234");
        // dropping the trailing digit is an error, not a truncation
        assert_eq!(v.scaled_u64(-2), Err(DecimalError::Inexact { scale: -2 }));
    }

    #[test]
    fn rescaling_checks_sign_and_range() {
        let neg: DecimalValue = "-1.5".parse().unwrap();
        assert_eq!(neg.scaled_u64(-1), Err(DecimalError::Negative));
        assert_eq!(neg.scaled_i64(-1).unwrap(), -15);

        let big: DecimalValue = "18446744073709551616".parse().unwrap(); // 2^64
        assert_eq!(big.scaled_u64(0), Err(DecimalError::Overflow { scale: 0 }));
    }

    #[test]
    fn rejects_non_decimal_input() {
        assert!("".parse::<DecimalValue>().is_err());
        assert!(".".parse::<DecimalValue>().is_err());
        assert!("1e3".parse::<DecimalValue>().is_err());
        assert!("0x10".parse::<DecimalValue>().is_err());
    }

    #[test]
    fn deserializes_numbers_and_strings() {
        let from_str: DecimalValue = serde_json::from_str("\"1.234\"").unwrap();
        let from_num: DecimalValue = serde_json::from_str("1.234").unwrap();
        let from_int: DecimalValue = serde_json::from_str("1234").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(from_int.scaled_u64(0).unwrap(), 1234);
    }
}
