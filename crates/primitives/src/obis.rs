//! OBIS quantity codes.
//!
//! An OBIS code names a metered quantity as six octets `A-B:C.D.E*F`
//! (e.g. `1-0:1.8.0*255`, total imported active energy). Vendors carry it
//! either as twelve hex digits or in the dotted notation; canonical
//! buffers embed the six raw octets.

use core::fmt;
use core::str::FromStr;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Six-octet OBIS quantity code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObisCode([u8; 6]);

/// Error parsing an OBIS code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObisError {
    /// Input was neither 12 hex digits nor dotted notation.
    Syntax(String),
    /// A dotted-notation group was not a decimal octet.
    Octet(String),
}

impl fmt::Display for ObisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Syntax(s) => write!(f, "malformed OBIS code: {s:?}"),
            Self::Octet(s) => write!(f, "OBIS group out of range: {s:?}"),
        }
    }
}

impl core::error::Error for ObisError {}

impl ObisCode {
    /// Code from its six raw octets `[A, B, C, D, E, F]`.
    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// The six raw octets, in `A..F` order.
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Twelve lowercase hex digits, the form embedded in canonical buffers.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn parse_dotted(s: &str) -> Result<Self, ObisError> {
        // A-B:C.D.E*F with the *F group optional (defaults to 255)
        let syntax = || ObisError::Syntax(s.to_string());
        let (a, rest) = s.split_once('-').ok_or_else(syntax)?;
        let (b, rest) = rest.split_once(':').ok_or_else(syntax)?;
        let (c, rest) = rest.split_once('.').ok_or_else(syntax)?;
        let (d, rest) = rest.split_once('.').ok_or_else(syntax)?;
        let (e, f_group) = match rest.split_once('*') {
            Some((e, f_group)) => (e, Some(f_group)),
            None => (rest, None),
        };

        let octet = |group: &str| -> Result<u8, ObisError> {
            group
                .parse::<u8>()
                .map_err(|_| ObisError::Octet(group.to_string()))
        };

        Ok(Self([
            octet(a)?,
            octet(b)?,
            octet(c)?,
            octet(d)?,
            octet(e)?,
            match f_group {
                Some(f_group) => octet(f_group)?,
                None => 255,
            },
        ]))
    }
}

impl FromStr for ObisCode {
    type Err = ObisError;

    /// Accepts twelve hex digits (`0100010800ff`) or dotted notation
    /// (`1-0:1.8.0*255`, `1-0:1.8.0`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == 12 && s.chars().all(|c| c.is_ascii_hexdigit()) {
            let mut bytes = [0u8; 6];
            hex::decode_to_slice(s, &mut bytes)
                .map_err(|_| ObisError::Syntax(s.to_string()))?;
            return Ok(Self(bytes));
        }
        Self::parse_dotted(s)
    }
}

impl fmt::Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, f_group] = self.0;
        write!(f, "{a}-{b}:{c}.{d}.{e}*{f_group}")
    }
}

impl Serialize for ObisCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObisCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_and_dotted_forms() {
        let energy: ObisCode = "0100010800ff".parse().unwrap();
        assert_eq!(energy.as_bytes(), &[0x01, 0x00, 0x01, 0x08, 0x00, 0xff]);
        assert_eq!(energy.to_string(), "1-0:1.8.0*255");

        let dotted: ObisCode = "1-0:1.8.0*255".parse().unwrap();
        assert_eq!(dotted, energy);

        let defaulted: ObisCode = "1-0:1.8.0".parse().unwrap();
        assert_eq!(defaulted, energy);
    }

    #[test]
    fn hex_round_trip() {
        let code = ObisCode::from_bytes([1, 0, 2, 8, 0, 255]);
        assert_eq!(code.to_hex(), "0100020800ff");
        assert_eq!("0100020800ff".parse::<ObisCode>().unwrap(), code);
    }

    #[test]
    fn rejects_malformed_codes() {
        assert!("1-0:1.8".parse::<ObisCode>().is_err());
        assert!("1-0:1.8.256".parse::<ObisCode>().is_err());
        assert!("0100010800f".parse::<ObisCode>().is_err());
        assert!("zz00010800ff".parse::<ObisCode>().is_err());
    }
}
