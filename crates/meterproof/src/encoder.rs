//! Canonical buffer construction.
//!
//! Each vendor format signs a byte layout that is part of its signing
//! contract: field offsets, widths, byte order, text-vs-binary encoding
//! and fixed-point scaling all have to match what the meter hashed, bit
//! for bit. A format strategy declares its layout as a table of
//! [`FieldDef`]s and feeds values through [`CanonicalBuffer::write`],
//! which returns the written bytes as hex for the audit trail.
//!
//! Two failure planes are kept apart on purpose:
//!
//! - A table that does not fit its buffer, or a value variant that does
//!   not match the field kind, is a defect in the strategy itself and
//!   panics — field tables are static and these conditions cannot be
//!   reached from input data.
//! - Input-shaped problems (hex that does not decode, text wider than its
//!   field, counters that do not fit) return [`EncodeError`] and are
//!   mapped to format-level statuses by the caller.

use core::fmt;
use primitives::{DecimalError, DecimalValue, FieldHex};
use time::OffsetDateTime;

/// Byte order of a multi-byte field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endianness {
    /// Most significant byte first.
    Big,
    /// Least significant byte first.
    Little,
}

/// Encoding of one field in a canonical layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// Fixed-length binary blob, supplied as hex.
    Hex,
    /// ASCII text, NUL-padded to the field width.
    Ascii,
    /// Unsigned 8-bit integer.
    U8,
    /// Signed 8-bit integer.
    I8,
    /// Unsigned 32-bit integer.
    U32(Endianness),
    /// Signed 32-bit integer.
    I32(Endianness),
    /// Unsigned 64-bit integer.
    U64(Endianness),
    /// Signed 64-bit integer.
    I64(Endianness),
    /// 32-bit UNIX timestamp, with any vendor minute offsets folded in.
    Timestamp32(Endianness),
    /// Decimal reading reinterpreted as its raw unsigned 64-bit counter.
    Decimal64(Endianness),
}

impl FieldKind {
    fn fixed_width(&self) -> Option<usize> {
        match self {
            Self::Hex | Self::Ascii => None,
            Self::U8 | Self::I8 => Some(1),
            Self::U32(_) | Self::I32(_) | Self::Timestamp32(_) => Some(4),
            Self::U64(_) | Self::I64(_) | Self::Decimal64(_) => Some(8),
        }
    }
}

/// One entry of a format's field table.
#[derive(Clone, Copy, Debug)]
pub struct FieldDef {
    /// Field name, used in audit output and diagnostics.
    pub name: &'static str,
    /// Byte offset inside the canonical buffer.
    pub offset: usize,
    /// Width in bytes.
    pub width: usize,
    /// Encoding.
    pub kind: FieldKind,
}

impl FieldDef {
    /// Table entry constructor, for concise layout tables.
    pub const fn new(name: &'static str, offset: usize, width: usize, kind: FieldKind) -> Self {
        Self { name, offset, width, kind }
    }
}

/// A value to encode into a field.
#[derive(Clone, Debug)]
pub enum FieldValue<'a> {
    /// Hex-encoded bytes for a [`FieldKind::Hex`] field.
    Hex(&'a str),
    /// Text for a [`FieldKind::Ascii`] field.
    Ascii(&'a str),
    /// Value for the unsigned integer kinds.
    Unsigned(u64),
    /// Value for the signed integer kinds.
    Signed(i64),
    /// Instant for a [`FieldKind::Timestamp32`] field; `offset_minutes`
    /// is added to the encoded second count (local/season vendor quirk).
    Timestamp {
        /// The UTC instant.
        timestamp: OffsetDateTime,
        /// Additive minute offset folded into the encoding.
        offset_minutes: i32,
    },
    /// Reading for a [`FieldKind::Decimal64`] field, rescaled to `scale`.
    Decimal {
        /// The exact reading.
        value: &'a DecimalValue,
        /// Target decimal scale of the raw counter.
        scale: i32,
    },
}

/// Input-shaped encoding failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodeError {
    /// Hex input did not decode to exactly the field width.
    Hex {
        /// Field name.
        field: &'static str,
        /// What was wrong with the input.
        reason: String,
    },
    /// Text was not ASCII or wider than the field.
    Ascii {
        /// Field name.
        field: &'static str,
        /// What was wrong with the input.
        reason: String,
    },
    /// Numeric value does not fit the field.
    Range {
        /// Field name.
        field: &'static str,
        /// The offending value, for diagnostics.
        value: String,
    },
    /// Decimal could not be rescaled to the field's raw counter.
    Decimal {
        /// Field name.
        field: &'static str,
        /// Underlying rescale failure.
        source: DecimalError,
    },
}

impl EncodeError {
    /// Field the error belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Hex { field, .. }
            | Self::Ascii { field, .. }
            | Self::Range { field, .. }
            | Self::Decimal { field, .. } => field,
        }
    }
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hex { field, reason } => write!(f, "field {field:?}: {reason}"),
            Self::Ascii { field, reason } => write!(f, "field {field:?}: {reason}"),
            Self::Range { field, value } => {
                write!(f, "field {field:?}: value {value} does not fit")
            }
            Self::Decimal { field, source } => write!(f, "field {field:?}: {source}"),
        }
    }
}

impl core::error::Error for EncodeError {}

/// Fixed-size buffer being assembled into a vendor's canonical layout.
#[derive(Clone, Debug)]
pub struct CanonicalBuffer {
    bytes: Vec<u8>,
}

impl CanonicalBuffer {
    /// Zeroed buffer of `len` bytes.
    pub fn new(len: usize) -> Self {
        Self { bytes: vec![0; len] }
    }

    /// Encode `value` into the field described by `def`.
    ///
    /// Returns the written bytes as lowercase hex for audit display.
    ///
    /// # Panics
    ///
    /// Panics when the field does not fit the buffer, when the declared
    /// width contradicts the kind's fixed width, or when the value variant
    /// does not match the kind — all defects in the calling strategy's
    /// static table, not reachable from input data.
    pub fn write(&mut self, def: &FieldDef, value: FieldValue<'_>) -> Result<FieldHex, EncodeError> {
        assert!(
            def.offset + def.width <= self.bytes.len(),
            "field {:?} [{}..{}] exceeds {}-byte buffer",
            def.name,
            def.offset,
            def.offset + def.width,
            self.bytes.len(),
        );
        if let Some(fixed) = def.kind.fixed_width() {
            assert_eq!(
                def.width, fixed,
                "field {:?} declares width {} for a {}-byte kind",
                def.name, def.width, fixed,
            );
        }

        let encoded = match (def.kind, value) {
            (FieldKind::Hex, FieldValue::Hex(text)) => {
                let bytes = hex::decode(text).map_err(|e| EncodeError::Hex {
                    field: def.name,
                    reason: e.to_string(),
                })?;
                if bytes.len() != def.width {
                    return Err(EncodeError::Hex {
                        field: def.name,
                        reason: format!("expected {} bytes, got {}", def.width, bytes.len()),
                    });
                }
                bytes
            }
            (FieldKind::Ascii, FieldValue::Ascii(text)) => {
                if !text.is_ascii() {
                    return Err(EncodeError::Ascii {
                        field: def.name,
                        reason: "text is not ASCII".into(),
                    });
                }
                if text.len() > def.width {
                    return Err(EncodeError::Ascii {
                        field: def.name,
                        reason: format!(
                            "text is {} bytes, field width is {}",
                            text.len(),
                            def.width
                        ),
                    });
                }
                let mut bytes = vec![0u8; def.width];
                bytes[..text.len()].copy_from_slice(text.as_bytes());
                bytes
            }
            (FieldKind::U8, FieldValue::Unsigned(v)) => {
                let byte = u8::try_from(v).map_err(|_| EncodeError::Range {
                    field: def.name,
                    value: v.to_string(),
                })?;
                vec![byte]
            }
            (FieldKind::I8, FieldValue::Signed(v)) => {
                let byte = i8::try_from(v).map_err(|_| EncodeError::Range {
                    field: def.name,
                    value: v.to_string(),
                })?;
                vec![byte as u8]
            }
            (FieldKind::U32(endian), FieldValue::Unsigned(v)) => {
                let v = u32::try_from(v).map_err(|_| EncodeError::Range {
                    field: def.name,
                    value: v.to_string(),
                })?;
                match endian {
                    Endianness::Big => v.to_be_bytes().to_vec(),
                    Endianness::Little => v.to_le_bytes().to_vec(),
                }
            }
            (FieldKind::I32(endian), FieldValue::Signed(v)) => {
                let v = i32::try_from(v).map_err(|_| EncodeError::Range {
                    field: def.name,
                    value: v.to_string(),
                })?;
                match endian {
                    Endianness::Big => v.to_be_bytes().to_vec(),
                    Endianness::Little => v.to_le_bytes().to_vec(),
                }
            }
            (FieldKind::U64(endian), FieldValue::Unsigned(v)) => match endian {
                Endianness::Big => v.to_be_bytes().to_vec(),
                Endianness::Little => v.to_le_bytes().to_vec(),
            },
            (FieldKind::I64(endian), FieldValue::Signed(v)) => match endian {
                Endianness::Big => v.to_be_bytes().to_vec(),
                Endianness::Little => v.to_le_bytes().to_vec(),
            },
            (FieldKind::Timestamp32(endian), FieldValue::Timestamp { timestamp, offset_minutes }) => {
                let seconds = timestamp.unix_timestamp() + i64::from(offset_minutes) * 60;
                let seconds = u32::try_from(seconds).map_err(|_| EncodeError::Range {
                    field: def.name,
                    value: seconds.to_string(),
                })?;
                match endian {
                    Endianness::Big => seconds.to_be_bytes().to_vec(),
                    Endianness::Little => seconds.to_le_bytes().to_vec(),
                }
            }
            (FieldKind::Decimal64(endian), FieldValue::Decimal { value, scale }) => {
                let raw = value.scaled_u64(scale).map_err(|source| EncodeError::Decimal {
                    field: def.name,
                    source,
                })?;
                match endian {
                    Endianness::Big => raw.to_be_bytes().to_vec(),
                    Endianness::Little => raw.to_le_bytes().to_vec(),
                }
            }
            (kind, value) => panic!(
                "field {:?}: value {value:?} does not match kind {kind:?}",
                def.name
            ),
        };

        self.bytes[def.offset..def.offset + def.width].copy_from_slice(&encoded);
        Ok(FieldHex { name: def.name.to_string(), hex: hex::encode(&encoded) })
    }

    /// The assembled bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lowercase hex of the whole buffer, for the audit trail.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}
