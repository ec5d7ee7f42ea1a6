//! EMH energy-meter format (EDL-style records).
//!
//! Each value is a 96-byte big-endian dataset signed individually with
//! secp224k1 — the curve the mainstream crates do not ship, handled by the
//! in-tree arithmetic. The signed integer is the SHA-256 digest
//! right-shifted by 31 bits, exactly as the deployed meters compute it.
//! Signatures are `(r, s)` hex pairs of 28-byte scalars; public keys are
//! 57-byte uncompressed SEC1 points.

use super::{
    check_min_values, check_monotonic_timestamps, verify_against_key, FormatStrategy, Outcome,
    SessionDefect, ValueContext,
};
use crate::digest::{self, CurveId};
use crate::encoder::{CanonicalBuffer, Endianness::Big, FieldDef, FieldKind, FieldValue};
use crate::EngineError;
use primitives::{ChargingSession, FieldHex, FormatId, Measurement, MeasurementValue};

const DATASET_LEN: usize = 96;

const METER_ID: FieldDef = FieldDef::new("meter-id", 0, 14, FieldKind::Ascii);
const OBIS: FieldDef = FieldDef::new("obis", 14, 6, FieldKind::Hex);
const UNIT: FieldDef = FieldDef::new("unit", 20, 1, FieldKind::U8);
const SCALE: FieldDef = FieldDef::new("scale", 21, 1, FieldKind::I8);
const VALUE: FieldDef = FieldDef::new("value", 22, 8, FieldKind::Decimal64(Big));
const TIMESTAMP: FieldDef = FieldDef::new("timestamp", 30, 4, FieldKind::Timestamp32(Big));
const METER_STATUS: FieldDef = FieldDef::new("meter-status", 34, 4, FieldKind::U32(Big));
const SEQUENCE: FieldDef = FieldDef::new("sequence", 38, 4, FieldKind::U32(Big));
const PAGING: FieldDef = FieldDef::new("paging", 42, 4, FieldKind::U32(Big));
const SESSION_ID: FieldDef = FieldDef::new("session-id", 46, 30, FieldKind::Ascii);
const RESERVED: FieldDef = FieldDef::new("reserved", 76, 20, FieldKind::Hex);

/// The EMH format strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct Emh;

impl Emh {
    /// Rebuild the signed 96-byte dataset for one value.
    pub fn canonical_buffer(
        session: &ChargingSession,
        measurement: &Measurement,
        value: &MeasurementValue,
    ) -> Result<(CanonicalBuffer, Vec<FieldHex>), SessionDefect> {
        let mut buffer = CanonicalBuffer::new(DATASET_LEN);
        let mut fields = Vec::with_capacity(11);
        let mut write = |def: &FieldDef, val: FieldValue<'_>| -> Result<(), SessionDefect> {
            fields.push(buffer.write(def, val)?);
            Ok(())
        };

        write(&METER_ID, FieldValue::Ascii(&measurement.meter_id))?;
        write(&OBIS, FieldValue::Hex(&measurement.obis.to_hex()))?;
        write(&UNIT, FieldValue::Unsigned(measurement.unit.into()))?;
        write(&SCALE, FieldValue::Signed(measurement.scale.into()))?;
        write(&VALUE, FieldValue::Decimal { value: &value.value, scale: measurement.scale })?;
        write(
            &TIMESTAMP,
            FieldValue::Timestamp { timestamp: value.timestamp, offset_minutes: 0 },
        )?;
        write(&METER_STATUS, FieldValue::Unsigned(value.meter_status.into()))?;
        write(&SEQUENCE, FieldValue::Unsigned(value.sequence.into()))?;
        write(&PAGING, FieldValue::Unsigned(value.paging.into()))?;
        write(&SESSION_ID, FieldValue::Ascii(&session.session_id))?;
        write(&RESERVED, FieldValue::Hex(&"00".repeat(20)))?;

        Ok((buffer, fields))
    }
}

impl FormatStrategy for Emh {
    fn id(&self) -> FormatId {
        FormatId::Emh
    }

    fn curve(&self) -> CurveId {
        CurveId::Secp224k1
    }

    fn check_session(&self, session: &ChargingSession) -> Result<(), SessionDefect> {
        // EMH sessions are single-meter: every measurement must come from
        // the same device
        let mut meter_id: Option<&str> = None;
        for measurement in &session.measurements {
            match meter_id {
                None => meter_id = Some(&measurement.meter_id),
                Some(expected) if expected != measurement.meter_id => {
                    return Err(SessionDefect::Inconsistent {
                        field: "meter-id",
                        expected: expected.to_string(),
                        actual: measurement.meter_id.clone(),
                    })
                }
                Some(_) => {}
            }
            check_min_values(measurement)?;
            check_monotonic_timestamps(measurement)?;
            for value in &measurement.values {
                Self::canonical_buffer(session, measurement, value)?;
            }
        }
        Ok(())
    }

    fn verify_value(&self, ctx: &ValueContext<'_>) -> Result<Outcome, EngineError> {
        let (buffer, fields) =
            match Self::canonical_buffer(ctx.session, ctx.measurement, ctx.value) {
                Ok(built) => built,
                Err(defect) => {
                    return Ok(Outcome::with_error(
                        defect.status(),
                        Default::default(),
                        defect.to_string(),
                    ))
                }
            };
        let message_digest = digest::digest(self.curve(), buffer.as_bytes());
        verify_against_key(
            self.curve(),
            buffer.to_hex(),
            fields,
            &message_digest,
            ctx.value.signature.as_ref(),
            ctx.key,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn fixture() -> (ChargingSession, Measurement, MeasurementValue) {
        let value = MeasurementValue {
            timestamp: datetime!(2023-04-05 10:00:00 UTC),
            value: "120.5".parse().unwrap(),
            meter_status: 0x0200,
            adapter_status: 0,
            sequence: 12,
            paging: 1,
            signature: None,
            extra: Default::default(),
        };
        let measurement = Measurement {
            meter_id: "0901454d480001".into(), // 14 ASCII chars
            obis: "0100010800ff".parse().unwrap(),
            unit: 30,
            scale: -1,
            algorithm: "ECC secp224k1".into(),
            values: vec![value.clone()],
        };
        let session = ChargingSession {
            session_id: "S-2023-04-05-0001".into(),
            authorization_id: String::new(),
            evse_id: String::new(),
            format_context: "EMH".into(),
            measurements: vec![measurement.clone()],
            signature: None,
        };
        (session, measurement, value)
    }

    #[test]
    fn dataset_layout_is_bit_exact() {
        let (session, measurement, value) = fixture();
        let (buffer, _) = Emh::canonical_buffer(&session, &measurement, &value).unwrap();
        let bytes = buffer.as_bytes();
        assert_eq!(bytes.len(), 96);

        assert_eq!(&bytes[0..14], b"0901454d480001");
        assert_eq!(&bytes[14..20], &[0x01, 0x00, 0x01, 0x08, 0x00, 0xff]);
        assert_eq!(bytes[20], 30);
        assert_eq!(bytes[21] as i8, -1);
        assert_eq!(&bytes[22..30], &1205u64.to_be_bytes()); // raw counter, BE
        assert_eq!(&bytes[30..34], &1_680_688_800u32.to_be_bytes());
        assert_eq!(&bytes[34..38], &0x0200u32.to_be_bytes());
        assert_eq!(&bytes[38..42], &12u32.to_be_bytes());
        assert_eq!(&bytes[46..63], b"S-2023-04-05-0001");
        assert_eq!(&bytes[76..96], &[0u8; 20]);
    }

    #[test]
    fn mixed_meters_in_one_session_are_rejected() {
        let (mut session, measurement, _) = fixture();
        let mut second = measurement.clone();
        second.meter_id = "0901454d480002".into();
        let first_value = session.measurements[0].values[0].clone();
        session.measurements[0].values.push(first_value);
        second.values = session.measurements[0].values.clone();
        session.measurements.push(second);

        let err = Emh.check_session(&session).unwrap_err();
        assert!(matches!(err, SessionDefect::Inconsistent { field: "meter-id", .. }));
    }
}
