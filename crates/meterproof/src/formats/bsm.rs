//! BSM snapshot format.
//!
//! Each value is a 64-byte big-endian snapshot signed individually with
//! secp384r1 over SHA-384; signatures are 96-byte raw `r ‖ s` pairs. The
//! snapshot type byte encodes the value's position in the session (start,
//! running, end), so the signed bytes differ by position even for equal
//! readings.

use super::{
    check_min_values, check_monotonic_timestamps, verify_against_key, FormatStrategy, Outcome,
    SessionDefect, ValueContext,
};
use crate::digest::{self, CurveId};
use crate::encoder::{CanonicalBuffer, Endianness::Big, FieldDef, FieldKind, FieldValue};
use crate::EngineError;
use primitives::{
    ChargingSession, FieldHex, FormatId, Measurement, MeasurementValue, ValuePosition,
};

const SNAPSHOT_LEN: usize = 64;

const SNAPSHOT_TYPE: FieldDef = FieldDef::new("snapshot-type", 0, 1, FieldKind::U8);
const METER_ID: FieldDef = FieldDef::new("meter-id", 1, 16, FieldKind::Ascii);
const OBIS: FieldDef = FieldDef::new("obis", 17, 6, FieldKind::Hex);
const UNIT: FieldDef = FieldDef::new("unit", 23, 1, FieldKind::U8);
const SCALE: FieldDef = FieldDef::new("scale", 24, 1, FieldKind::I8);
const VALUE: FieldDef = FieldDef::new("value", 25, 8, FieldKind::Decimal64(Big));
const TIMESTAMP: FieldDef = FieldDef::new("timestamp", 33, 4, FieldKind::Timestamp32(Big));
const METER_STATUS: FieldDef = FieldDef::new("meter-status", 37, 4, FieldKind::U32(Big));
const SEQUENCE: FieldDef = FieldDef::new("sequence", 41, 4, FieldKind::U32(Big));
const EVSE_ID: FieldDef = FieldDef::new("evse-id", 45, 19, FieldKind::Ascii);

fn snapshot_type(position: ValuePosition) -> u8 {
    match position {
        ValuePosition::Start => 0x01,
        ValuePosition::Intermediate => 0x02,
        ValuePosition::Stop => 0x03,
    }
}

/// The BSM format strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct Bsm;

impl Bsm {
    /// Rebuild the signed 64-byte snapshot for one value.
    pub fn canonical_buffer(
        session: &ChargingSession,
        measurement: &Measurement,
        value: &MeasurementValue,
        position: ValuePosition,
    ) -> Result<(CanonicalBuffer, Vec<FieldHex>), SessionDefect> {
        let mut buffer = CanonicalBuffer::new(SNAPSHOT_LEN);
        let mut fields = Vec::with_capacity(10);
        let mut write = |def: &FieldDef, val: FieldValue<'_>| -> Result<(), SessionDefect> {
            fields.push(buffer.write(def, val)?);
            Ok(())
        };

        write(&SNAPSHOT_TYPE, FieldValue::Unsigned(snapshot_type(position).into()))?;
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
        write(&EVSE_ID, FieldValue::Ascii(&session.evse_id))?;

        Ok((buffer, fields))
    }
}

impl FormatStrategy for Bsm {
    fn id(&self) -> FormatId {
        FormatId::Bsm
    }

    fn curve(&self) -> CurveId {
        CurveId::Secp384r1
    }

    fn check_session(&self, session: &ChargingSession) -> Result<(), SessionDefect> {
        for measurement in &session.measurements {
            check_min_values(measurement)?;
            check_monotonic_timestamps(measurement)?;
            let total = measurement.values.len();
            for (index, value) in measurement.values.iter().enumerate() {
                Self::canonical_buffer(
                    session,
                    measurement,
                    value,
                    ValuePosition::of(index, total),
                )?;
            }
        }
        Ok(())
    }

    fn verify_value(&self, ctx: &ValueContext<'_>) -> Result<Outcome, EngineError> {
        let position = ValuePosition::of(ctx.index, ctx.total);
        let (buffer, fields) =
            match Self::canonical_buffer(ctx.session, ctx.measurement, ctx.value, position) {
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
            value: "42".parse().unwrap(),
            meter_status: 1,
            adapter_status: 0,
            sequence: 9,
            paging: 0,
            signature: None,
            extra: Default::default(),
        };
        let measurement = Measurement {
            meter_id: "BSM-WS36A-0001".into(),
            obis: "0100010800ff".parse().unwrap(),
            unit: 30,
            scale: 0,
            algorithm: "ECC secp384r1".into(),
            values: vec![value.clone()],
        };
        let session = ChargingSession {
            session_id: "B-1".into(),
            authorization_id: String::new(),
            evse_id: "DE*BSM*E1".into(),
            format_context: "BSM".into(),
            measurements: vec![measurement.clone()],
            signature: None,
        };
        (session, measurement, value)
    }

    #[test]
    fn snapshot_type_tracks_position() {
        let (session, measurement, value) = fixture();
        for (position, expected) in [
            (ValuePosition::Start, 0x01),
            (ValuePosition::Intermediate, 0x02),
            (ValuePosition::Stop, 0x03),
        ] {
            let (buffer, _) =
                Bsm::canonical_buffer(&session, &measurement, &value, position).unwrap();
            assert_eq!(buffer.as_bytes()[0], expected);
        }
    }

    #[test]
    fn snapshot_layout_is_bit_exact() {
        let (session, measurement, value) = fixture();
        let (buffer, _) =
            Bsm::canonical_buffer(&session, &measurement, &value, ValuePosition::Start).unwrap();
        let bytes = buffer.as_bytes();
        assert_eq!(bytes.len(), 64);
        assert_eq!(&bytes[1..15], b"BSM-WS36A-0001");
        assert_eq!(&bytes[25..33], &42u64.to_be_bytes());
        assert_eq!(&bytes[33..37], &1_680_688_800u32.to_be_bytes());
        assert_eq!(&bytes[41..45], &9u32.to_be_bytes());
        assert_eq!(&bytes[45..54], b"DE*BSM*E1");
    }
}
