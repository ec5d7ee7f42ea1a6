//! Alfen NG9xx metering adapter format.
//!
//! Each value is an 82-byte little-endian dataset signed individually with
//! secp192r1 over SHA-256. Records reach the adapter as base-32 text; the
//! ingestion layer decodes that transport, so this strategy sees the
//! decoded fields and rebuilds the signed dataset. Signatures are 48-byte
//! raw `r ‖ s` pairs; public keys are 25-byte compressed SEC1 points.
//!
//! The dataset layout below is normative; offsets and byte order are part
//! of the adapter's signing contract.

use super::{
    check_consistent_extra, check_min_values, check_monotonic_timestamps, require_extra,
    verify_against_key, FormatStrategy, Outcome, SessionDefect, ValueContext,
};
use crate::digest::{self, CurveId};
use crate::encoder::{CanonicalBuffer, Endianness::Little, FieldDef, FieldKind, FieldValue};
use crate::EngineError;
use primitives::{ChargingSession, FieldHex, FormatId, Measurement, MeasurementValue};

const DATASET_LEN: usize = 82;

const DATASET_VERSION: FieldDef = FieldDef::new("dataset-version", 0, 1, FieldKind::U8);
const ADAPTER_ID: FieldDef = FieldDef::new("adapter-id", 1, 10, FieldKind::Hex);
const ADAPTER_FIRMWARE: FieldDef = FieldDef::new("adapter-firmware", 11, 4, FieldKind::Ascii);
const METER_ID: FieldDef = FieldDef::new("meter-id", 15, 10, FieldKind::Hex);
const METER_STATUS: FieldDef = FieldDef::new("meter-status", 25, 4, FieldKind::U32(Little));
const ADAPTER_STATUS: FieldDef = FieldDef::new("adapter-status", 29, 4, FieldKind::U32(Little));
const SESSION_ID: FieldDef = FieldDef::new("session-id", 33, 4, FieldKind::U32(Little));
const PAGING: FieldDef = FieldDef::new("paging", 37, 4, FieldKind::U32(Little));
const OBIS: FieldDef = FieldDef::new("obis", 41, 6, FieldKind::Hex);
const UNIT: FieldDef = FieldDef::new("unit", 47, 1, FieldKind::U8);
const SCALE: FieldDef = FieldDef::new("scale", 48, 1, FieldKind::I8);
const VALUE: FieldDef = FieldDef::new("value", 49, 8, FieldKind::Decimal64(Little));
const UID: FieldDef = FieldDef::new("uid", 57, 20, FieldKind::Ascii);
const TIMESTAMP: FieldDef = FieldDef::new("timestamp", 77, 4, FieldKind::Timestamp32(Little));
const RESERVED: FieldDef = FieldDef::new("reserved", 81, 1, FieldKind::U8);

/// The Alfen format strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct Alfen;

impl Alfen {
    /// Rebuild the signed 82-byte dataset for one value.
    pub fn canonical_buffer(
        session: &ChargingSession,
        measurement: &Measurement,
        value: &MeasurementValue,
    ) -> Result<(CanonicalBuffer, Vec<FieldHex>), SessionDefect> {
        let adapter_id = require_extra(value, "adapter-id")?;
        let adapter_firmware = require_extra(value, "adapter-firmware")?;
        let session_id: u32 = session.session_id.parse().map_err(|_| {
            SessionDefect::Malformed {
                field: "session-id".into(),
                reason: format!("{:?} is not a 32-bit session number", session.session_id),
            }
        })?;

        let mut buffer = CanonicalBuffer::new(DATASET_LEN);
        let mut fields = Vec::with_capacity(15);
        let mut write = |def: &FieldDef, val: FieldValue<'_>| -> Result<(), SessionDefect> {
            fields.push(buffer.write(def, val)?);
            Ok(())
        };

        write(&DATASET_VERSION, FieldValue::Unsigned(0x01))?;
        write(&ADAPTER_ID, FieldValue::Hex(adapter_id))?;
        write(&ADAPTER_FIRMWARE, FieldValue::Ascii(adapter_firmware))?;
        write(&METER_ID, FieldValue::Hex(&measurement.meter_id))?;
        write(&METER_STATUS, FieldValue::Unsigned(value.meter_status.into()))?;
        write(&ADAPTER_STATUS, FieldValue::Unsigned(value.adapter_status.into()))?;
        write(&SESSION_ID, FieldValue::Unsigned(session_id.into()))?;
        write(&PAGING, FieldValue::Unsigned(value.paging.into()))?;
        write(&OBIS, FieldValue::Hex(&measurement.obis.to_hex()))?;
        write(&UNIT, FieldValue::Unsigned(measurement.unit.into()))?;
        write(&SCALE, FieldValue::Signed(measurement.scale.into()))?;
        write(&VALUE, FieldValue::Decimal { value: &value.value, scale: measurement.scale })?;
        write(&UID, FieldValue::Ascii(&session.authorization_id))?;
        write(
            &TIMESTAMP,
            FieldValue::Timestamp { timestamp: value.timestamp, offset_minutes: 0 },
        )?;
        write(&RESERVED, FieldValue::Unsigned(0))?;

        Ok((buffer, fields))
    }
}

impl FormatStrategy for Alfen {
    fn id(&self) -> FormatId {
        FormatId::Alfen
    }

    fn curve(&self) -> CurveId {
        CurveId::Secp192r1
    }

    fn check_session(&self, session: &ChargingSession) -> Result<(), SessionDefect> {
        for measurement in &session.measurements {
            check_min_values(measurement)?;
            check_monotonic_timestamps(measurement)?;
            check_consistent_extra(measurement, "adapter-id")?;
            check_consistent_extra(measurement, "adapter-firmware")?;
            for value in &measurement.values {
                // the dataset must be reconstructible before cryptography runs
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
