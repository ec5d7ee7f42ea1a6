//! ChargePoint session-signed format.
//!
//! Individual values carry no signatures. Instead one secp256r1 + SHA-256
//! signature (ASN.1 DER) covers a session-wide buffer: a 68-byte header of
//! session identifiers followed by one 26-byte little-endian block per
//! value, in declared order. Value timestamps are 32-bit UNIX seconds with
//! the station's local and season minute offsets added in — a quirk of the
//! deployed firmware that is part of the signing contract.
//!
//! Values are therefore reported as position-classified but not
//! cryptographically checked (`NoOperation` until classification).

use super::{
    check_min_values, check_monotonic_timestamps, verify_against_key, FormatStrategy, Outcome,
    SessionDefect, ValueContext,
};
use crate::digest::{self, CurveId};
use crate::encoder::{CanonicalBuffer, Endianness::Little, FieldDef, FieldKind, FieldValue};
use crate::EngineError;
use primitives::{
    AuditTrail, ChargingSession, FieldHex, FormatId, MeasurementValue, PublicKeyRecord,
    RawSignature, VerificationStatus,
};

const HEADER_LEN: usize = 68;
const VALUE_BLOCK_LEN: usize = 26;

const EVSE_ID: FieldDef = FieldDef::new("evse-id", 0, 24, FieldKind::Ascii);
const SESSION_ID: FieldDef = FieldDef::new("session-id", 24, 24, FieldKind::Ascii);
const UID: FieldDef = FieldDef::new("uid", 48, 20, FieldKind::Ascii);

fn value_block(index: usize) -> [FieldDef; 5] {
    let base = HEADER_LEN + index * VALUE_BLOCK_LEN;
    [
        FieldDef::new("timestamp", base, 4, FieldKind::Timestamp32(Little)),
        FieldDef::new("meter-status", base + 4, 4, FieldKind::U32(Little)),
        FieldDef::new("value", base + 8, 8, FieldKind::Decimal64(Little)),
        FieldDef::new("obis", base + 16, 6, FieldKind::Hex),
        FieldDef::new("paging", base + 22, 4, FieldKind::U32(Little)),
    ]
}

fn minute_offset(value: &MeasurementValue, field: &'static str) -> Result<i32, SessionDefect> {
    match value.extra(field) {
        None => Ok(0),
        Some(text) => text.parse().map_err(|_| SessionDefect::Malformed {
            field: field.into(),
            reason: format!("{text:?} is not a minute offset"),
        }),
    }
}

/// The ChargePoint format strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChargePoint;

impl ChargePoint {
    /// Rebuild the session-wide signed buffer.
    pub fn canonical_buffer(
        session: &ChargingSession,
    ) -> Result<(CanonicalBuffer, Vec<FieldHex>), SessionDefect> {
        let total: usize = session.measurements.iter().map(|m| m.values.len()).sum();
        let mut buffer = CanonicalBuffer::new(HEADER_LEN + total * VALUE_BLOCK_LEN);
        let mut fields = Vec::with_capacity(3 + total * 5);
        let mut write = |def: &FieldDef, val: FieldValue<'_>| -> Result<(), SessionDefect> {
            fields.push(buffer.write(def, val)?);
            Ok(())
        };

        write(&EVSE_ID, FieldValue::Ascii(&session.evse_id))?;
        write(&SESSION_ID, FieldValue::Ascii(&session.session_id))?;
        write(&UID, FieldValue::Ascii(&session.authorization_id))?;

        let mut index = 0;
        for measurement in &session.measurements {
            for value in &measurement.values {
                let offset_minutes = minute_offset(value, "local-offset-min")?
                    + minute_offset(value, "season-offset-min")?;
                let [ts, status, val, obis, paging] = value_block(index);
                write(
                    &ts,
                    FieldValue::Timestamp { timestamp: value.timestamp, offset_minutes },
                )?;
                write(&status, FieldValue::Unsigned(value.meter_status.into()))?;
                write(
                    &val,
                    FieldValue::Decimal { value: &value.value, scale: measurement.scale },
                )?;
                write(&obis, FieldValue::Hex(&measurement.obis.to_hex()))?;
                write(&paging, FieldValue::Unsigned(value.paging.into()))?;
                index += 1;
            }
        }

        Ok((buffer, fields))
    }
}

impl FormatStrategy for ChargePoint {
    fn id(&self) -> FormatId {
        FormatId::ChargePoint
    }

    fn curve(&self) -> CurveId {
        CurveId::Secp256r1
    }

    fn signs_values(&self) -> bool {
        false
    }

    fn check_session(&self, session: &ChargingSession) -> Result<(), SessionDefect> {
        match &session.signature {
            None => {
                return Err(SessionDefect::Missing { field: "session signature".into() })
            }
            Some(RawSignature::Pair { .. }) => {
                return Err(SessionDefect::Malformed {
                    field: "session signature".into(),
                    reason: "expected one DER-encoded blob, got an (r, s) pair".into(),
                })
            }
            Some(RawSignature::Der { .. }) => {}
        }
        for measurement in &session.measurements {
            check_min_values(measurement)?;
            check_monotonic_timestamps(measurement)?;
        }
        Self::canonical_buffer(session)?;
        Ok(())
    }

    fn verify_value(&self, _ctx: &ValueContext<'_>) -> Result<Outcome, EngineError> {
        // nothing to check per value; classification happens at session level
        Ok(Outcome::new(VerificationStatus::NoOperation, AuditTrail::default()))
    }

    fn verify_session_signature(
        &self,
        session: &ChargingSession,
        key: Option<&PublicKeyRecord>,
    ) -> Option<Result<Outcome, EngineError>> {
        let (buffer, fields) = match Self::canonical_buffer(session) {
            Ok(built) => built,
            Err(defect) => {
                return Some(Ok(Outcome::with_error(
                    defect.status(),
                    Default::default(),
                    defect.to_string(),
                )))
            }
        };
        let message_digest = digest::digest(self.curve(), buffer.as_bytes());
        Some(verify_against_key(
            self.curve(),
            buffer.to_hex(),
            fields,
            &message_digest,
            session.signature.as_ref(),
            key,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitives::Measurement;
    use time::macros::datetime;

    fn fixture() -> ChargingSession {
        let base = MeasurementValue {
            timestamp: datetime!(2023-04-05 10:00:00 UTC),
            value: "1.000".parse().unwrap(),
            meter_status: 0,
            adapter_status: 0,
            sequence: 0,
            paging: 1,
            signature: None,
            extra: [
                ("local-offset-min".to_string(), "60".to_string()),
                ("season-offset-min".to_string(), "60".to_string()),
            ]
            .into_iter()
            .collect(),
        };
        let mut stop = base.clone();
        stop.timestamp = datetime!(2023-04-05 11:00:00 UTC);
        stop.value = "2.500".parse().unwrap();
        stop.paging = 2;

        ChargingSession {
            session_id: "CP-0001".into(),
            authorization_id: "04AABBCC".into(),
            evse_id: "DE*CPX*E7".into(),
            format_context: "CHARGEPOINT".into(),
            measurements: vec![Measurement {
                meter_id: "CP-METER-1".into(),
                obis: "0100010800ff".parse().unwrap(),
                unit: 30,
                scale: -3,
                algorithm: "ECC secp256r1".into(),
                values: vec![base, stop],
            }],
            signature: Some(RawSignature::Der { der: "3006020101020102".into() }),
        }
    }

    #[test]
    fn session_buffer_concatenates_value_blocks() {
        let session = fixture();
        let (buffer, fields) = ChargePoint::canonical_buffer(&session).unwrap();
        let bytes = buffer.as_bytes();
        assert_eq!(bytes.len(), 68 + 2 * 26);

        assert_eq!(&bytes[0..9], b"DE*CPX*E7");
        assert_eq!(&bytes[24..31], b"CP-0001");

        // first block: timestamp carries +120 min of offsets
        let ts = u32::from_le_bytes(bytes[68..72].try_into().unwrap());
        assert_eq!(ts, 1_680_688_800 + 7200);
        assert_eq!(&bytes[76..84], &1000u64.to_le_bytes());

        // second block starts 26 bytes later
        let ts2 = u32::from_le_bytes(bytes[94..98].try_into().unwrap());
        assert_eq!(ts2, 1_680_692_400 + 7200);
        assert_eq!(&bytes[102..110], &2500u64.to_le_bytes());

        assert_eq!(fields.len(), 3 + 2 * 5);
    }

    #[test]
    fn missing_session_signature_is_a_defect() {
        let mut session = fixture();
        session.signature = None;
        assert!(matches!(
            ChargePoint.check_session(&session),
            Err(SessionDefect::Missing { .. })
        ));

        session.signature = Some(RawSignature::Pair { r: "01".into(), s: "02".into() });
        assert!(matches!(
            ChargePoint.check_session(&session),
            Err(SessionDefect::Malformed { .. })
        ));
    }
}
