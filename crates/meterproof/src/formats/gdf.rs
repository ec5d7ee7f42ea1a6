//! GDF signed text-record format.
//!
//! Each value is signed as a 6-field semicolon-delimited ASCII record:
//!
//! ```text
//! meterId;YYYY-MM-DDThh:mm:ssZ;A-B:C.D.E*F;unit;scale;rawCounter
//! ```
//!
//! hashed with SHA-256 and signed with secp256r1; signatures arrive as
//! ASN.1 DER blobs. The record text is the canonical buffer — including
//! the second-precision timestamp rendering, which is part of the signing
//! contract.

use super::{
    check_min_values, check_monotonic_timestamps, verify_against_key, FormatStrategy, Outcome,
    SessionDefect, ValueContext,
};
use crate::digest::{self, CurveId};
use crate::EngineError;
use primitives::{ChargingSession, FieldHex, FormatId, Measurement, MeasurementValue};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]Z");

/// The GDF format strategy.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gdf;

impl Gdf {
    /// Render the signed record text for one value.
    pub fn record_text(
        measurement: &Measurement,
        value: &MeasurementValue,
    ) -> Result<String, SessionDefect> {
        let timestamp = value
            .timestamp
            .format(TIMESTAMP_FORMAT)
            .map_err(|e| SessionDefect::Malformed {
                field: "timestamp".into(),
                reason: e.to_string(),
            })?;
        let raw = value
            .value
            .scaled_digits(measurement.scale)
            .map_err(|e| SessionDefect::Malformed { field: "value".into(), reason: e.to_string() })?;

        if measurement.meter_id.contains(';') {
            return Err(SessionDefect::Malformed {
                field: "meter-id".into(),
                reason: "meter id must not contain the record delimiter".into(),
            });
        }

        Ok(format!(
            "{};{};{};{};{};{}",
            measurement.meter_id, timestamp, measurement.obis, measurement.unit,
            measurement.scale, raw,
        ))
    }
}

impl FormatStrategy for Gdf {
    fn id(&self) -> FormatId {
        FormatId::Gdf
    }

    fn curve(&self) -> CurveId {
        CurveId::Secp256r1
    }

    fn check_session(&self, session: &ChargingSession) -> Result<(), SessionDefect> {
        for measurement in &session.measurements {
            check_min_values(measurement)?;
            check_monotonic_timestamps(measurement)?;
            for value in &measurement.values {
                Self::record_text(measurement, value)?;
            }
        }
        Ok(())
    }

    fn verify_value(&self, ctx: &ValueContext<'_>) -> Result<Outcome, EngineError> {
        let record = match Self::record_text(ctx.measurement, ctx.value) {
            Ok(record) => record,
            Err(defect) => {
                return Ok(Outcome::with_error(
                    defect.status(),
                    Default::default(),
                    defect.to_string(),
                ))
            }
        };
        let message_digest = digest::digest(self.curve(), record.as_bytes());
        let fields = vec![FieldHex { name: "record".into(), hex: hex::encode(&record) }];
        verify_against_key(
            self.curve(),
            hex::encode(&record),
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

    fn fixture() -> (Measurement, MeasurementValue) {
        let value = MeasurementValue {
            timestamp: datetime!(2023-04-05 10:30:07 UTC),
            value: "0.037".parse().unwrap(),
            meter_status: 0,
            adapter_status: 0,
            sequence: 0,
            paging: 0,
            signature: None,
            extra: Default::default(),
        };
        let measurement = Measurement {
            meter_id: "GDF-METER-7".into(),
            obis: "0100010800ff".parse().unwrap(),
            unit: 30,
            scale: -3,
            algorithm: "ECC secp256r1".into(),
            values: vec![value.clone()],
        };
        (measurement, value)
    }

    #[test]
    fn record_text_is_exact() {
        let (measurement, value) = fixture();
        let record = Gdf::record_text(&measurement, &value).unwrap();
        assert_eq!(record, "GDF-METER-7;2023-04-05T10:30:07Z;1-0:1.8.0*255;30;-3;37");
    }

    #[test]
    fn delimiter_in_meter_id_is_rejected() {
        let (mut measurement, value) = fixture();
        measurement.meter_id = "a;b".into();
        assert!(matches!(
            Gdf::record_text(&measurement, &value),
            Err(SessionDefect::Malformed { .. })
        ));
    }
}
