//! Session verification orchestrator.
//!
//! Resolves the format strategy from the session's context identifier,
//! runs the strategy's session-level checks, verifies every value of every
//! measurement in declared order, folds the per-value statuses into one
//! session status and finally relabels each value by its position
//! (start/intermediate/stop).
//!
//! Key lookup is the only external dependency; each meter identity is
//! resolved once per run. Everything else is a pure function of the
//! session and the resolved keys, so independent sessions can be verified
//! concurrently without coordination.

use crate::formats::{FormatStrategy, Formats, ValueContext};
use crate::EngineError;
use primitives::{
    AuditTrail, ChargingSession, FormatId, MeasurementReport, MeterRegistry, PublicKeyRecord,
    SessionReport, ValuePosition, ValueReport, VerificationStatus,
};
use std::collections::HashMap;

fn fatal_report(
    session: &ChargingSession,
    format: FormatId,
    status: VerificationStatus,
    error: String,
) -> SessionReport {
    SessionReport {
        session_id: session.session_id.clone(),
        format,
        status,
        errors: vec![error],
        audit: AuditTrail::default(),
        measurements: Vec::new(),
    }
}

/// Verify a whole charging session.
///
/// Returns a [`SessionReport`] side table; the session itself is never
/// modified. `Err` only surfaces arithmetic faults, never validation
/// failures — those are statuses inside the report.
pub fn verify_session(
    session: &ChargingSession,
    registry: &dyn MeterRegistry,
) -> Result<SessionReport, EngineError> {
    let format = FormatId::from_context(&session.format_context);
    let Some(strategy) = Formats::standard().get(format) else {
        tracing::debug!(context = %session.format_context, "no strategy for format context");
        return Ok(fatal_report(
            session,
            FormatId::Unknown,
            VerificationStatus::UnknownFormat,
            format!("format context {:?} is not recognized", session.format_context),
        ));
    };
    tracing::debug!(format = %format, session = %session.session_id, "verifying session");

    if let Err(defect) = strategy.check_session(session) {
        tracing::debug!(format = %format, %defect, "session rejected before cryptography");
        return Ok(fatal_report(session, format, defect.status(), defect.to_string()));
    }

    // resolve each meter identity once
    let mut keys: HashMap<&str, Option<PublicKeyRecord>> = HashMap::new();
    for measurement in &session.measurements {
        keys.entry(measurement.meter_id.as_str())
            .or_insert_with(|| registry.meter(&measurement.meter_id));
    }

    let mut measurements = Vec::with_capacity(session.measurements.len());
    let mut all_values_ok = true;
    for measurement in &session.measurements {
        let key = keys[measurement.meter_id.as_str()].as_ref();
        let total = measurement.values.len();
        let mut values = Vec::with_capacity(total);
        for (index, value) in measurement.values.iter().enumerate() {
            let ctx = ValueContext { session, measurement, value, index, total, key };
            let outcome = strategy.verify_value(&ctx)?;
            all_values_ok &= outcome.status.is_ok();
            values.push(ValueReport {
                index,
                timestamp: value.timestamp,
                status: outcome.status,
                errors: outcome.errors,
                audit: outcome.audit,
            });
        }
        measurements.push(MeasurementReport {
            meter_id: measurement.meter_id.clone(),
            obis: measurement.obis,
            values,
        });
    }

    // session status: the fold of per-value statuses for value-signing
    // formats, the session-wide signature otherwise
    let folded = if all_values_ok {
        VerificationStatus::ValidSignature
    } else {
        VerificationStatus::InvalidSignature
    };
    let (status, errors, audit) = if strategy.signs_values() {
        (folded, Vec::new(), AuditTrail::default())
    } else {
        let first_key = session
            .measurements
            .first()
            .and_then(|m| keys[m.meter_id.as_str()].as_ref());
        match strategy.verify_session_signature(session, first_key) {
            Some(result) => {
                let outcome = result?;
                let status =
                    if outcome.status.is_ok() { folded } else { outcome.status };
                (status, outcome.errors, outcome.audit)
            }
            None => (folded, Vec::new(), AuditTrail::default()),
        }
    };

    // relabel every value by its position in declared order
    for report in &mut measurements {
        let total = report.values.len();
        for value in &mut report.values {
            value.status = value.status.classified(ValuePosition::of(value.index, total));
        }
    }

    tracing::debug!(format = %format, %status, "session verified");
    Ok(SessionReport {
        session_id: session.session_id.clone(),
        format,
        status,
        errors,
        audit,
        measurements,
    })
}

/// Verify one value of one measurement, without position classification.
///
/// `None` when the indices are out of range. Session-level consistency is
/// still enforced first: a session that fails its format checks yields
/// that fatal status for every value, and an unrecognized format context
/// yields `UnknownFormat`.
pub fn verify_single_value(
    session: &ChargingSession,
    measurement_index: usize,
    value_index: usize,
    registry: &dyn MeterRegistry,
) -> Result<Option<ValueReport>, EngineError> {
    let measurement = match session.measurements.get(measurement_index) {
        Some(measurement) => measurement,
        None => return Ok(None),
    };
    let value = match measurement.values.get(value_index) {
        Some(value) => value,
        None => return Ok(None),
    };
    let Some(strategy) = Formats::standard().for_context(&session.format_context) else {
        return Ok(Some(ValueReport {
            index: value_index,
            timestamp: value.timestamp,
            status: VerificationStatus::UnknownFormat,
            errors: vec![format!(
                "format context {:?} is not recognized",
                session.format_context
            )],
            audit: AuditTrail::default(),
        }));
    };

    if let Err(defect) = strategy.check_session(session) {
        return Ok(Some(ValueReport {
            index: value_index,
            timestamp: value.timestamp,
            status: defect.status(),
            errors: vec![defect.to_string()],
            audit: AuditTrail::default(),
        }));
    }

    let key = registry.meter(&measurement.meter_id);
    let ctx = ValueContext {
        session,
        measurement,
        value,
        index: value_index,
        total: measurement.values.len(),
        key: key.as_ref(),
    };
    let outcome = strategy.verify_value(&ctx)?;
    Ok(Some(ValueReport {
        index: value_index,
        timestamp: value.timestamp,
        status: outcome.status,
        errors: outcome.errors,
        audit: outcome.audit,
    }))
}
