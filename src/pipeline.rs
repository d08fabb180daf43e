use crate::appointment::maybe_extract_appointment;
use crate::classify::{classify, Outcome};
use crate::db_types::{CallInsert, NewActivity, NewAppointment, NewCall};
use crate::error::{log_store_error, AppError, PartialSuccessWarning};
use crate::normalize::{normalize, NormalizedCall};
use crate::store::Store;

use serde_json::{json, Value};
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

/// What happened to one webhook delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookReceipt {
    pub call_id: Uuid,
    pub outcome: Outcome,
    /// True when the vendor call id was already on file; nothing new was written.
    pub duplicate: bool,
    pub appointment_id: Option<Uuid>,
    pub warnings: Vec<PartialSuccessWarning>,
}

/// Vendor timestamps win; otherwise the call is taken to have ended at `now`.
fn call_window(call: &NormalizedCall, now: OffsetDateTime) -> (OffsetDateTime, OffsetDateTime) {
    let end = call.ended_at.unwrap_or(now);
    let start = call.started_at.unwrap_or_else(|| {
        end.checked_sub(Duration::seconds(call.duration_seconds)).unwrap_or(end)
    });
    (start, end)
}

fn to_new_call(
    business_id: &str,
    call: &NormalizedCall,
    outcome: Outcome,
    now: OffsetDateTime,
) -> Result<NewCall, AppError> {
    let caller_phone = call
        .caller_phone
        .clone()
        .ok_or_else(|| AppError::Validation("caller phone number missing".to_string()))?;
    let (start_time, end_time) = call_window(call, now);
    Ok(NewCall {
        business_id: business_id.to_string(),
        vendor_call_id: call.vendor_call_id.clone(),
        caller_phone,
        caller_name: call.caller_name.clone(),
        start_time,
        end_time,
        duration_seconds: i32::try_from(call.duration_seconds.max(0)).unwrap_or(i32::MAX),
        recording_url: call.recording_url.clone(),
        transcript: call.transcript.clone(),
        variables: call.variables.to_value(),
        outcome: outcome.as_str().to_string(),
        service_requested: call.service_requested.clone(),
    })
}

fn call_activity(business_id: &str, call_id: Uuid, new_call: &NewCall, outcome: Outcome) -> NewActivity {
    NewActivity {
        business_id: business_id.to_string(),
        activity_type: "call_received".to_string(),
        description: format!(
            "Call from {} ({}, {}s)",
            new_call.caller_phone,
            outcome.label(),
            new_call.duration_seconds
        ),
        metadata: json!({
            "call_id": call_id,
            "vendor_call_id": new_call.vendor_call_id,
            "caller_phone": new_call.caller_phone,
            "caller_name": new_call.caller_name,
            "outcome": outcome.as_str(),
            "duration_seconds": new_call.duration_seconds,
            "service_requested": new_call.service_requested,
        }),
    }
}

/// Turn one webhook delivery into stored records.
///
/// The call row is the primary effect: if it cannot be written the whole delivery fails, so the
/// vendor retries.  The activity log entry and the appointment are secondary; their failures come
/// back as warnings on an otherwise successful receipt.
pub async fn process_webhook(
    store: &dyn Store,
    business_id: &str,
    payload: &Value,
    now: OffsetDateTime,
) -> Result<WebhookReceipt, AppError> {
    let business = store.get_business(business_id).await.map_err(|e| {
        log_store_error("failed to look up business", &e);
        AppError::from(e)
    })?;
    if business.is_none() {
        return Err(AppError::NotFound(format!("business {business_id} not found")));
    }

    let call = normalize(payload, true)?;
    let outcome = classify(
        &call.transcript,
        &call.variables,
        call.vendor_status.as_deref(),
        call.duration_seconds,
    );
    debug!(
        caller_name=?call.caller_name,
        service=?call.service_requested,
        outcome=%outcome,
        "normalized webhook payload"
    );

    let new_call = to_new_call(business_id, &call, outcome, now)?;
    let inserted = store.insert_call(&new_call).await.map_err(|e| {
        log_store_error("failed to insert call row", &e);
        AppError::from(e)
    })?;
    let call_id = match inserted {
        CallInsert::Created(row) => row.id,
        CallInsert::Duplicate(row) => {
            info!(call_id=%row.id, vendor_call_id=?row.vendor_call_id, "duplicate webhook delivery ignored");
            return Ok(WebhookReceipt {
                call_id: row.id,
                outcome: row.outcome.parse().unwrap_or(outcome),
                duplicate: true,
                appointment_id: None,
                warnings: vec![],
            });
        }
    };
    info!(call_id=%call_id, business_id=%business_id, outcome=%outcome, "call saved");

    let mut warnings = vec![];
    if let Err(e) = store
        .append_activity(&call_activity(business_id, call_id, &new_call, outcome))
        .await
    {
        warnings.push(PartialSuccessWarning::new("failed to append activity log", e));
    }

    let mut appointment_id = None;
    if let Some(draft) = maybe_extract_appointment(&call, outcome, now.date()) {
        let appointment = NewAppointment {
            call_id: Some(call_id),
            business_id: business_id.to_string(),
            customer_name: draft.customer_name,
            customer_phone: draft.customer_phone,
            service_type: draft.service_type,
            scheduled_date: draft.scheduled_date,
            scheduled_time: draft.scheduled_time,
            property_address: draft.property_address,
            problem_description: draft.problem_description,
            status: draft.status.as_str().to_string(),
        };
        match store.insert_appointment(&appointment).await {
            Ok(row) => {
                info!(appointment_id=%row.id, "appointment created");
                appointment_id = Some(row.id);
            }
            Err(e) => warnings.push(PartialSuccessWarning::new("failed to create appointment", e)),
        }
    }

    Ok(WebhookReceipt {
        call_id,
        outcome,
        duplicate: false,
        appointment_id,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn window_derived_from_duration() {
        let call = normalize(&json!({"from": "+1", "call_length": 90}), true).unwrap();
        let now = datetime!(2025-01-01 12:00:00 UTC);
        assert_eq!(
            call_window(&call, now),
            (datetime!(2025-01-01 11:58:30 UTC), now)
        );
    }

    #[test]
    fn vendor_timestamps_used_verbatim() {
        let call = normalize(
            &json!({
                "from": "+1",
                "call_length": 5,
                "started_at": "2025-01-01T08:00:00Z",
                "ended_at": "2025-01-01T08:10:00Z",
            }),
            true,
        )
        .unwrap();
        let (start, end) = call_window(&call, datetime!(2025-01-02 00:00:00 UTC));
        assert_eq!(start, datetime!(2025-01-01 08:00:00 UTC));
        assert_eq!(end, datetime!(2025-01-01 08:10:00 UTC));
    }
}
