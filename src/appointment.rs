use crate::classify::Outcome;
use crate::normalize::NormalizedCall;

use serde::{Deserialize, Serialize};
use std::fmt;
use time::{Date, Duration};
use tracing::warn;

/// Time slot used when a booking was inferred from the transcript and carries no explicit time.
/// This is a placeholder, not a scheduling decision.
pub const DEFAULT_APPOINTMENT_TIME: &str = "09:00";
const NOTES_TRANSCRIPT_CHARS: usize = 200;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Appointment details pulled out of a booked call, not yet tied to a stored call row.
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentDraft {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub service_type: Option<String>,
    pub scheduled_date: Date,
    pub scheduled_time: String,
    pub property_address: Option<String>,
    pub problem_description: String,
    pub status: AppointmentStatus,
}

fn booked_via_agent_note(transcript: &str) -> String {
    let excerpt: String = transcript.chars().take(NOTES_TRANSCRIPT_CHARS).collect();
    format!("Booked via AI agent. {excerpt}")
}

/// Derive an appointment from a call, only for the booked outcome.  Missing date falls back to
/// the day after `today`; missing time falls back to `DEFAULT_APPOINTMENT_TIME`.
pub fn maybe_extract_appointment(
    call: &NormalizedCall,
    outcome: Outcome,
    today: Date,
) -> Option<AppointmentDraft> {
    if outcome != Outcome::AppointmentBooked {
        return None;
    }
    let vars = &call.variables;
    let tomorrow = today + Duration::days(1);

    let scheduled_date = match (vars.get_string("appointment_date"), vars.get_date("appointment_date")) {
        (_, Some(date)) => date,
        (Some(raw), None) => {
            warn!(value=%raw, "unparseable appointment_date; using default date");
            tomorrow
        }
        (None, None) => tomorrow,
    };
    let scheduled_time = vars
        .get_string("appointment_time")
        .unwrap_or_else(|| DEFAULT_APPOINTMENT_TIME.to_string());

    Some(AppointmentDraft {
        customer_name: call.caller_name.clone(),
        customer_phone: call.caller_phone.clone(),
        service_type: call.service_requested.clone(),
        scheduled_date,
        scheduled_time,
        property_address: vars.first_string(&["property_address", "address"]),
        problem_description: vars
            .first_string(&["problem_description", "issue"])
            .unwrap_or_else(|| booked_via_agent_note(&call.transcript)),
        status: AppointmentStatus::Scheduled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use serde_json::json;
    use time::macros::date;

    const TODAY: Date = date!(2025 - 06 - 30);

    #[test]
    fn only_booked_calls_produce_appointments() {
        let call = normalize(&json!({"from": "+1", "variables": {"appointment_date": "2025-07-04"}}), true).unwrap();
        for outcome in Outcome::ALL {
            let draft = maybe_extract_appointment(&call, outcome, TODAY);
            assert_eq!(draft.is_some(), outcome == Outcome::AppointmentBooked);
        }
    }

    #[test]
    fn structured_fields_are_used() {
        let call = normalize(
            &json!({
                "from": "+15551234567",
                "variables": {
                    "customer_name": "Dana",
                    "service": "Routine Pumping",
                    "appointment_date": "2025-07-04",
                    "appointment_time": "2pm",
                    "address": "12 Elm St",
                    "issue": "slow drains",
                },
            }),
            true,
        )
        .unwrap();
        let draft = maybe_extract_appointment(&call, Outcome::AppointmentBooked, TODAY).unwrap();
        assert_eq!(draft.scheduled_date, date!(2025 - 07 - 04));
        assert_eq!(draft.scheduled_time, "2pm");
        assert_eq!(draft.customer_name.as_deref(), Some("Dana"));
        assert_eq!(draft.customer_phone.as_deref(), Some("+15551234567"));
        assert_eq!(draft.service_type.as_deref(), Some("Routine Pumping"));
        assert_eq!(draft.property_address.as_deref(), Some("12 Elm St"));
        assert_eq!(draft.problem_description, "slow drains");
        assert_eq!(draft.status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn transcript_inferred_booking_defaults_to_tomorrow_morning() {
        let call = normalize(
            &json!({"from": "+1", "concatenated_transcript": "I want to book a pump out"}),
            true,
        )
        .unwrap();
        let draft = maybe_extract_appointment(&call, Outcome::AppointmentBooked, TODAY).unwrap();
        assert_eq!(draft.scheduled_date, date!(2025 - 07 - 01));
        assert_eq!(draft.scheduled_time, DEFAULT_APPOINTMENT_TIME);
        assert_eq!(
            draft.problem_description,
            "Booked via AI agent. I want to book a pump out"
        );
    }

    #[test]
    fn unparseable_date_falls_back() {
        let call = normalize(
            &json!({"from": "+1", "variables": {"appointment_date": "Friday", "appointment_time": "10:00"}}),
            true,
        )
        .unwrap();
        let draft = maybe_extract_appointment(&call, Outcome::AppointmentBooked, TODAY).unwrap();
        assert_eq!(draft.scheduled_date, date!(2025 - 07 - 01));
        assert_eq!(draft.scheduled_time, "10:00");
    }

    #[test]
    fn notes_excerpt_is_capped() {
        let long = "a".repeat(500);
        let call = normalize(&json!({"from": "+1", "transcript": long}), true).unwrap();
        let draft = maybe_extract_appointment(&call, Outcome::AppointmentBooked, TODAY).unwrap();
        assert_eq!(
            draft.problem_description.len(),
            "Booked via AI agent. ".len() + 200
        );
    }
}
