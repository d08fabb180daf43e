use crate::error::AppError;
use crate::variables::Variables;

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, warn};

/// Alias lists, tried in order; first non-empty value wins.
pub mod aliases {
    pub const CALLER_PHONE: &[&str] = &["from", "phone_number"];
    pub const DURATION: &[&str] = &["call_length", "duration"];
    pub const RECORDING_URL: &[&str] = &["recording_url", "recording"];
    pub const TRANSCRIPT: &[&str] = &["concatenated_transcript", "transcript"];
    pub const VENDOR_CALL_ID: &[&str] = &["call_id", "c_id"];
    pub const STATUS: &[&str] = &["status"];
    pub const STARTED_AT: &[&str] = &["started_at", "start_time"];
    pub const ENDED_AT: &[&str] = &["ended_at", "end_time"];
    pub const CALLER_NAME_VARS: &[&str] = &["customer_name", "name"];
    pub const SERVICE_VARS: &[&str] = &["service", "service_type"];
}

/// No real call runs longer than a day; anything above is clamped to this.
pub const MAX_CALL_SECONDS: i64 = 24 * 60 * 60;

/// Ordered keyword groups for guessing the requested service from a transcript.
const SERVICE_KEYWORDS: &[(&[&str], &str)] = &[
    (&["emergency", "backup", "overflow"], "Emergency Pumping"),
    (&["routine", "regular", "maintenance"], "Routine Pumping"),
    (&["inspection", "check"], "Septic Inspection"),
    (&["drain field", "soggy"], "Drain Field Repair"),
    (&["new system", "installation"], "System Installation"),
];

/// A webhook delivery reduced to the fields the rest of the pipeline needs.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCall {
    pub vendor_call_id: Option<String>,
    pub caller_phone: Option<String>,
    pub caller_name: Option<String>,
    pub duration_seconds: i64,
    pub started_at: Option<OffsetDateTime>,
    pub ended_at: Option<OffsetDateTime>,
    pub recording_url: Option<String>,
    pub transcript: String,
    pub variables: Variables,
    pub vendor_status: Option<String>,
    pub service_requested: Option<String>,
}

fn string_field(payload: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match payload.get(k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Whole seconds; zero, negative and unparseable values fall through to the next alias.
fn duration_field(payload: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|k| {
        let secs = match payload.get(k)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        let secs = secs.round();
        (secs.is_finite() && secs > 0.0).then_some(secs as i64)
    })
}

fn timestamp_field(payload: &Value, keys: &[&str]) -> Option<OffsetDateTime> {
    let raw = string_field(payload, keys)?;
    OffsetDateTime::parse(&raw, &Rfc3339)
        .map_err(|e| debug!(error=%e, value=%raw, "ignoring unparseable timestamp"))
        .ok()
}

fn transcript_from_entries(payload: &Value) -> Option<String> {
    let entries = payload.get("transcripts")?.as_array()?;
    let lines: Vec<String> = entries
        .iter()
        .filter_map(|entry| {
            let role = entry
                .get("role")
                .or_else(|| entry.get("user"))
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            let message = entry
                .get("message")
                .or_else(|| entry.get("text"))
                .and_then(Value::as_str)?;
            Some(format!("[{role}]: {message}"))
        })
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

fn name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:my name is|this is|I'm) ([A-Z][a-z]+(?: [A-Z][a-z]+)?)")
            .expect("static name pattern compiles")
    })
}

/// Best-effort guess at the caller's name from phrases like "my name is Jane Doe".
pub fn extract_name(transcript: &str) -> Option<String> {
    name_pattern()
        .captures(transcript)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// First keyword group found in the transcript names the service.
pub fn extract_service(transcript: &str) -> Option<String> {
    let lower = transcript.to_lowercase();
    SERVICE_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(_, service)| service.to_string())
}

/// Reduce a raw webhook body to a `NormalizedCall`.  With `require_phone` set, a payload with no
/// caller phone is rejected.
pub fn normalize(payload: &Value, require_phone: bool) -> Result<NormalizedCall, AppError> {
    if !payload.is_object() {
        return Err(AppError::Validation(
            "webhook body must be a JSON object".to_string(),
        ));
    }

    let caller_phone = string_field(payload, aliases::CALLER_PHONE);
    if require_phone && caller_phone.is_none() {
        return Err(AppError::Validation("caller phone number missing".to_string()));
    }

    let started_at = timestamp_field(payload, aliases::STARTED_AT);
    let ended_at = timestamp_field(payload, aliases::ENDED_AT);
    let duration_seconds = duration_field(payload, aliases::DURATION)
        .or_else(|| match (started_at, ended_at) {
            (Some(start), Some(end)) => Some((end - start).whole_seconds().max(0)),
            _ => None,
        })
        .unwrap_or(0);
    if duration_seconds > MAX_CALL_SECONDS {
        warn!(duration_seconds, "call duration out of range, clamping");
    }
    let duration_seconds = duration_seconds.min(MAX_CALL_SECONDS);

    let transcript = string_field(payload, aliases::TRANSCRIPT)
        .or_else(|| transcript_from_entries(payload))
        .unwrap_or_default();

    let variables = Variables::from_value(payload.get("variables"));
    let caller_name = variables
        .first_string(aliases::CALLER_NAME_VARS)
        .or_else(|| extract_name(&transcript));
    let service_requested = variables
        .first_string(aliases::SERVICE_VARS)
        .or_else(|| extract_service(&transcript));

    Ok(NormalizedCall {
        vendor_call_id: string_field(payload, aliases::VENDOR_CALL_ID),
        caller_phone,
        caller_name,
        duration_seconds,
        started_at,
        ended_at,
        recording_url: string_field(payload, aliases::RECORDING_URL),
        transcript,
        variables,
        vendor_status: string_field(payload, aliases::STATUS),
        service_requested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn primary_field_names() {
        let call = normalize(
            &json!({
                "call_id": "c-1",
                "from": "+15551234567",
                "call_length": 185,
                "recording_url": "https://rec.example/1.mp3",
                "concatenated_transcript": "I'd like to schedule an appointment",
                "status": "completed",
            }),
            true,
        )
        .unwrap();
        assert_eq!(call.vendor_call_id.as_deref(), Some("c-1"));
        assert_eq!(call.caller_phone.as_deref(), Some("+15551234567"));
        assert_eq!(call.duration_seconds, 185);
        assert_eq!(call.recording_url.as_deref(), Some("https://rec.example/1.mp3"));
        assert_eq!(call.vendor_status.as_deref(), Some("completed"));
        assert!(call.variables.is_empty());
    }

    #[test]
    fn alias_field_names() {
        let call = normalize(
            &json!({
                "from": "",
                "phone_number": "+15550000000",
                "duration": "42.4",
                "recording": "https://rec.example/2.mp3",
                "transcript": "hello",
            }),
            true,
        )
        .unwrap();
        assert_eq!(call.caller_phone.as_deref(), Some("+15550000000"));
        assert_eq!(call.duration_seconds, 42);
        assert_eq!(call.recording_url.as_deref(), Some("https://rec.example/2.mp3"));
        assert_eq!(call.transcript, "hello");
    }

    #[test]
    fn transcript_built_from_entries() {
        let call = normalize(
            &json!({
                "from": "+1",
                "transcripts": [
                    {"role": "assistant", "message": "Thanks for calling."},
                    {"user": "user", "text": "My tank is full."},
                    {"role": "user"},
                ],
            }),
            true,
        )
        .unwrap();
        assert_eq!(
            call.transcript,
            "[assistant]: Thanks for calling.\n[user]: My tank is full."
        );
    }

    #[test]
    fn missing_everything_defaults() {
        let call = normalize(&json!({}), false).unwrap();
        assert_eq!(call.caller_phone, None);
        assert_eq!(call.duration_seconds, 0);
        assert_eq!(call.recording_url, None);
        assert_eq!(call.transcript, "");
        assert_eq!(call.caller_name, None);
        assert_eq!(call.service_requested, None);
    }

    #[test]
    fn phone_required_when_asked() {
        let err = normalize(&json!({"call_length": 3}), true).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn non_object_body_rejected() {
        assert!(matches!(
            normalize(&json!("hello"), false),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn duration_derived_from_timestamps() {
        let call = normalize(
            &json!({
                "from": "+1",
                "started_at": "2025-05-01T10:00:00Z",
                "ended_at": "2025-05-01T10:02:30Z",
            }),
            true,
        )
        .unwrap();
        assert_eq!(call.duration_seconds, 150);
        assert_eq!(call.started_at, Some(datetime!(2025-05-01 10:00:00 UTC)));
    }

    #[test]
    fn absurd_duration_is_clamped() {
        for raw in [json!(1e15), json!("1e300"), json!(u64::MAX)] {
            let call = normalize(&json!({"from": "+1", "call_length": raw}), true).unwrap();
            assert_eq!(call.duration_seconds, MAX_CALL_SECONDS);
        }
        let call = normalize(
            &json!({
                "from": "+1",
                "started_at": "0001-01-01T00:00:00Z",
                "ended_at": "9999-12-31T23:59:59Z",
            }),
            true,
        )
        .unwrap();
        assert_eq!(call.duration_seconds, MAX_CALL_SECONDS);
    }

    #[test]
    fn explicit_variables_beat_transcript_heuristics() {
        let call = normalize(
            &json!({
                "from": "+1",
                "concatenated_transcript": "Hi, this is Bob Smith, my yard is soggy",
                "variables": {"customer_name": "Robert Smith", "service_type": "Pumping"},
            }),
            true,
        )
        .unwrap();
        assert_eq!(call.caller_name.as_deref(), Some("Robert Smith"));
        assert_eq!(call.service_requested.as_deref(), Some("Pumping"));
    }

    #[test]
    fn name_heuristic() {
        assert_eq!(
            extract_name("Hello, my name is Jane Doe and I need help").as_deref(),
            Some("Jane Doe")
        );
        assert_eq!(extract_name("I'm Carl").as_deref(), Some("Carl"));
        assert_eq!(extract_name("nobody introduced themselves"), None);
    }

    #[test]
    fn service_groups_in_order() {
        assert_eq!(
            extract_service("sewage backup, also want an inspection").as_deref(),
            Some("Emergency Pumping")
        );
        assert_eq!(
            extract_service("just regular maintenance").as_deref(),
            Some("Routine Pumping")
        );
        assert_eq!(
            extract_service("can you check the tank").as_deref(),
            Some("Septic Inspection")
        );
        assert_eq!(
            extract_service("the DRAIN FIELD is wet").as_deref(),
            Some("Drain Field Repair")
        );
        assert_eq!(
            extract_service("quote for a new system").as_deref(),
            Some("System Installation")
        );
        assert_eq!(extract_service("what are your hours"), None);
    }
}
