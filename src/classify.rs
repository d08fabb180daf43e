use crate::variables::Variables;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category assigned to a completed call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    AppointmentBooked,
    Emergency,
    QuoteRequest,
    InfoRequest,
    NoAnswer,
    HangUp,
}

impl Outcome {
    pub const ALL: [Outcome; 6] = [
        Outcome::AppointmentBooked,
        Outcome::Emergency,
        Outcome::QuoteRequest,
        Outcome::InfoRequest,
        Outcome::NoAnswer,
        Outcome::HangUp,
    ];

    /// Column value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::AppointmentBooked => "appointment_booked",
            Outcome::Emergency => "emergency",
            Outcome::QuoteRequest => "quote_request",
            Outcome::InfoRequest => "info_request",
            Outcome::NoAnswer => "no_answer",
            Outcome::HangUp => "hang_up",
        }
    }

    /// Dashboard label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::AppointmentBooked => "Appointment Booked",
            Outcome::Emergency => "Emergency",
            Outcome::QuoteRequest => "Quote Request",
            Outcome::InfoRequest => "Info Request",
            Outcome::NoAnswer => "No Answer",
            Outcome::HangUp => "Hang Up",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Outcome::ALL
            .into_iter()
            .find(|o| o.as_str() == s)
            .ok_or_else(|| format!("unknown outcome '{s}'"))
    }
}

const NO_ANSWER_STATUS: &str = "no-answer";
const BOOKING_KEYWORDS: &[&str] = &["appointment", "schedule", "book"];
const EMERGENCY_KEYWORDS: &[&str] = &["emergency"];
const QUOTE_KEYWORDS: &[&str] = &["quote", "price"];
const INFO_KEYWORDS: &[&str] = &["information"];
const HANG_UP_BELOW_SECS: i64 = 10;
const SUBSTANTIVE_TRANSCRIPT_CHARS: usize = 50;

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Structured booking signal from the vendor's extracted variables.
pub fn has_structured_booking(variables: &Variables) -> bool {
    variables.get_bool("appointment_booked") == Some(true)
        || (variables.get_string("appointment_date").is_some()
            && variables.get_string("appointment_time").is_some())
}

/// Classify a call.  First matching rule wins: vendor status, then structured variables, then
/// transcript keywords, then call length.
pub fn classify(
    transcript: &str,
    variables: &Variables,
    vendor_status: Option<&str>,
    duration_seconds: i64,
) -> Outcome {
    if vendor_status.map(str::trim) == Some(NO_ANSWER_STATUS) {
        return Outcome::NoAnswer;
    }
    if has_structured_booking(variables) {
        return Outcome::AppointmentBooked;
    }

    let lower = transcript.to_lowercase();
    if contains_any(&lower, BOOKING_KEYWORDS) {
        Outcome::AppointmentBooked
    } else if contains_any(&lower, EMERGENCY_KEYWORDS) {
        Outcome::Emergency
    } else if contains_any(&lower, QUOTE_KEYWORDS) {
        Outcome::QuoteRequest
    } else if contains_any(&lower, INFO_KEYWORDS) {
        Outcome::InfoRequest
    } else if duration_seconds < HANG_UP_BELOW_SECS {
        Outcome::HangUp
    } else if transcript.chars().count() > SUBSTANTIVE_TRANSCRIPT_CHARS {
        Outcome::InfoRequest
    } else {
        Outcome::HangUp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(v: serde_json::Value) -> Variables {
        Variables::from_value(Some(&v))
    }

    #[test]
    fn no_answer_status_beats_everything() {
        let v = vars(json!({"appointment_booked": true}));
        assert_eq!(
            classify("please book an appointment", &v, Some("no-answer"), 300),
            Outcome::NoAnswer
        );
    }

    #[test]
    fn string_booked_flag_is_not_a_booking() {
        for flag in [json!("true"), json!("yes"), json!(1)] {
            let v = vars(json!({"appointment_booked": flag}));
            assert!(!has_structured_booking(&v));
            assert_eq!(classify("", &v, None, 60), Outcome::HangUp);
        }
    }

    #[test]
    fn structured_booking_beats_emergency_keyword() {
        let v = vars(json!({"appointment_booked": true}));
        assert_eq!(
            classify("this is an emergency", &v, Some("completed"), 60),
            Outcome::AppointmentBooked
        );
    }

    #[test]
    fn date_and_time_together_mean_booked() {
        let both = vars(json!({"appointment_date": "2025-01-02", "appointment_time": "10:00"}));
        assert_eq!(classify("", &both, None, 2), Outcome::AppointmentBooked);

        let date_only = vars(json!({"appointment_date": "2025-01-02", "appointment_time": ""}));
        assert_eq!(classify("", &date_only, None, 2), Outcome::HangUp);
    }

    #[test]
    fn keyword_precedence() {
        let v = Variables::default();
        assert_eq!(
            classify("EMERGENCY, can you Schedule someone?", &v, None, 5),
            Outcome::AppointmentBooked
        );
        assert_eq!(
            classify("emergency, what's your price", &v, None, 5),
            Outcome::Emergency
        );
        assert_eq!(classify("how much for a quote", &v, None, 5), Outcome::QuoteRequest);
        assert_eq!(
            classify("I want some information", &v, None, 5),
            Outcome::InfoRequest
        );
    }

    #[test]
    fn duration_fallback() {
        let v = Variables::default();
        let short = "hello? hello?";
        assert_eq!(classify(short, &v, None, 9), Outcome::HangUp);
        assert_eq!(classify(short, &v, None, 10), Outcome::HangUp);

        let exactly_fifty = "x".repeat(50);
        assert_eq!(classify(&exactly_fifty, &v, None, 30), Outcome::HangUp);
        let fifty_one = "x".repeat(51);
        assert_eq!(classify(&fifty_one, &v, None, 30), Outcome::InfoRequest);
        assert_eq!(classify(&fifty_one, &v, None, 3), Outcome::HangUp);
    }

    #[test]
    fn empty_input_is_a_hang_up() {
        assert_eq!(
            classify("", &Variables::default(), None, 0),
            Outcome::HangUp
        );
    }

    #[test]
    fn classification_is_repeatable() {
        let v = vars(json!({"service": "pumping"}));
        let t = "Hi there, I was wondering about a price for pumping my tank this spring";
        let first = classify(t, &v, Some("completed"), 42);
        assert_eq!(first, classify(t, &v, Some("completed"), 42));
        assert_eq!(first, Outcome::QuoteRequest);
    }

    #[test]
    fn outcome_round_trips_through_column_value() {
        for o in Outcome::ALL {
            assert_eq!(o.as_str().parse::<Outcome>(), Ok(o));
        }
        assert!("booked".parse::<Outcome>().is_err());
    }
}
