use serde_json::{Map, Value};
use time::macros::format_description;
use time::Date;

/// The vendor's free-form `variables` object.  Nothing about its shape is guaranteed, so every
/// accessor reports absence instead of failing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Variables(Map<String, Value>);

impl Variables {
    /// Anything other than a JSON object is treated as an empty bag.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self(map.clone()),
            _ => Self::default(),
        }
    }

    /// Non-empty string value.  Numbers are rendered so that e.g. `"zip": 12345` still reads.
    pub fn get_string(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// First non-empty string among `keys`.
    pub fn first_string(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|k| self.get_string(k))
    }

    /// Only a JSON boolean counts; `"true"` and `1` do not.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key)?.as_bool()
    }

    /// Calendar date in `YYYY-MM-DD` form.
    pub fn get_date(&self, key: &str) -> Option<Date> {
        let raw = self.get_string(key)?;
        Date::parse(&raw, format_description!("[year]-[month]-[day]")).ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    #[test]
    fn non_object_is_empty() {
        assert!(Variables::from_value(Some(&json!([1, 2]))).is_empty());
        assert!(Variables::from_value(None).is_empty());
    }

    #[test]
    fn blank_strings_are_absent() {
        let vars = Variables::from_value(Some(&json!({"name": "   ", "service": "Inspection"})));
        assert_eq!(vars.get_string("name"), None);
        assert_eq!(
            vars.first_string(&["name", "service"]),
            Some("Inspection".to_string())
        );
    }

    #[test]
    fn bools_are_json_booleans_only() {
        let vars = Variables::from_value(Some(&json!({
            "a": true,
            "b": "true",
            "c": "yes",
            "d": 1,
            "e": false,
        })));
        assert_eq!(vars.get_bool("a"), Some(true));
        assert_eq!(vars.get_bool("b"), None);
        assert_eq!(vars.get_bool("c"), None);
        assert_eq!(vars.get_bool("d"), None);
        assert_eq!(vars.get_bool("e"), Some(false));
    }

    #[test]
    fn dates_parse_iso_only() {
        let vars = Variables::from_value(Some(&json!({
            "good": "2025-03-14",
            "bad": "next tuesday",
        })));
        assert_eq!(vars.get_date("good"), Some(date!(2025 - 03 - 14)));
        assert_eq!(vars.get_date("bad"), None);
        assert_eq!(vars.get_date("missing"), None);
    }
}
