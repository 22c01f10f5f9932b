//! Response envelope
//!
//! The remote functions answer with loosely shaped JSON objects such as
//! `{"success": true, "data": {...}}` or `{"success": false, "error": "..."}`.
//! `Envelope` exposes the handful of keys the probes look at and nothing more.

use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    body: Map<String, Value>,
}

impl Envelope {
    /// Wrap a decoded body, `None` unless it is a JSON object
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(body) => Some(Self { body }),
            _ => None,
        }
    }

    /// The `success` flag; `None` when absent or not a boolean
    pub fn success(&self) -> Option<bool> {
        self.body.get("success").and_then(Value::as_bool)
    }

    /// Only a boolean `true` counts; truthy values such as `1` or `"yes"` do not
    pub fn succeeded(&self) -> bool {
        self.success() == Some(true)
    }

    /// Whether the body carries a `success` key at all, whatever its value
    pub fn has_success_flag(&self) -> bool {
        self.body.get("success").is_some_and(|v| !v.is_null())
    }

    /// Error text, from a string `error` or the `message` of an error object
    pub fn error(&self) -> Option<String> {
        match self.body.get("error")? {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => obj
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| Some(Value::Object(obj.clone()).to_string())),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Error text or a placeholder, for "failed: ..." lines
    pub fn error_or_unknown(&self) -> String {
        self.error().unwrap_or_else(|| "None".to_string())
    }

    pub fn message(&self) -> Option<&str> {
        self.body.get("message").and_then(Value::as_str)
    }

    pub fn data(&self) -> Option<&Value> {
        self.body.get("data").filter(|v| !v.is_null())
    }

    /// Items of an array `data`, empty otherwise
    pub fn data_items(&self) -> &[Value] {
        match self.data() {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }

    /// Field of an object `data`
    pub fn data_str(&self, key: &str) -> Option<String> {
        self.data().and_then(|data| value_str(data.get(key)?))
    }

    /// Field of the first element of an array `data`
    pub fn first_item_str(&self, key: &str) -> Option<String> {
        self.data_items()
            .first()
            .and_then(|item| value_str(item.get(key)?))
    }

    pub fn invitations_sent(&self) -> u64 {
        self.body
            .get("invitations_sent")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    /// Field of the `debug_info` object
    pub fn debug_info(&self, key: &str) -> Option<&Value> {
        self.body.get("debug_info")?.get(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.get(key)
    }
}

/// Render an identifier-like value as a string; numbers are accepted too
pub fn value_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(value: Value) -> Envelope {
        Envelope::from_value(value).unwrap()
    }

    #[test]
    fn test_non_object_body_is_rejected() {
        assert!(Envelope::from_value(json!([1, 2])).is_none());
        assert!(Envelope::from_value(json!("ok")).is_none());
    }

    #[test]
    fn test_success_flag() {
        assert!(envelope(json!({"success": true})).succeeded());

        let failed = envelope(json!({"success": false, "error": "Room not found"}));
        assert_eq!(failed.success(), Some(false));
        assert!(failed.has_success_flag());
        assert_eq!(failed.error().as_deref(), Some("Room not found"));

        let bare = envelope(json!({"data": []}));
        assert_eq!(bare.success(), None);
        assert!(!bare.has_success_flag());
        assert!(!bare.succeeded());
    }

    #[test]
    fn test_truthy_success_is_not_success() {
        let numeric = envelope(json!({"success": 1}));
        assert!(!numeric.succeeded());
        assert!(numeric.has_success_flag());
        assert!(!envelope(json!({"success": "true"})).succeeded());
    }

    #[test]
    fn test_error_object_message() {
        let env = envelope(json!({
            "success": false,
            "error": {"code": "PGRST200", "message": "Could not find a relationship between 'join_requests' and 'game_rooms'"}
        }));
        assert!(env.error().unwrap().starts_with("Could not find a relationship"));
        assert_eq!(envelope(json!({"success": false})).error_or_unknown(), "None");
    }

    #[test]
    fn test_room_fields() {
        let env = envelope(json!({
            "success": true,
            "data": {"id": "room-1", "room_code": "AB12CD"}
        }));
        assert_eq!(env.data_str("id").as_deref(), Some("room-1"));
        assert_eq!(env.data_str("room_code").as_deref(), Some("AB12CD"));
        assert!(env.data_items().is_empty());
        assert!(env.first_item_str("id").is_none());
    }

    #[test]
    fn test_list_fields() {
        let env = envelope(json!({
            "success": true,
            "data": [{"id": 42, "room_id": "room-1"}, {"id": 43}],
            "invitations_sent": 2
        }));
        assert_eq!(env.data_items().len(), 2);
        assert_eq!(env.first_item_str("id").as_deref(), Some("42"));
        assert_eq!(env.first_item_str("room_id").as_deref(), Some("room-1"));
        assert_eq!(env.invitations_sent(), 2);
    }

    #[test]
    fn test_null_data_and_debug_info() {
        let env = envelope(json!({
            "success": true,
            "data": null,
            "debug_info": {"table_error": null, "basic_query": [1]}
        }));
        assert!(env.data().is_none());
        assert_eq!(env.invitations_sent(), 0);
        assert_eq!(env.debug_info("basic_query"), Some(&json!([1])));
        assert!(env.debug_info("missing").is_none());
    }
}
