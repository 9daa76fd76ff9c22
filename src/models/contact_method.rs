use serde::{Deserialize, Serialize};

use super::flag;

/// Method type that mirrors the contact's own phone column.
pub const PHONE_METHOD_TYPE: &str = "phone";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMethod {
    pub id: i64,
    pub contact_id: i64,
    pub method_type: String,
    pub method_value: String,
    #[serde(with = "flag", default)]
    pub is_primary: bool,
}

impl ContactMethod {
    /// True when this method just repeats the contact's primary phone field.
    pub fn duplicates_phone(&self, phone: &str) -> bool {
        self.method_type == PHONE_METHOD_TYPE && self.method_value == phone
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContactMethod {
    pub method_type: String,
    pub method_value: String,
    pub is_primary: bool,
}

impl NewContactMethod {
    pub fn new(method_type: impl Into<String>, method_value: impl Into<String>) -> Self {
        Self {
            method_type: method_type.into(),
            method_value: method_value.into(),
            is_primary: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn method(method_type: &str, value: &str) -> ContactMethod {
        ContactMethod {
            id: 1,
            contact_id: 1,
            method_type: method_type.to_string(),
            method_value: value.to_string(),
            is_primary: false,
        }
    }

    #[test]
    fn test_duplicates_phone() {
        assert!(method("phone", "123").duplicates_phone("123"));
        assert!(!method("phone", "456").duplicates_phone("123"));
        // Same value under another type is still listed
        assert!(!method("mobile", "123").duplicates_phone("123"));
    }

    #[test]
    fn test_primary_round_trips_as_integer() {
        let mut m = method("wechat", "abc");
        m.is_primary = true;
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"is_primary\":1"));

        let back: ContactMethod = serde_json::from_str(&json).unwrap();
        assert!(back.is_primary);
    }
}
