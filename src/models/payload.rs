//! JSON request bodies and their presence checks.
//!
//! A field counts as present when the key exists, is not `null`, and is not
//! the empty string. Nothing beyond presence is validated.

use serde::Deserialize;
use thiserror::Error;

use super::{flag, NewContact, NewContactMethod};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Name and phone are required")]
    MissingContactFields,
    #[error("Method type and value are required")]
    MissingMethodFields,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactPayload {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub is_favorite: bool,
    #[serde(default)]
    pub methods: Option<Vec<MethodPayload>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MethodPayload {
    #[serde(default)]
    pub method_type: Option<String>,
    #[serde(default)]
    pub method_value: Option<String>,
    #[serde(default, deserialize_with = "flag::deserialize")]
    pub is_primary: bool,
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl ContactPayload {
    /// Nested method entries missing a type or value are dropped.
    pub fn validate(self) -> Result<NewContact, ValidationError> {
        let (Some(name), Some(phone)) = (present(self.name), present(self.phone)) else {
            return Err(ValidationError::MissingContactFields);
        };

        let mut methods = Vec::new();
        for entry in self.methods.unwrap_or_default() {
            match entry.validate() {
                Ok(method) => methods.push(method),
                Err(_) => tracing::warn!(contact = %name, "Dropping nested method without type or value"),
            }
        }

        Ok(NewContact {
            name,
            phone,
            email: self.email.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            is_favorite: self.is_favorite,
            methods,
        })
    }
}

impl MethodPayload {
    pub fn validate(self) -> Result<NewContactMethod, ValidationError> {
        match (present(self.method_type), present(self.method_value)) {
            (Some(method_type), Some(method_value)) => Ok(NewContactMethod {
                method_type,
                method_value,
                is_primary: self.is_primary,
            }),
            _ => Err(ValidationError::MissingMethodFields),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(json: &str) -> Result<NewContact, ValidationError> {
        serde_json::from_str::<ContactPayload>(json).unwrap().validate()
    }

    #[test]
    fn test_requires_name_and_phone() {
        assert_eq!(
            contact(r#"{"name": "Ada"}"#),
            Err(ValidationError::MissingContactFields)
        );
        assert_eq!(
            contact(r#"{"name": "Ada", "phone": ""}"#),
            Err(ValidationError::MissingContactFields)
        );
        assert_eq!(
            contact(r#"{"name": null, "phone": "555"}"#),
            Err(ValidationError::MissingContactFields)
        );
    }

    #[test]
    fn test_optional_fields_default_empty() {
        let new = contact(r#"{"name": "Ada", "phone": "555"}"#).unwrap();
        assert_eq!(new.email, "");
        assert_eq!(new.address, "");
        assert!(!new.is_favorite);
        assert!(new.methods.is_empty());
    }

    #[test]
    fn test_favorite_accepts_int_and_bool() {
        let new = contact(r#"{"name": "A", "phone": "1", "is_favorite": 1}"#).unwrap();
        assert!(new.is_favorite);
        let new = contact(r#"{"name": "A", "phone": "1", "is_favorite": true}"#).unwrap();
        assert!(new.is_favorite);
        let new = contact(r#"{"name": "A", "phone": "1", "is_favorite": 0}"#).unwrap();
        assert!(!new.is_favorite);
        let new = contact(r#"{"name": "A", "phone": "1", "is_favorite": null}"#).unwrap();
        assert!(!new.is_favorite);
    }

    #[test]
    fn test_nested_methods() {
        let new = contact(
            r#"{"name": "A", "phone": "1", "methods": [
                {"method_type": "wechat", "method_value": "abc", "is_primary": 1},
                {"method_type": "qq", "method_value": "123"},
                {"method_type": "skype"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            new.methods,
            vec![
                NewContactMethod::new("wechat", "abc").primary(),
                NewContactMethod::new("qq", "123"),
            ]
        );
    }

    #[test]
    fn test_method_requires_type_and_value() {
        let payload: MethodPayload = serde_json::from_str(r#"{"method_type": "email"}"#).unwrap();
        assert_eq!(payload.validate(), Err(ValidationError::MissingMethodFields));

        let payload: MethodPayload =
            serde_json::from_str(r#"{"method_type": "", "method_value": "x"}"#).unwrap();
        assert_eq!(payload.validate(), Err(ValidationError::MissingMethodFields));
    }
}
