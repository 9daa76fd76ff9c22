mod contact;
mod contact_method;
mod payload;

pub use contact::{Contact, NewContact};
pub use contact_method::{ContactMethod, NewContactMethod, PHONE_METHOD_TYPE};
pub use payload::{ContactPayload, MethodPayload, ValidationError};

/// Serde adapter for 0/1 flag columns.
///
/// Serializes as the integer `0` or `1`. Deserializes from a bool, a number
/// (non-zero is set) or `null` (unset).
pub(crate) mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlagValue {
        Bool(bool),
        Int(i64),
        Float(f64),
    }

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        let value = Option::<FlagValue>::deserialize(deserializer)?;
        Ok(match value {
            Some(FlagValue::Bool(b)) => b,
            Some(FlagValue::Int(n)) => n != 0,
            Some(FlagValue::Float(f)) => f != 0.0,
            None => false,
        })
    }
}
