use serde::{Deserialize, Serialize};

use super::{flag, NewContactMethod};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: i64,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(with = "flag", default)]
    pub is_favorite: bool,
}

/// Validated fields for creating or fully replacing a contact.
///
/// `methods` is only honored on create; an update never touches methods.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub is_favorite: bool,
    pub methods: Vec<NewContactMethod>,
}

impl NewContact {
    pub fn new(name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            ..Self::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = email.into();
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }

    pub fn with_method(mut self, method: NewContactMethod) -> Self {
        self.methods.push(method);
        self
    }
}
