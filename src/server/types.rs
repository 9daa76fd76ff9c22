//! Response bodies that are not plain records.

use serde::Serialize;

use crate::service::ImportSummary;

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Import result: the success message plus row counts.
#[derive(Debug, Clone, Serialize)]
pub struct ImportResponse {
    pub message: String,
    #[serde(flatten)]
    pub summary: ImportSummary,
}
