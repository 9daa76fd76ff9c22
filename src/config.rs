//! Resolved server settings.
//!
//! Values come from command-line flags, which fall back to `CONTACTD_*`
//! environment variables (see `cli`), which fall back to the defaults here.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;

use crate::db::Database;

/// Port the web frontend expects during development.
pub const DEFAULT_BIND: &str = "127.0.0.1:5000";
pub const DEFAULT_API_PREFIX: &str = "/api";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP API.
    pub bind: SocketAddr,

    /// SQLite file. Created along with its parent directory if missing.
    pub db_path: PathBuf,

    /// Path the contact routes are mounted under. Empty mounts at the root.
    pub api_prefix: String,

    /// Largest accepted request body, which bounds spreadsheet uploads.
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Defaults with the database in the user's config directory.
    pub fn with_default_db() -> Result<Self> {
        Ok(Self::with_db(Database::default_path()?))
    }

    pub fn with_db(db_path: impl Into<PathBuf>) -> Self {
        Self {
            bind: ([127, 0, 0, 1], 5000).into(),
            db_path: db_path.into(),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// The prefix as a router path: leading slash, no trailing slash, and
    /// `None` when the routes belong at the root.
    pub fn mount_path(&self) -> Option<String> {
        let trimmed = self.api_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            None
        } else {
            Some(format!("/{}", trimmed))
        }
    }
}
