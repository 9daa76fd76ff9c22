use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};

mod contacts;
mod schema;

pub use schema::SCHEMA_VERSION;

/// One SQLite connection. Callers open a `Database` per operation and drop it
/// when done; nothing is pooled.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Default location: `<config dir>/contactd/contacts.db`.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join("contactd").join("contacts.db"))
    }

    /// Open database, creating if needed, running migrations
    pub fn open_at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// Open in-memory database for testing
    pub fn open_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn schema_version(&self) -> Result<i32> {
        let version = self
            .conn
            .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(version.unwrap_or(0))
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(schema::SCHEMA_VERSION_TABLE)?;
        let version = self.schema_version()?;

        if version < 1 {
            self.conn
                .execute_batch(&format!("BEGIN TRANSACTION; {} COMMIT;", schema::SCHEMA_V1))
                .context("Failed to create contact tables")?;
        }

        if version < 2 && !self.has_column("contacts", "is_favorite")? {
            tracing::info!("Adding is_favorite column to contacts");
            self.conn
                .execute_batch(schema::MIGRATION_V2_FAVORITE)
                .context("Failed to add is_favorite column")?;
        }

        if version < SCHEMA_VERSION {
            self.conn.execute(
                "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
                [SCHEMA_VERSION],
            )?;
            tracing::debug!(from = version, to = SCHEMA_VERSION, "Database migrated");
        }

        Ok(())
    }

    fn has_column(&self, table: &str, column: &str) -> Result<bool> {
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({})", table))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>("name"))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns.iter().any(|c| c == column))
    }
}
