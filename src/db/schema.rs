pub const SCHEMA_VERSION: i32 = 2;

/// Bookkeeping table, created before anything else so the version can be read.
pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL
);
"#;

/// V1: contacts and their methods. Safe to run against a file that already
/// has either table.
pub const SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS contacts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    phone TEXT NOT NULL,
    email TEXT,
    address TEXT,
    is_favorite INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS contact_methods (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    contact_id INTEGER NOT NULL,
    method_type TEXT NOT NULL,
    method_value TEXT NOT NULL,
    is_primary INTEGER DEFAULT 0,
    FOREIGN KEY (contact_id) REFERENCES contacts (id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_method_contact ON contact_methods(contact_id);
"#;

/// V2: favorites flag for contact tables created before it existed.
/// Only applied when the column is missing.
pub const MIGRATION_V2_FAVORITE: &str = r#"
ALTER TABLE contacts ADD COLUMN is_favorite INTEGER DEFAULT 0;
"#;
