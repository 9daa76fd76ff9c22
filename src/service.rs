//! Contact operations on top of the storage layer.
//!
//! Every call opens its own connection and closes it before returning.
//! Storage failures are logged and reported as the operation's "nothing"
//! value (`None`, `false`, or an empty list), so a caller cannot tell a
//! missing row from a broken database.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::db::Database;
use crate::models::{Contact, ContactMethod, NewContact, NewContactMethod};
use crate::spreadsheet::{self, RowSkip, SpreadsheetError};

/// Outcome of a spreadsheet import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Contacts created.
    pub imported: usize,
    /// Rows that produced no contact (blank, missing fields, or rejected by storage).
    pub skipped: usize,
    /// Contact methods created for the imported contacts.
    pub methods: usize,
}

#[derive(Debug, Clone)]
pub struct ContactService {
    db_path: PathBuf,
}

impl ContactService {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Open a session, run `op`, and log any failure.
    fn run<T>(&self, action: &'static str, op: impl FnOnce(&Database) -> Result<T>) -> Option<T> {
        match Database::open_at(&self.db_path).and_then(|db| op(&db)) {
            Ok(value) => Some(value),
            Err(e) => {
                let error = format!("{:#}", e);
                tracing::error!(action, %error, "Storage operation failed");
                None
            }
        }
    }

    // ==================== CONTACTS ====================

    pub fn list_all(&self) -> Vec<Contact> {
        self.run("list contacts", |db| db.list_contacts())
            .unwrap_or_default()
    }

    pub fn list_favorites(&self) -> Vec<Contact> {
        self.run("list favorites", |db| db.list_favorite_contacts())
            .unwrap_or_default()
    }

    pub fn get(&self, id: i64) -> Option<Contact> {
        self.run("get contact", |db| db.get_contact(id)).flatten()
    }

    /// Create a contact and then each of its nested methods.
    pub fn create(&self, contact: &NewContact) -> Option<Contact> {
        self.create_with_methods(contact).map(|(created, _)| created)
    }

    /// Like [`create`](Self::create), also returning how many nested methods
    /// were stored. A failed method does not undo the contact.
    fn create_with_methods(&self, contact: &NewContact) -> Option<(Contact, usize)> {
        let id = self.run("create contact", |db| db.insert_contact(contact))?;

        let mut stored = 0;
        for method in &contact.methods {
            if self.create_method(id, method).is_some() {
                stored += 1;
            } else {
                tracing::warn!(contact_id = id, method_type = %method.method_type, "Nested method not stored");
            }
        }

        self.get(id).map(|created| (created, stored))
    }

    /// Full replace of the mutable fields. `None` when the contact is absent.
    pub fn update(&self, id: i64, contact: &NewContact) -> Option<Contact> {
        self.run("update contact", |db| {
            db.update_contact(id, contact)?;
            db.get_contact(id)
        })
        .flatten()
    }

    pub fn delete(&self, id: i64) -> bool {
        self.run("delete contact", |db| db.delete_contact(id))
            .unwrap_or(false)
    }

    pub fn toggle_favorite(&self, id: i64) -> Option<Contact> {
        self.run("toggle favorite", |db| {
            if !db.toggle_favorite(id)? {
                return Ok(None);
            }
            db.get_contact(id)
        })
        .flatten()
    }

    // ==================== METHODS ====================

    pub fn list_methods(&self, contact_id: i64) -> Vec<ContactMethod> {
        self.run("list methods", |db| db.get_methods_for_contact(contact_id))
            .unwrap_or_default()
    }

    /// `None` when the contact does not exist or storage fails.
    pub fn create_method(&self, contact_id: i64, method: &NewContactMethod) -> Option<ContactMethod> {
        self.run("create method", |db| {
            let id = db.insert_method(contact_id, method)?;
            db.get_method(id)
        })
        .flatten()
    }

    pub fn update_method(&self, method_id: i64, method: &NewContactMethod) -> Option<ContactMethod> {
        self.run("update method", |db| {
            let Some(contact_id) = db.get_method_owner(method_id)? else {
                return Ok(None);
            };
            db.update_method(method_id, contact_id, method)?;
            db.get_method(method_id)
        })
        .flatten()
    }

    pub fn delete_method(&self, method_id: i64) -> bool {
        self.run("delete method", |db| db.delete_method(method_id))
            .unwrap_or(false)
    }

    // ==================== SPREADSHEET ====================

    /// Every contact with its methods as an `.xlsx` file.
    pub fn export_workbook(&self) -> Result<Vec<u8>, SpreadsheetError> {
        let records: Vec<(Contact, Vec<ContactMethod>)> = self
            .list_all()
            .into_iter()
            .map(|contact| {
                let methods = self.list_methods(contact.id);
                (contact, methods)
            })
            .collect();

        let bytes = spreadsheet::write_contacts(&records)?;
        tracing::info!(contacts = records.len(), bytes = bytes.len(), "Exported contacts");
        Ok(bytes)
    }

    /// Create a contact for every usable row. Bad rows are skipped; only a
    /// workbook that cannot be read at all is an error.
    pub fn import_workbook(&self, bytes: &[u8]) -> Result<ImportSummary, SpreadsheetError> {
        let rows = spreadsheet::read_rows(bytes)?;
        let mut summary = ImportSummary::default();

        for (idx, cells) in rows.iter().enumerate() {
            let line = idx + 2; // 1-indexed, after the header
            let contact = match spreadsheet::parse_row(cells) {
                Ok(contact) => contact,
                Err(RowSkip::Blank) => {
                    tracing::debug!(line, "Skipping blank row");
                    summary.skipped += 1;
                    continue;
                }
                Err(RowSkip::MissingFields) => {
                    tracing::debug!(line, "Skipping row without name or phone");
                    summary.skipped += 1;
                    continue;
                }
            };

            match self.create_with_methods(&contact) {
                Some((_, methods)) => {
                    summary.imported += 1;
                    summary.methods += methods;
                }
                None => summary.skipped += 1,
            }
        }

        tracing::info!(
            imported = summary.imported,
            skipped = summary.skipped,
            methods = summary.methods,
            "Imported contacts"
        );
        Ok(summary)
    }
}
