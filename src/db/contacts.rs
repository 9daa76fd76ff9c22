use anyhow::Result;
use rusqlite::{params, OptionalExtension, Row};

use super::Database;
use crate::models::{Contact, ContactMethod, NewContact, NewContactMethod};

const CONTACT_COLUMNS: &str = "id, name, phone, email, address, is_favorite";
const METHOD_COLUMNS: &str = "id, contact_id, method_type, method_value, is_primary";

impl Database {
    // ==================== CONTACT CREATE ====================

    /// Insert a contact row and return its new id. Nested methods are not
    /// written here.
    pub fn insert_contact(&self, contact: &NewContact) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO contacts (name, phone, email, address, is_favorite)
             VALUES (?, ?, ?, ?, ?)",
            params![
                contact.name,
                contact.phone,
                contact.email,
                contact.address,
                contact.is_favorite as i32,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    // ==================== CONTACT READ ====================

    pub fn get_contact(&self, id: i64) -> Result<Option<Contact>> {
        let contact = self
            .conn
            .query_row(
                &format!("SELECT {} FROM contacts WHERE id = ?", CONTACT_COLUMNS),
                [id],
                Self::row_to_contact,
            )
            .optional()?;
        Ok(contact)
    }

    /// All contacts in storage scan order.
    pub fn list_contacts(&self) -> Result<Vec<Contact>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM contacts", CONTACT_COLUMNS))?;

        let contacts = stmt
            .query_map([], Self::row_to_contact)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(contacts)
    }

    pub fn list_favorite_contacts(&self) -> Result<Vec<Contact>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM contacts WHERE is_favorite = 1",
            CONTACT_COLUMNS
        ))?;

        let contacts = stmt
            .query_map([], Self::row_to_contact)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(contacts)
    }

    pub fn count_contacts(&self) -> Result<u32> {
        let count: u32 = self
            .conn
            .query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))?;
        Ok(count)
    }

    // ==================== CONTACT UPDATE ====================

    /// Replace the five mutable fields. Returns false when no row matched.
    pub fn update_contact(&self, id: i64, contact: &NewContact) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE contacts SET name = ?, phone = ?, email = ?, address = ?, is_favorite = ?
             WHERE id = ?",
            params![
                contact.name,
                contact.phone,
                contact.email,
                contact.address,
                contact.is_favorite as i32,
                id,
            ],
        )?;
        Ok(rows > 0)
    }

    /// Flip the favorite flag in place. Returns false when no row matched.
    pub fn toggle_favorite(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE contacts
             SET is_favorite = CASE WHEN COALESCE(is_favorite, 0) = 0 THEN 1 ELSE 0 END
             WHERE id = ?",
            [id],
        )?;
        Ok(rows > 0)
    }

    // ==================== CONTACT DELETE ====================

    /// Delete a contact. Its methods go with it via the cascading foreign key.
    pub fn delete_contact(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM contacts WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    // ==================== METHOD CRUD ====================

    /// Insert a method and return its id. A primary method demotes every
    /// sibling in the same transaction.
    pub fn insert_method(&self, contact_id: i64, method: &NewContactMethod) -> Result<i64> {
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "INSERT INTO contact_methods (contact_id, method_type, method_value, is_primary)
             VALUES (?, ?, ?, ?)",
            params![
                contact_id,
                method.method_type,
                method.method_value,
                method.is_primary as i32,
            ],
        )?;
        let id = tx.last_insert_rowid();

        if method.is_primary {
            Self::demote_siblings(&tx, contact_id, id)?;
        }

        tx.commit()?;
        Ok(id)
    }

    pub fn get_method(&self, id: i64) -> Result<Option<ContactMethod>> {
        let method = self
            .conn
            .query_row(
                &format!("SELECT {} FROM contact_methods WHERE id = ?", METHOD_COLUMNS),
                [id],
                Self::row_to_method,
            )
            .optional()?;
        Ok(method)
    }

    pub fn get_methods_for_contact(&self, contact_id: i64) -> Result<Vec<ContactMethod>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM contact_methods WHERE contact_id = ?",
            METHOD_COLUMNS
        ))?;

        let methods = stmt
            .query_map([contact_id], Self::row_to_method)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(methods)
    }

    /// The contact a method belongs to, if the method exists.
    pub fn get_method_owner(&self, id: i64) -> Result<Option<i64>> {
        let owner = self
            .conn
            .query_row(
                "SELECT contact_id FROM contact_methods WHERE id = ?",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(owner)
    }

    /// Update a method owned by `contact_id`. Returns false when no row matched.
    pub fn update_method(
        &self,
        id: i64,
        contact_id: i64,
        method: &NewContactMethod,
    ) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;

        let rows = tx.execute(
            "UPDATE contact_methods SET method_type = ?, method_value = ?, is_primary = ?
             WHERE id = ?",
            params![
                method.method_type,
                method.method_value,
                method.is_primary as i32,
                id,
            ],
        )?;

        if rows > 0 && method.is_primary {
            Self::demote_siblings(&tx, contact_id, id)?;
        }

        tx.commit()?;
        Ok(rows > 0)
    }

    pub fn delete_method(&self, id: i64) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM contact_methods WHERE id = ?", [id])?;
        Ok(rows > 0)
    }

    fn demote_siblings(conn: &rusqlite::Connection, contact_id: i64, keep: i64) -> Result<usize> {
        let rows = conn.execute(
            "UPDATE contact_methods SET is_primary = 0 WHERE contact_id = ? AND id != ?",
            [contact_id, keep],
        )?;
        Ok(rows)
    }

    // ==================== ROW MAPPING ====================

    fn row_to_contact(row: &Row) -> rusqlite::Result<Contact> {
        Ok(Contact {
            id: row.get("id")?,
            name: row.get("name")?,
            phone: row.get("phone")?,
            email: row.get::<_, Option<String>>("email")?.unwrap_or_default(),
            address: row.get::<_, Option<String>>("address")?.unwrap_or_default(),
            is_favorite: row.get::<_, Option<i64>>("is_favorite")?.unwrap_or(0) != 0,
        })
    }

    fn row_to_method(row: &Row) -> rusqlite::Result<ContactMethod> {
        Ok(ContactMethod {
            id: row.get("id")?,
            contact_id: row.get("contact_id")?,
            method_type: row.get("method_type")?,
            method_value: row.get("method_value")?,
            is_primary: row.get::<_, Option<i64>>("is_primary")?.unwrap_or(0) != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(db: &Database, name: &str) -> i64 {
        db.insert_contact(&NewContact::new(name, "555-0100")).unwrap()
    }

    fn primaries(db: &Database, contact_id: i64) -> Vec<i64> {
        db.get_methods_for_contact(contact_id)
            .unwrap()
            .into_iter()
            .filter(|m| m.is_primary)
            .map(|m| m.id)
            .collect()
    }

    #[test]
    fn test_insert_and_get_contact() {
        let db = Database::open_memory().unwrap();

        let id = db
            .insert_contact(
                &NewContact::new("John", "123")
                    .with_email("john@example.com")
                    .favorite(true),
            )
            .unwrap();

        let contact = db.get_contact(id).unwrap().unwrap();
        assert_eq!(contact.name, "John");
        assert_eq!(contact.email, "john@example.com");
        assert_eq!(contact.address, "");
        assert!(contact.is_favorite);
    }

    #[test]
    fn test_get_missing_contact() {
        let db = Database::open_memory().unwrap();
        assert!(db.get_contact(42).unwrap().is_none());
    }

    #[test]
    fn test_list_and_favorites() {
        let db = Database::open_memory().unwrap();

        for i in 0..4 {
            db.insert_contact(&NewContact::new(format!("Person{}", i), "1").favorite(i % 2 == 0))
                .unwrap();
        }

        assert_eq!(db.list_contacts().unwrap().len(), 4);
        assert_eq!(db.count_contacts().unwrap(), 4);

        let favorites = db.list_favorite_contacts().unwrap();
        assert_eq!(favorites.len(), 2);
        assert!(favorites.iter().all(|c| c.is_favorite));
    }

    #[test]
    fn test_update_contact() {
        let db = Database::open_memory().unwrap();
        let id = seed(&db, "Before");

        let replaced = NewContact::new("After", "999").with_address("Main St");
        assert!(db.update_contact(id, &replaced).unwrap());

        let contact = db.get_contact(id).unwrap().unwrap();
        assert_eq!(contact.name, "After");
        assert_eq!(contact.phone, "999");
        assert_eq!(contact.address, "Main St");

        assert!(!db.update_contact(id + 100, &replaced).unwrap());
    }

    #[test]
    fn test_toggle_favorite() {
        let db = Database::open_memory().unwrap();
        let id = seed(&db, "Fav");

        assert!(db.toggle_favorite(id).unwrap());
        assert!(db.get_contact(id).unwrap().unwrap().is_favorite);
        assert!(db.toggle_favorite(id).unwrap());
        assert!(!db.get_contact(id).unwrap().unwrap().is_favorite);

        assert!(!db.toggle_favorite(id + 1).unwrap());
    }

    #[test]
    fn test_ids_not_reused() {
        let db = Database::open_memory().unwrap();
        let first = seed(&db, "First");
        assert!(db.delete_contact(first).unwrap());

        let second = seed(&db, "Second");
        assert!(second > first);
    }

    #[test]
    fn test_cascade_delete() {
        let db = Database::open_memory().unwrap();
        let id = seed(&db, "Cascade");

        db.insert_method(id, &NewContactMethod::new("email", "a@example.com"))
            .unwrap();
        db.insert_method(id, &NewContactMethod::new("wechat", "cascade"))
            .unwrap();
        assert_eq!(db.get_methods_for_contact(id).unwrap().len(), 2);

        assert!(db.delete_contact(id).unwrap());
        assert!(db.get_methods_for_contact(id).unwrap().is_empty());
        assert!(!db.delete_contact(id).unwrap());
    }

    #[test]
    fn test_method_requires_existing_contact() {
        let db = Database::open_memory().unwrap();
        let result = db.insert_method(404, &NewContactMethod::new("qq", "1"));
        assert!(result.is_err());
        assert!(db.get_methods_for_contact(404).unwrap().is_empty());
    }

    #[test]
    fn test_primary_exclusive_on_insert() {
        let db = Database::open_memory().unwrap();
        let id = seed(&db, "Primary");

        let first = db
            .insert_method(id, &NewContactMethod::new("wechat", "abc").primary())
            .unwrap();
        assert_eq!(primaries(&db, id), vec![first]);

        let second = db
            .insert_method(id, &NewContactMethod::new("qq", "123").primary())
            .unwrap();
        assert_eq!(primaries(&db, id), vec![second]);

        // Non-primary insert leaves the current primary alone
        db.insert_method(id, &NewContactMethod::new("email", "x@y.z"))
            .unwrap();
        assert_eq!(primaries(&db, id), vec![second]);
    }

    #[test]
    fn test_primary_scoped_to_contact() {
        let db = Database::open_memory().unwrap();
        let a = seed(&db, "A");
        let b = seed(&db, "B");

        let ma = db
            .insert_method(a, &NewContactMethod::new("email", "a@x").primary())
            .unwrap();
        let mb = db
            .insert_method(b, &NewContactMethod::new("email", "b@x").primary())
            .unwrap();

        assert_eq!(primaries(&db, a), vec![ma]);
        assert_eq!(primaries(&db, b), vec![mb]);
    }

    #[test]
    fn test_update_method_demotes_siblings() {
        let db = Database::open_memory().unwrap();
        let id = seed(&db, "Update");

        let first = db
            .insert_method(id, &NewContactMethod::new("wechat", "abc").primary())
            .unwrap();
        let second = db
            .insert_method(id, &NewContactMethod::new("qq", "123"))
            .unwrap();

        let owner = db.get_method_owner(second).unwrap().unwrap();
        assert_eq!(owner, id);

        assert!(db
            .update_method(second, owner, &NewContactMethod::new("qq", "456").primary())
            .unwrap());
        assert_eq!(primaries(&db, id), vec![second]);

        let updated = db.get_method(second).unwrap().unwrap();
        assert_eq!(updated.method_value, "456");
        assert!(!db.get_method(first).unwrap().unwrap().is_primary);
    }

    #[test]
    fn test_update_missing_method() {
        let db = Database::open_memory().unwrap();
        let id = seed(&db, "Nobody");
        assert!(db.get_method_owner(77).unwrap().is_none());
        assert!(!db
            .update_method(77, id, &NewContactMethod::new("qq", "1"))
            .unwrap());
    }

    #[test]
    fn test_delete_method() {
        let db = Database::open_memory().unwrap();
        let id = seed(&db, "Delete");
        let method = db
            .insert_method(id, &NewContactMethod::new("email", "d@x"))
            .unwrap();

        assert!(db.delete_method(method).unwrap());
        assert!(!db.delete_method(method).unwrap());
        assert!(db.get_method(method).unwrap().is_none());
    }
}
