//! Workbook layout shared by export and import.
//!
//! One sheet, one header row, one row per contact:
//!
//! | ID | Name | Primary Phone | Email | Address | Favorite | Other Methods |
//!
//! The favorite column holds `是`/`否` and the last column lists every method
//! except the one that repeats the contact's own phone, as `type: value`
//! pairs joined by `"; "`, or `无` when there is nothing to list.

use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use thiserror::Error;

use crate::models::{Contact, ContactMethod, NewContact, NewContactMethod};

pub const SHEET_NAME: &str = "联系人列表";

pub const HEADERS: [&str; 7] = [
    "ID",
    "姓名(Name)",
    "主要电话(Primary Phone)",
    "电子邮箱(Email)",
    "地址(Address)",
    "是否收藏(Favorite)",
    "其他联系方式(Other Methods)",
];

pub const FAVORITE_YES: &str = "是";
pub const FAVORITE_NO: &str = "否";
pub const NO_OTHER_METHODS: &str = "无";

const MAX_COLUMN_WIDTH: usize = 50;

const COL_ID: usize = 0;
const COL_NAME: usize = 1;
const COL_PHONE: usize = 2;
const COL_EMAIL: usize = 3;
const COL_ADDRESS: usize = 4;
const COL_FAVORITE: usize = 5;
const COL_OTHER: usize = 6;

#[derive(Debug, Error)]
pub enum SpreadsheetError {
    #[error("Failed to write workbook: {0}")]
    Write(#[from] XlsxError),

    #[error("Failed to read workbook: {0}")]
    Read(#[from] calamine::XlsxError),

    #[error("Workbook has no worksheet")]
    NoWorksheet,
}

/// Why an import row produced no contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSkip {
    /// Both the id and name cells are empty.
    Blank,
    /// Name or phone is empty.
    MissingFields,
}

// ==================== EXPORT ====================

/// The other-methods cell for one contact.
pub fn format_other_methods(contact: &Contact, methods: &[ContactMethod]) -> String {
    let others: Vec<String> = methods
        .iter()
        .filter(|m| !m.duplicates_phone(&contact.phone))
        .map(|m| format!("{}: {}", m.method_type, m.method_value))
        .collect();

    if others.is_empty() {
        NO_OTHER_METHODS.to_string()
    } else {
        others.join("; ")
    }
}

/// Render contacts with their methods as an `.xlsx` file in memory.
pub fn write_contacts(records: &[(Contact, Vec<ContactMethod>)]) -> Result<Vec<u8>, SpreadsheetError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    let mut widths: Vec<usize> = HEADERS.iter().map(|h| h.chars().count()).collect();
    let mut track = |col: usize, text: &str| {
        widths[col] = widths[col].max(text.chars().count());
    };

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    for (col, title) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &bold)?;
    }

    for (idx, (contact, methods)) in records.iter().enumerate() {
        let row = (idx + 1) as u32;
        let favorite = if contact.is_favorite { FAVORITE_YES } else { FAVORITE_NO };
        let other = format_other_methods(contact, methods);

        sheet.write_number(row, COL_ID as u16, contact.id as f64)?;
        track(COL_ID, &contact.id.to_string());

        let text_cells = [
            (COL_NAME, contact.name.as_str()),
            (COL_PHONE, contact.phone.as_str()),
            (COL_EMAIL, contact.email.as_str()),
            (COL_ADDRESS, contact.address.as_str()),
            (COL_FAVORITE, favorite),
            (COL_OTHER, other.as_str()),
        ];
        for (col, text) in text_cells {
            sheet.write_string(row, col as u16, text)?;
            track(col, text);
        }
    }

    for (col, width) in widths.iter().enumerate() {
        let width = (width + 2).min(MAX_COLUMN_WIDTH);
        sheet.set_column_width(col as u16, width as f64)?;
    }

    Ok(workbook.save_to_buffer()?)
}

// ==================== IMPORT ====================

/// Read every data row of the first worksheet as text cells.
/// The header row is not returned.
pub fn read_rows(bytes: &[u8]) -> Result<Vec<Vec<String>>, SpreadsheetError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(SpreadsheetError::NoWorksheet)??;

    Ok(range
        .rows()
        .skip(1)
        .map(|cells| cells.iter().map(cell_text).collect())
        .collect())
}

/// Text form of a cell. Integral numbers lose the `.0` so a phone number
/// typed as a number reads back as it was typed.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(n) => n.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => (*f as i64).to_string(),
        other => other.to_string(),
    }
}

/// Build a contact (with its non-primary other methods) from one data row.
/// The id column is ignored.
pub fn parse_row(cells: &[String]) -> Result<NewContact, RowSkip> {
    let cell = |col: usize| cells.get(col).map(String::as_str).unwrap_or("");

    if cell(COL_ID).is_empty() && cell(COL_NAME).is_empty() {
        return Err(RowSkip::Blank);
    }
    if cell(COL_NAME).is_empty() || cell(COL_PHONE).is_empty() {
        return Err(RowSkip::MissingFields);
    }

    let mut contact = NewContact::new(cell(COL_NAME), cell(COL_PHONE))
        .with_email(cell(COL_EMAIL))
        .with_address(cell(COL_ADDRESS))
        .favorite(cell(COL_FAVORITE) == FAVORITE_YES);
    contact.methods = parse_other_methods(cell(COL_OTHER));

    Ok(contact)
}

/// Parse `type: value; type: value`. Segments missing either side are
/// dropped; every method comes back non-primary.
pub fn parse_other_methods(text: &str) -> Vec<NewContactMethod> {
    if text.trim().is_empty() || text == NO_OTHER_METHODS {
        return Vec::new();
    }

    text.split(';')
        .filter_map(|segment| {
            let (method_type, method_value) = segment.split_once(':')?;
            let (method_type, method_value) = (method_type.trim(), method_value.trim());
            if method_type.is_empty() || method_value.is_empty() {
                return None;
            }
            Some(NewContactMethod::new(method_type, method_value))
        })
        .collect()
}
