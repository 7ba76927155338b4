//! Domain models for the library administration pipeline.
//!
//! - [`Value`] - A scalar cell (text, integer or null)
//! - [`Table`] - Ordered rows sharing one column schema
//! - [`RecordRef`] - Borrowed view of one row as a column → value mapping
//! - [`Diagnostic`] - One validation finding
//! - [`HeaderMismatch`] / [`CountMismatch`] - Header check results

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Identifier column of a library record.
pub const FSCS_ID: &str = "fscs_id";

/// Column holding the generated credential.
pub const API_KEY: &str = "api_key";

/// Legacy name of the credential column.
pub const PASSPHRASE: &str = "passphrase";

/// Columns every library CSV must carry, in order.
pub const EXPECTED_HEADERS: [&str; 4] = [FSCS_ID, "name", "address", "tag"];

// =============================================================================
// Cell Values
// =============================================================================

/// A single cell of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Text(String),
    Null,
}

impl Value {
    /// Interpret a raw CSV cell.
    ///
    /// Blank cells are null. A cell is an integer only if it prints back
    /// identically, so zero-padded codes like `04240` stay text.
    pub fn from_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }
        match trimmed.parse::<i64>() {
            Ok(n) if n.to_string() == trimmed => Value::Integer(n),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text form used in CSV output, filters and diagnostics. Null is empty.
    pub fn as_cell(&self) -> String {
        match self {
            Value::Integer(n) => n.to_string(),
            Value::Text(s) => s.clone(),
            Value::Null => String::new(),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Integer(n) => JsonValue::from(*n),
            Value::Text(s) => JsonValue::from(s.as_str()),
            Value::Null => JsonValue::Null,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_cell())
    }
}

// =============================================================================
// Table
// =============================================================================

/// Ordered rows sharing one column schema.
///
/// Columns are stored once; each row holds exactly one value per column, in
/// column order. Stages of the pipeline build new tables instead of mutating.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from column names and rows.
    ///
    /// Short rows are padded with nulls and long rows are truncated, so the
    /// shared-schema invariant always holds.
    pub fn from_rows<C, R>(columns: C, rows: R) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        R: IntoIterator<Item = Vec<Value>>,
    {
        let mut table = Self::new(columns.into_iter().map(Into::into).collect());
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub(crate) fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Iterate rows as column → value records.
    pub fn records(&self) -> impl Iterator<Item = RecordRef<'_>> {
        self.rows.iter().map(move |values| RecordRef {
            columns: &self.columns,
            values,
        })
    }

    /// Values of one column, top to bottom. `None` if the column is absent.
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// New table with `name` appended and one value per row from `fill`.
    pub fn with_column<F>(&self, name: impl Into<String>, mut fill: F) -> Table
    where
        F: FnMut(RecordRef<'_>) -> Value,
    {
        let mut columns = self.columns.clone();
        columns.push(name.into());
        let rows = self
            .records()
            .map(|record| {
                let mut row = record.values.to_vec();
                row.push(fill(record));
                row
            })
            .collect();
        Table { columns, rows }
    }

    /// New table with column `from` renamed to `to`. Unchanged if `from` is absent.
    pub fn with_renamed_column(&self, from: &str, to: &str) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| if c == from { to.to_string() } else { c.clone() })
            .collect();
        Table {
            columns,
            rows: self.rows.clone(),
        }
    }
}

/// Borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct RecordRef<'a> {
    columns: &'a [String],
    values: &'a [Value],
}

impl<'a> RecordRef<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// JSON object sent to the data store.
    pub fn to_json(&self) -> JsonValue {
        let map: Map<String, JsonValue> = self
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect();
        JsonValue::Object(map)
    }
}

// =============================================================================
// Validation Diagnostics
// =============================================================================

/// A header that differs from the expected one at the same position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMismatch {
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for HeaderMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected header '{}', found '{}'", self.expected, self.actual)
    }
}

/// The table does not have as many columns as the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountMismatch {
    pub expected: usize,
    pub actual: usize,
}

/// One finding of the validation pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Diagnostic {
    FileNotFound { path: String },
    WrongExtension { path: String },
    /// The file could not be decoded or parsed.
    Unreadable { message: String },
    ColumnCount { expected: usize, actual: usize },
    HeaderMismatch { expected: String, actual: String },
    NullFound { column: String },
    /// The column checked for identifiers is absent.
    MissingColumn { column: String },
    BadIdentifier { value: String },
}

impl From<HeaderMismatch> for Diagnostic {
    fn from(m: HeaderMismatch) -> Self {
        Diagnostic::HeaderMismatch {
            expected: m.expected,
            actual: m.actual,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::FileNotFound { path } => write!(f, "File '{}' does not exist", path),
            Diagnostic::WrongExtension { path } => write!(f, "'{}' does not end with .csv", path),
            Diagnostic::Unreadable { message } => write!(f, "Cannot read CSV: {}", message),
            Diagnostic::ColumnCount { expected, actual } => {
                write!(f, "Expected {} columns, found {}", expected, actual)
            }
            Diagnostic::MissingColumn { column } => {
                write!(f, "Identifier column '{}' not found", column)
            }
            Diagnostic::HeaderMismatch { expected, actual } => {
                write!(f, "Expected header '{}', found '{}'", expected, actual)
            }
            Diagnostic::NullFound { column } => {
                write!(f, "Column '{}' has missing values", column)
            }
            Diagnostic::BadIdentifier { value } => {
                write!(f, "'{}' is not a valid FSCS id", value)
            }
        }
    }
}
