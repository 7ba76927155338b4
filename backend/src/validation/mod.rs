//! Validation of library CSV files.
//!
//! Three independent checks, each a pure function over a [`Table`]:
//!
//! - [`check_headers`] - positional comparison against the expected schema
//! - [`check_nulls`] - columns containing missing values
//! - [`check_identifiers`] - FSCS ids that do not match the identifier pattern
//!
//! [`validate_file`] chains them after the file checks. Each check stops the
//! whole pipeline on failure, so a failing file produces findings of a single
//! kind. Nothing is sent to the data store unless validation passes.
//!
//! # Example
//!
//! ```rust,ignore
//! use libadmin::logs::Diagnostics;
//! use libadmin::validation::{validate_file, ValidationPolicy, Verdict};
//! use std::path::Path;
//!
//! let diag = Diagnostics::standard("check.log")?;
//! let result = validate_file(Path::new("libraries.csv"), &ValidationPolicy::default(), &diag);
//! let verdict = Verdict::from(&result);
//! std::process::exit(verdict.exit_code());
//! ```

pub mod completeness;
pub mod identifier;
pub mod schema;

use std::path::Path;

use crate::error::{ValidationError, ValidationResult};
use crate::logs::Diagnostics;
use crate::models::{Diagnostic, Table, EXPECTED_HEADERS, FSCS_ID};
use crate::parser::read_csv_file;

pub use completeness::check_nulls;
pub use identifier::{check_identifiers, IdentifierPattern, PREFIX_PATTERN, STRICT_PATTERN};
pub use schema::check_headers;

/// Required file name suffix.
pub const CSV_EXTENSION: &str = ".csv";

/// Order of the in-memory checks. File checks always run first and the
/// identifier check always runs last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckOrder {
    /// Completeness, then headers.
    #[default]
    NullsFirst,
    /// Headers, then completeness.
    HeadersFirst,
}

/// What a valid file looks like.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    /// Column names, in order.
    pub expected_headers: Vec<String>,
    /// Column checked against `identifier_pattern`.
    pub identifier_column: String,
    pub identifier_pattern: IdentifierPattern,
    pub check_order: CheckOrder,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            expected_headers: EXPECTED_HEADERS.iter().map(|h| h.to_string()).collect(),
            identifier_column: FSCS_ID.to_string(),
            identifier_pattern: IdentifierPattern::default(),
            check_order: CheckOrder::default(),
        }
    }
}

impl ValidationPolicy {
    /// Same policy with an extra trailing column (e.g. the credential column).
    pub fn with_extra_column(mut self, column: impl Into<String>) -> Self {
        self.expected_headers.push(column.into());
        self
    }

    pub fn with_identifier_pattern(mut self, pattern: IdentifierPattern) -> Self {
        self.identifier_pattern = pattern;
        self
    }

    pub fn with_check_order(mut self, order: CheckOrder) -> Self {
        self.check_order = order;
        self
    }
}

/// Pass/fail outcome of a validation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Fail,
}

impl Verdict {
    /// Process exit code: `0` on success, `-1` on failure.
    pub fn exit_code(self) -> i32 {
        match self {
            Verdict::Ok => 0,
            Verdict::Fail => -1,
        }
    }
}

impl<T, E> From<&Result<T, E>> for Verdict {
    fn from(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            Verdict::Ok
        } else {
            Verdict::Fail
        }
    }
}

impl ValidationError {
    /// Findings carried by this error, as report entries.
    ///
    /// Never empty: an empty report only ever comes from a passing file.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        match self {
            ValidationError::FileNotFound(path) => vec![Diagnostic::FileNotFound {
                path: path.display().to_string(),
            }],
            ValidationError::WrongExtension(path) => vec![Diagnostic::WrongExtension {
                path: path.display().to_string(),
            }],
            ValidationError::Csv(e) => vec![Diagnostic::Unreadable {
                message: e.to_string(),
            }],
            ValidationError::SchemaCountMismatch { expected, actual } => {
                vec![Diagnostic::ColumnCount {
                    expected: *expected,
                    actual: *actual,
                }]
            }
            ValidationError::SchemaFieldMismatch(mismatches) => {
                mismatches.iter().cloned().map(Diagnostic::from).collect()
            }
            ValidationError::MissingData(columns) => columns
                .iter()
                .map(|c| Diagnostic::NullFound { column: c.clone() })
                .collect(),
            ValidationError::MissingIdentifierColumn(column) => vec![Diagnostic::MissingColumn {
                column: column.clone(),
            }],
            ValidationError::InvalidIdentifier(values) => values
                .iter()
                .map(|v| Diagnostic::BadIdentifier { value: v.clone() })
                .collect(),
        }
    }
}

/// Existence and extension checks, in that order.
pub fn check_file(path: &Path) -> ValidationResult<()> {
    if !path.is_file() {
        return Err(ValidationError::FileNotFound(path.to_path_buf()));
    }
    if !path.to_string_lossy().ends_with(CSV_EXTENSION) {
        return Err(ValidationError::WrongExtension(path.to_path_buf()));
    }
    Ok(())
}

/// File checks, then parse. Failures are logged to `diag`.
pub fn read_checked(path: &Path, diag: &Diagnostics) -> ValidationResult<Table> {
    diag.info(format!("Checking {}", path.display()));

    let parsed = check_file(path)
        .and_then(|()| Ok(read_csv_file(path)?))
        .map_err(|e| {
            report_failure(&e, diag);
            e
        })?;
    diag.debug(format!(
        "Read {} rows ({}, delimiter '{}')",
        parsed.table.len(),
        parsed.encoding,
        parsed.delimiter.escape_default()
    ));
    Ok(parsed.table)
}

/// Run every check on a file and return the parsed table when it passes.
///
/// All findings are logged to `diag` before the error is returned.
pub fn validate_file(
    path: impl AsRef<Path>,
    policy: &ValidationPolicy,
    diag: &Diagnostics,
) -> ValidationResult<Table> {
    let table = read_checked(path.as_ref(), diag)?;
    validate_table(&table, policy, diag)?;
    Ok(table)
}

/// The in-memory checks, in the order set by the policy.
pub fn validate_table(
    table: &Table,
    policy: &ValidationPolicy,
    diag: &Diagnostics,
) -> ValidationResult<()> {
    let result = match policy.check_order {
        CheckOrder::NullsFirst => {
            require_complete(table).and_then(|()| require_headers(table, policy))
        }
        CheckOrder::HeadersFirst => {
            require_headers(table, policy).and_then(|()| require_complete(table))
        }
    }
    .and_then(|()| require_identifiers(table, policy));

    match &result {
        Ok(()) => diag.success(format!("All checks passed ({} rows)", table.len())),
        Err(err) => report_failure(err, diag),
    }
    result
}

fn require_complete(table: &Table) -> ValidationResult<()> {
    let columns = check_nulls(table);
    if columns.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::MissingData(columns))
    }
}

fn require_headers(table: &Table, policy: &ValidationPolicy) -> ValidationResult<()> {
    match check_headers(table, &policy.expected_headers) {
        Err(count) => Err(ValidationError::SchemaCountMismatch {
            expected: count.expected,
            actual: count.actual,
        }),
        Ok(mismatches) if mismatches.is_empty() => Ok(()),
        Ok(mismatches) => Err(ValidationError::SchemaFieldMismatch(mismatches)),
    }
}

fn require_identifiers(table: &Table, policy: &ValidationPolicy) -> ValidationResult<()> {
    if table.column_index(&policy.identifier_column).is_none() {
        return Err(ValidationError::MissingIdentifierColumn(
            policy.identifier_column.clone(),
        ));
    }
    let bad = check_identifiers(table, &policy.identifier_column, &policy.identifier_pattern);
    if bad.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::InvalidIdentifier(bad))
    }
}

fn report_failure(err: &ValidationError, diag: &Diagnostics) {
    let findings = err.diagnostics();
    for finding in &findings {
        diag.error(finding.to_string());
    }
    if findings.len() > 1 {
        diag.error(format!("{} problem(s) found", findings.len()));
    }
}
