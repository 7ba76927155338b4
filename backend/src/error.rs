//! Error types for the library administration toolchain.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`CsvError`] - CSV reading and writing errors
//! - [`ValidationError`] - Validation pipeline failures (one variant per check)
//! - [`StoreError`] - Remote data store (PostgREST) failures
//! - [`ConfigError`] - Missing or malformed configuration
//! - [`LetterError`] - Letter rendering and PDF conversion errors
//! - [`AdminError`] - Top-level command errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;
use thiserror::Error;

use crate::models::HeaderMismatch;
use crate::reconcile::ReconcileError;

// =============================================================================
// CSV Errors
// =============================================================================

/// Errors while reading or writing CSV files.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read or write a file.
    #[error("Failed to access file: {0}")]
    IoError(#[from] std::io::Error),

    /// Content could not be decoded.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Invalid CSV format.
    #[error("Line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Header row is blank.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// Failed to serialize rows.
    #[error("Failed to write CSV: {0}")]
    WriteError(String),
}

impl From<csv::Error> for CsvError {
    fn from(err: csv::Error) -> Self {
        let line = err
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(0);
        CsvError::ParseError {
            line,
            message: err.to_string(),
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Reasons the validation pipeline rejects an input file.
///
/// Every variant is terminal for the current run and is raised before any
/// remote call is made.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("File '{}' does not exist", .0.display())]
    FileNotFound(PathBuf),

    #[error("'{}' does not end with .csv", .0.display())]
    WrongExtension(PathBuf),

    #[error("Expected {expected} columns, found {actual}")]
    SchemaCountMismatch { expected: usize, actual: usize },

    #[error("Header mismatch: {}", format_mismatches(.0))]
    SchemaFieldMismatch(Vec<HeaderMismatch>),

    #[error("Missing data in column(s): {}", .0.join(", "))]
    MissingData(Vec<String>),

    #[error("Identifier column '{0}' not found")]
    MissingIdentifierColumn(String),

    #[error("Invalid identifier(s): {}", .0.join(", "))]
    InvalidIdentifier(Vec<String>),

    /// The file exists but could not be parsed.
    #[error("Cannot read CSV: {0}")]
    Csv(#[from] CsvError),
}

fn format_mismatches(mismatches: &[HeaderMismatch]) -> String {
    mismatches
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// =============================================================================
// Store Errors
// =============================================================================

/// Failures talking to the remote data store.
///
/// None of these are retried: they abort the remaining rows of a run.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport-level failure (connection refused, DNS, TLS...).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Login did not yield a token.
    #[error("Login failed: {0}")]
    Auth(String),

    /// Non-success HTTP status.
    #[error("Unexpected response from {endpoint} (HTTP {status}): {body}")]
    UnexpectedResponse {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// Body was not the JSON shape we expected.
    #[error("Invalid JSON from {endpoint}: {message}")]
    InvalidJson { endpoint: String, message: String },
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing {0} environment variable")]
    MissingVar(&'static str),

    #[error("Invalid port '{0}'")]
    InvalidPort(String),

    #[error("Invalid identifier pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

// =============================================================================
// Letter Errors
// =============================================================================

/// Errors while producing notification letters.
#[derive(Debug, Error)]
pub enum LetterError {
    #[error("Missing field '{0}' for letter")]
    MissingField(&'static str),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Letter IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("PDF conversion failed: {0}")]
    PdfConversion(String),
}

// =============================================================================
// Command Errors (top-level)
// =============================================================================

/// Top-level errors returned by CLI commands.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Letter error: {0}")]
    Letter(#[from] LetterError),

    /// Refusing to overwrite an existing output file.
    #[error("'{}' already exists; use --overwrite to replace it", .0.display())]
    OutputExists(PathBuf),

    /// The operator declined an interactive confirmation.
    #[error("Aborted: {0}")]
    Aborted(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl AdminError {
    /// Whether the component that raised this error has already logged it.
    ///
    /// Validation findings are logged one by one as they are found and an
    /// existing output file is logged by the writer.
    pub fn already_reported(&self) -> bool {
        matches!(self, AdminError::Validation(_) | AdminError::OutputExists(_))
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for letter operations.
pub type LetterResult<T> = Result<T, LetterError>;

/// Result type for CLI commands.
pub type AdminResult<T> = Result<T, AdminError>;
