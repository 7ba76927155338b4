//! # Libadmin - library registry administration
//!
//! Libadmin validates CSV files describing public libraries, generates an API
//! key for each one, and registers the new ones in a PostgREST-backed registry.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│  Validate   │────▶│   Enrich    │────▶│  Reconcile  │
//! │ (libraries) │     │ (4 checks)  │     │ (+api_key)  │     │ (PostgREST) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use libadmin::{upload_csv, Diagnostics, PostgrestStore, StoreConfig, UploadOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = StoreConfig::from_env().unwrap();
//!     let diag = Diagnostics::standard("check.log").unwrap();
//!     let store = PostgrestStore::new(&config, &diag);
//!     let report = upload_csv(Path::new("extended_libraries.csv"), &store, &UploadOptions::default(), &diag)
//!         .await
//!         .unwrap();
//!     println!("{} inserted", report.summary().inserted);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Table, cell values, findings
//! - [`logs`] - Run-scoped diagnostics with console, file and memory sinks
//! - [`config`] - Store connection settings
//! - [`parser`] - CSV reading with encoding and delimiter detection, CSV writing
//! - [`validation`] - File, header, completeness and identifier checks
//! - [`enrich`] - Credential generation
//! - [`store`] - Data store trait and PostgREST client
//! - [`reconcile`] - Exists-or-insert against the store
//! - [`letters`] - Notification letters (HTML + PDF)
//! - [`pipeline`] - The extend, upload, update and delete workflows

// Core modules
pub mod error;
pub mod models;
pub mod logs;
pub mod config;

// Parsing
pub mod parser;

// Validation
pub mod validation;

// Enrichment
pub mod enrich;

// Remote store
pub mod store;
pub mod reconcile;

// Output
pub mod letters;

// Workflows
pub mod pipeline;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AdminError,
    AdminResult,
    ConfigError,
    CsvError,
    LetterError,
    StoreError,
    ValidationError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    Diagnostic,
    HeaderMismatch,
    RecordRef,
    Table,
    Value,
    API_KEY,
    EXPECTED_HEADERS,
    FSCS_ID,
};

// =============================================================================
// Re-exports - Diagnostics & configuration
// =============================================================================

pub use logs::{Diagnostics, LogEntry, LogLevel, DEFAULT_LOG_FILE};
pub use config::StoreConfig;

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes_auto,
    read_csv_file,
    write_csv_file,
    ParseResult,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    check_headers,
    check_identifiers,
    check_nulls,
    validate_file,
    validate_table,
    CheckOrder,
    IdentifierPattern,
    ValidationPolicy,
    Verdict,
};

// =============================================================================
// Re-exports - Enrichment
// =============================================================================

pub use enrich::{enrich, PassphraseGenerator, TokenSource, DEFAULT_WORD_COUNT};

// =============================================================================
// Re-exports - Store & reconciliation
// =============================================================================

pub use store::{DataStore, Filter, PostgrestStore, StoreTable, LIBRARIES};
pub use reconcile::{reconcile, Outcome, ReconcileError, Summary};

// =============================================================================
// Re-exports - Letters
// =============================================================================

pub use letters::{LetterFields, LetterFiles, LetterWriter};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use pipeline::{
    delete_library,
    extend_csv,
    update_library,
    upload_csv,
    ExtendOptions,
    LibraryUpdate,
    UploadOptions,
    UploadReport,
};
