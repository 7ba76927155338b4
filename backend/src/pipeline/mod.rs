//! High-level workflows behind the CLI commands.
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV file   │────▶│  Validate   │────▶│   Enrich    │────▶│  Reconcile  │──▶ letters
//! │ (libraries) │     │ (4 checks)  │     │ (+api_key)  │     │ (PostgREST) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! `extend` stops after writing the enriched CSV; `upload` starts from it.
//! Both validate before doing anything else, so nothing reaches the store
//! from a file that fails a check.

use serde_json::{json, Map, Value as JsonValue};
use std::path::{Path, PathBuf};

use crate::enrich::{enrich, extended_path, write_extended, TokenSource};
use crate::error::AdminResult;
use crate::letters::{LetterFields, LetterFiles, LetterWriter};
use crate::logs::Diagnostics;
use crate::models::{Table, API_KEY, FSCS_ID, PASSPHRASE};
use crate::reconcile::{reconcile, Outcome, ReconcileError, Summary};
use crate::store::{DataStore, PostgrestStore, LIBRARIES};
use crate::validation::{read_checked, validate_file, validate_table, ValidationPolicy};

// =============================================================================
// extend
// =============================================================================

/// Options for [`extend_csv`].
#[derive(Debug, Clone)]
pub struct ExtendOptions {
    pub policy: ValidationPolicy,
    /// Name of the generated credential column.
    pub column: String,
    /// Replace an existing `extended_` file.
    pub overwrite: bool,
}

impl Default for ExtendOptions {
    fn default() -> Self {
        Self {
            policy: ValidationPolicy::default(),
            column: API_KEY.to_string(),
            overwrite: false,
        }
    }
}

/// Validate `input`, add a credential column and write `extended_<input>`.
///
/// Returns the path written.
pub fn extend_csv(
    input: &Path,
    options: &ExtendOptions,
    source: &mut impl TokenSource,
    diag: &Diagnostics,
) -> AdminResult<PathBuf> {
    let table = validate_file(input, &options.policy, diag)?;

    let extended = enrich(&table, &options.column, source);
    diag.info(format!(
        "Generated {} credential(s) in column '{}'",
        extended.len(),
        options.column
    ));

    let output = extended_path(input);
    write_extended(&extended, &output, options.overwrite, diag)?;
    Ok(output)
}

// =============================================================================
// upload
// =============================================================================

/// Options for [`upload_csv`].
#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    /// Policy for the original columns; the credential column is appended.
    pub policy: ValidationPolicy,
    /// Write a letter for every inserted row.
    pub letters: Option<LetterWriter>,
}

/// Result of a completed upload.
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub outcomes: Vec<Outcome>,
    pub letters: Vec<LetterFiles>,
    /// Inserted rows whose letter could not be produced.
    pub letter_failures: Vec<String>,
}

impl UploadReport {
    pub fn summary(&self) -> Summary {
        Summary::of(&self.outcomes)
    }
}

/// Validate an extended CSV, then insert every row the store does not have yet.
///
/// A legacy `passphrase` column is read as `api_key`. Letters are written for
/// inserted rows even when the run stops on a store error.
pub async fn upload_csv<S: DataStore>(
    input: &Path,
    store: &S,
    options: &UploadOptions,
    diag: &Diagnostics,
) -> AdminResult<UploadReport> {
    let table = read_checked(input, diag)?.with_renamed_column(PASSPHRASE, API_KEY);
    let policy = options.policy.clone().with_extra_column(API_KEY);
    validate_table(&table, &policy, diag)?;

    diag.info(format!(
        "Reconciling {} row(s) with '{}'",
        table.len(),
        LIBRARIES.name
    ));
    let (outcomes, failure) = match reconcile(store, &table, &LIBRARIES, FSCS_ID, diag).await {
        Ok(outcomes) => (outcomes, None),
        Err(mut err) => (std::mem::take(&mut err.completed), Some(err)),
    };

    let mut report = UploadReport {
        outcomes,
        ..Default::default()
    };
    if let Some(writer) = &options.letters {
        write_letters(&table, writer, &mut report, diag);
    }

    match failure {
        Some(err) => {
            let summary = report.summary();
            diag.warning(format!(
                "{} row(s) inserted before the failure were kept",
                summary.inserted
            ));
            Err(ReconcileError {
                completed: report.outcomes,
                ..err
            }
            .into())
        }
        None => Ok(report),
    }
}

fn write_letters(table: &Table, writer: &LetterWriter, report: &mut UploadReport, diag: &Diagnostics) {
    let inserted = table
        .records()
        .zip(&report.outcomes)
        .filter(|(_, outcome)| outcome.is_inserted());

    for (record, outcome) in inserted {
        let result = LetterFields::from_record(&record).and_then(|f| writer.write(&f, diag));
        match result {
            Ok(files) => report.letters.push(files),
            Err(e) => {
                diag.error(format!("Letter for '{}' failed: {}", outcome.key(), e));
                report.letter_failures.push(outcome.key().to_string());
            }
        }
    }
}

// =============================================================================
// update / delete
// =============================================================================

/// Field changes for one library.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryUpdate {
    pub fscs_id: String,
    pub address: Option<String>,
    pub name: Option<String>,
    pub tag: Option<String>,
    pub api_key: Option<String>,
}

impl LibraryUpdate {
    pub fn new(fscs_id: impl Into<String>) -> Self {
        Self {
            fscs_id: fscs_id.into(),
            ..Default::default()
        }
    }

    /// RPC body: the id plus every field being changed.
    pub fn body(&self) -> JsonValue {
        let mut body = Map::new();
        body.insert(FSCS_ID.to_string(), json!(self.fscs_id));
        let fields = [
            ("address", &self.address),
            ("name", &self.name),
            ("tag", &self.tag),
            (API_KEY, &self.api_key),
        ];
        for (key, value) in fields {
            if let Some(v) = value {
                body.insert(key.to_string(), json!(v));
            }
        }
        JsonValue::Object(body)
    }

    pub fn has_changes(&self) -> bool {
        self.address.is_some() || self.name.is_some() || self.tag.is_some() || self.api_key.is_some()
    }
}

/// Apply `update`. After an API key change, a new letter is written when a
/// writer is given.
///
/// An update with no changed field is not sent.
pub async fn update_library(
    store: &PostgrestStore<'_>,
    update: &LibraryUpdate,
    letters: Option<&LetterWriter>,
    diag: &Diagnostics,
) -> AdminResult<JsonValue> {
    if !update.has_changes() {
        diag.warning(format!("Nothing to update for {}", update.fscs_id));
        return Ok(json!({ "updated": "", "rows_updated": 0 }));
    }

    diag.info(format!("UPDATE {}", update.fscs_id));
    let result = store.update(&LIBRARIES, &update.body()).await?;
    diag.info(format!("update_library: {}", result));

    if let (Some(api_key), Some(writer)) = (&update.api_key, letters) {
        match store.fetch_library(&update.fscs_id).await? {
            Some(mut row) => {
                row[API_KEY] = json!(api_key);
                writer.write(&LetterFields::from_json(&row)?, diag)?;
            }
            None => diag.warning(format!(
                "{} not found after update; no letter written",
                update.fscs_id
            )),
        }
    }

    Ok(result)
}

/// Remove a library from the registry.
pub async fn delete_library(
    store: &PostgrestStore<'_>,
    fscs_id: &str,
    diag: &Diagnostics,
) -> AdminResult<JsonValue> {
    diag.info(format!("DELETE {}", fscs_id));
    let result = store.delete(&LIBRARIES, fscs_id).await?;
    diag.info(format!("delete_library: {}", result));
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::PassphraseGenerator;
    use crate::error::{AdminError, ValidationError};
    use crate::parser::read_csv_file;
    use std::fs;

    const GOOD_CSV: &str = "fscs_id,name,address,tag\n\
        KY0069,Library 1,\"123 Sesame Street, Public Television, TV 40404\",tag 1\n\
        ME0119,Library 2,\"1800F St NW, Lewiston, ME, 04240\",tag 2\n";

    #[test]
    fn test_build_body_api_key() {
        let update = LibraryUpdate {
            api_key: Some("api-key-surrogate".into()),
            ..LibraryUpdate::new("ME0001-001")
        };
        assert_eq!(
            update.body(),
            json!({ "fscs_id": "ME0001-001", "api_key": "api-key-surrogate" })
        );
    }

    #[test]
    fn test_build_body_several_fields() {
        let update = LibraryUpdate {
            address: Some("123 Sesame Street".into()),
            tag: Some("branch".into()),
            ..LibraryUpdate::new("ME0002-001")
        };
        assert_eq!(
            update.body(),
            json!({ "fscs_id": "ME0002-001", "address": "123 Sesame Street", "tag": "branch" })
        );
        assert!(update.has_changes());
        assert!(!LibraryUpdate::new("ME0002-001").has_changes());
    }

    #[test]
    fn test_extend_writes_extended_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("libraries.csv");
        fs::write(&input, GOOD_CSV).unwrap();
        let mut gen = PassphraseGenerator::with_seed(3);

        let output = extend_csv(&input, &ExtendOptions::default(), &mut gen, &Diagnostics::silent()).unwrap();

        assert_eq!(output, dir.path().join("extended_libraries.csv"));
        let table = read_csv_file(&output).unwrap().table;
        assert_eq!(table.columns().last().map(String::as_str), Some(API_KEY));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_extend_refuses_invalid_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("libraries.csv");
        fs::write(&input, GOOD_CSV.replacen("address", "addr", 1)).unwrap();
        let mut gen = PassphraseGenerator::with_seed(3);

        let err = extend_csv(&input, &ExtendOptions::default(), &mut gen, &Diagnostics::silent()).unwrap_err();

        assert!(matches!(
            err,
            AdminError::Validation(ValidationError::SchemaFieldMismatch(_))
        ));
        assert!(!dir.path().join("extended_libraries.csv").exists());
    }
}
