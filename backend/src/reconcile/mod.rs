//! Exists-or-insert reconciliation against the data store.
//!
//! For each row, in table order:
//!
//! 1. query the store for records whose key column equals the row's key
//! 2. any match → [`Outcome::Skipped`], nothing is written
//! 3. no match → insert the whole row → [`Outcome::Inserted`] with the response
//!
//! Rows are processed strictly one after another: one query and at most one
//! insert per row, no batching. A store failure stops the run; rows already
//! inserted stay inserted and are returned in [`ReconcileError::completed`].

use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::error::StoreError;
use crate::logs::Diagnostics;
use crate::models::Table;
use crate::store::{DataStore, Filter, StoreTable};

/// What happened to one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    /// At least one record with this key already exists.
    Skipped { key: String },
    /// The row was inserted; `response` is the store's reply.
    Inserted { key: String, response: JsonValue },
}

impl Outcome {
    pub fn key(&self) -> &str {
        match self {
            Outcome::Skipped { key } | Outcome::Inserted { key, .. } => key,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, Outcome::Inserted { .. })
    }
}

/// A store call failed partway through a run.
#[derive(Debug, Error)]
#[error("Reconciliation stopped at row {row} ('{key}') after {} completed row(s): {source}", .completed.len())]
pub struct ReconcileError {
    /// Zero-based index of the failing row.
    pub row: usize,
    pub key: String,
    /// Outcomes of the rows processed before the failure.
    pub completed: Vec<Outcome>,
    #[source]
    pub source: StoreError,
}

/// Tally of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub inserted: usize,
    pub skipped: usize,
}

impl Summary {
    pub fn of(outcomes: &[Outcome]) -> Self {
        let inserted = outcomes.iter().filter(|o| o.is_inserted()).count();
        Self {
            inserted,
            skipped: outcomes.len() - inserted,
        }
    }
}

/// Reconcile every row of `table` against `target`, keyed on `key_column`.
///
/// Returns one outcome per row, in row order.
pub async fn reconcile<S: DataStore>(
    store: &S,
    table: &Table,
    target: &StoreTable,
    key_column: &str,
    diag: &Diagnostics,
) -> Result<Vec<Outcome>, ReconcileError> {
    let mut outcomes = Vec::with_capacity(table.len());

    for (row, record) in table.records().enumerate() {
        let key = record
            .get(key_column)
            .map(|v| v.as_cell())
            .unwrap_or_default();

        match reconcile_row(store, target, key_column, &key, &record.to_json(), diag).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(source) => {
                diag.error(format!("Row {} ('{}'): {}", row + 1, key, source));
                return Err(ReconcileError {
                    row,
                    key,
                    completed: outcomes,
                    source,
                });
            }
        }
    }

    let summary = Summary::of(&outcomes);
    diag.success(format!(
        "{} inserted, {} already present",
        summary.inserted, summary.skipped
    ));
    Ok(outcomes)
}

async fn reconcile_row<S: DataStore>(
    store: &S,
    target: &StoreTable,
    key_column: &str,
    key: &str,
    record: &JsonValue,
    diag: &Diagnostics,
) -> Result<Outcome, StoreError> {
    diag.debug(format!("Looking for {}={}", key_column, key));
    let matches = store.query(target, &Filter::eq(key_column, key)).await?;

    if !matches.is_empty() {
        if matches.len() > 1 {
            diag.warning(format!(
                "'{}' matches {} records in {}",
                key,
                matches.len(),
                target.name
            ));
        }
        diag.info(format!("'{}' exists in the database", key));
        return Ok(Outcome::Skipped {
            key: key.to_string(),
        });
    }

    let response = store.insert(target, record).await?;
    diag.success(format!("Inserted {}: {}", key, response));
    Ok(Outcome::Inserted {
        key: key.to_string(),
        response,
    })
}
