//! Remote data store interface.
//!
//! The reconciliation engine only needs two operations, query-by-field and
//! insert, captured by the [`DataStore`] trait. [`PostgrestStore`] implements
//! it over HTTP; tests substitute in-memory stores.

pub mod postgrest;

use serde_json::Value as JsonValue;
use std::fmt;

use crate::error::StoreResult;

pub use postgrest::PostgrestStore;

/// A remote table and the RPC functions that write to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreTable {
    pub name: &'static str,
    pub insert_rpc: &'static str,
    pub update_rpc: &'static str,
    pub delete_rpc: &'static str,
}

/// The library registry.
pub const LIBRARIES: StoreTable = StoreTable {
    name: "libraries",
    insert_rpc: "insert_library",
    update_rpc: "update_library",
    delete_rpc: "delete_library",
};

/// Equality filter on one field, rendered PostgREST-style as `field=eq.value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub value: String,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Query-string pair.
    pub fn to_query_pair(&self) -> (String, String) {
        (self.field.clone(), format!("eq.{}", self.value))
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=eq.{}", self.field, self.value)
    }
}

/// Query and insert against a remote store.
///
/// Every call is a live round trip; implementations must not cache records.
#[allow(async_fn_in_trait)]
pub trait DataStore {
    /// All records of `table` matching `filter`.
    async fn query(&self, table: &StoreTable, filter: &Filter) -> StoreResult<Vec<JsonValue>>;

    /// Insert one record and return the store's response.
    async fn insert(&self, table: &StoreTable, record: &JsonValue) -> StoreResult<JsonValue>;
}
