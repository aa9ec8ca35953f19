//! The storage collaborator.
//!
//! Tables are scoped to a `(beard, purpose)` pair and hold opaque JSON
//! records. The core only needs insert, find-one and update-by-key; retention
//! and eviction belong to the implementation.

use crate::error::BoxError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// A stored row: application-defined fields holding JSON values.
pub type Record = Map<String, Value>;

/// A keyed table of records.
#[async_trait]
pub trait Table: Send + Sync + 'static {
    /// Appends a record.
    async fn insert(&self, record: Record) -> Result<(), BoxError>;

    /// Returns the first record whose fields equal every field of `filter`.
    async fn find_one(&self, filter: &Record) -> Result<Option<Record>, BoxError>;

    /// Replaces the record matching `record` on `keys`.
    ///
    /// Returns whether a record was found and replaced.
    async fn update(&self, record: Record, keys: &[&str]) -> Result<bool, BoxError>;
}

/// Hands out tables scoped to a beard and a purpose.
pub trait TableStore: Send + Sync + 'static {
    fn table(&self, beard: &str, purpose: &str) -> Arc<dyn Table>;
}

/// Name of the table backing `purpose` for `beard`.
pub fn table_name(beard: &str, purpose: &str) -> String {
    format!("{beard}{purpose}")
}

/// True when every field of `filter` is present in `record` with an equal value.
pub fn record_matches(record: &Record, filter: &Record) -> bool {
    filter
        .iter()
        .all(|(key, value)| record.get(key) == Some(value))
}
