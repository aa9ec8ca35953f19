//! In-memory table store.
//!
//! Suitable for tests and single-process bots that can afford to lose
//! pagination state on restart.

use async_trait::async_trait;
use beard_core::{BoxError, Record, Table, TableStore, record_matches, table_name};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

/// Error returned when a table lock was poisoned by a panicking writer.
#[derive(Debug, thiserror::Error)]
#[error("table {0} is poisoned")]
pub struct PoisonedTable(String);

/// A table held in memory.
#[derive(Debug, Default)]
pub struct MemoryTable {
    name: String,
    rows: Mutex<Vec<Record>>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A snapshot of every row.
    pub fn rows(&self) -> Vec<Record> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned<T>(&self, _: PoisonError<T>) -> BoxError {
        Box::new(PoisonedTable(self.name.clone()))
    }
}

#[async_trait]
impl Table for MemoryTable {
    async fn insert(&self, record: Record) -> Result<(), BoxError> {
        self.rows
            .lock()
            .map_err(|e| self.poisoned(e))?
            .push(record);
        Ok(())
    }

    async fn find_one(&self, filter: &Record) -> Result<Option<Record>, BoxError> {
        let rows = self.rows.lock().map_err(|e| self.poisoned(e))?;
        Ok(rows.iter().find(|row| record_matches(row, filter)).cloned())
    }

    async fn update(&self, record: Record, keys: &[&str]) -> Result<bool, BoxError> {
        let filter: Record = keys
            .iter()
            .filter_map(|key| record.get(*key).map(|v| ((*key).to_owned(), v.clone())))
            .collect();
        if filter.len() != keys.len() {
            return Ok(false);
        }
        let mut rows = self.rows.lock().map_err(|e| self.poisoned(e))?;
        match rows.iter_mut().find(|row| record_matches(row, &filter)) {
            Some(row) => {
                *row = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Hands out [`MemoryTable`]s, one per `(beard, purpose)`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, Arc<MemoryTable>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The concrete table for inspection, creating it if needed.
    pub fn memory_table(&self, beard: &str, purpose: &str) -> Arc<MemoryTable> {
        let name = table_name(beard, purpose);
        self.tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.clone())
            .or_insert_with(|| Arc::new(MemoryTable::new(name)))
            .clone()
    }
}

impl TableStore for MemoryStore {
    fn table(&self, beard: &str, purpose: &str) -> Arc<dyn Table> {
        self.memory_table(beard, purpose)
    }
}
