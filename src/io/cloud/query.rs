//! Managed query service capability.

use crate::error::{Error, Result};
use arrow::record_batch::RecordBatch;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Executes query text inside a workgroup and returns the result as a table.
pub trait QueryService: Send + Sync {
    /// # Errors
    /// Returns an error if the query is invalid, execution fails, or there's a connection issue
    fn execute(&self, query: &str, workgroup: &str) -> Result<RecordBatch>;
}

/// Query service answering from tables registered up front, keyed by the exact
/// query text.
#[derive(Clone, Default)]
pub struct MemoryQueryService {
    results: Arc<Mutex<HashMap<String, RecordBatch>>>,
}

impl MemoryQueryService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the table returned for `query`.
    ///
    /// # Panics
    ///
    /// Panics if the mutex protecting the results is poisoned.
    pub fn add_result(&self, query: &str, table: RecordBatch) {
        self.results
            .lock()
            .expect("results mutex poisoned")
            .insert(query.to_string(), table);
    }
}

impl QueryService for MemoryQueryService {
    fn execute(&self, query: &str, workgroup: &str) -> Result<RecordBatch> {
        let results = self.results.lock().expect("results mutex poisoned");
        results.get(query).cloned().ok_or_else(|| {
            Error::config(format!("no result registered for query {query:?} in workgroup {workgroup}"))
        })
    }
}
