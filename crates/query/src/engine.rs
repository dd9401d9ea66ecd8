use std::sync::Arc;

use arbor_store::{StoreError, VersionStore};

use crate::assembler::{assemble, validate_path};
use crate::{QueryError, ResultTree, Selection, planner};

/// Runs queries against a shared store.
///
/// Holds no mutable state; one engine can serve any number of threads.
#[derive(Clone)]
pub struct QueryEngine {
    store: Arc<dyn VersionStore>,
}

impl QueryEngine {
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self { store }
    }

    /// The store this engine reads from.
    pub fn store(&self) -> &Arc<dyn VersionStore> {
        &self.store
    }

    /// Parse and plan a query without touching the store.
    pub fn plan(&self, query: &str) -> Result<Vec<Selection>, QueryError> {
        planner::plan(query)
    }

    /// Execute a query and assemble its result tree.
    pub fn query(&self, query: &str) -> Result<ResultTree, QueryError> {
        let _span = tracing::info_span!("query").entered();
        let selections = planner::plan(query)?;
        for selection in &selections {
            validate_path(&selection.path)?;
        }
        tracing::debug!(count = selections.len(), "planned selections");

        let mut results = Vec::with_capacity(selections.len());
        for selection in &selections {
            results.push(self.fetch(selection)?);
        }
        assemble(selections.iter().zip(results))
    }

    /// Values for one selection. A missing path or version yields no values.
    pub fn fetch(&self, selection: &Selection) -> Result<Vec<String>, QueryError> {
        let result = if selection.is_current() {
            self.store.get_many_current(&selection.path)
        } else {
            match u64::try_from(selection.version) {
                Ok(version) => self.store.get_many(&selection.path, version),
                // Negative versions other than the current sentinel never exist.
                Err(_) => Ok(Vec::new()),
            }
        };

        match result {
            Ok(values) => {
                tracing::debug!(
                    path = %selection.path,
                    version = selection.version,
                    count = values.len(),
                    "fetched selection"
                );
                Ok(values)
            }
            Err(StoreError::NotFound { .. }) => {
                tracing::debug!(path = %selection.path, "selection not found");
                Ok(Vec::new())
            }
            Err(e) => {
                tracing::warn!(path = %selection.path, error = %e, "selection lookup failed");
                Err(QueryError::Store(e))
            }
        }
    }
}
