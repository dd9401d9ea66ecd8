//! In-memory store. Nothing survives the process; useful for tests and
//! ephemeral deployments.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Metadata, SetOptions, StoreError, Version, VersionStore, path};

/// Everything stored for one path. Guarded by a single lock so metadata and
/// values always change together.
#[derive(Debug)]
struct PathRecord {
    metadata: Metadata,
    values: BTreeMap<Version, Vec<String>>,
}

impl PathRecord {
    fn new(path: &str) -> Self {
        Self {
            metadata: Metadata::new(path),
            values: BTreeMap::new(),
        }
    }

    /// Apply one write: advance the version pointers and store the value set.
    fn commit(&mut self, values: &[String], options: SetOptions) -> Metadata {
        let version = self.metadata.advance(options);
        self.values.insert(version, values.to_vec());
        tracing::debug!(
            path = %self.metadata.path,
            version,
            current = self.metadata.current_version,
            count = values.len(),
            "committed value set"
        );
        self.metadata.clone()
    }
}

/// Map-backed store with one lock per path.
///
/// The outer map lock is held only long enough to find a record, so writers
/// on different paths never wait on each other's commits. A path's record
/// enters the map already holding its first version; readers never see a
/// path that has metadata but no committed write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Arc<RwLock<PathRecord>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of paths with metadata.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Every stored path, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.records.read().keys().cloned().collect();
        paths.sort();
        paths
    }

    fn record(&self, path: &str) -> Result<Arc<RwLock<PathRecord>>, StoreError> {
        self.records
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::not_found(path))
    }
}

impl VersionStore for MemoryStore {
    fn get_many_current(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let record = self.record(path)?;
        let record = record.read();
        let current = record.metadata.current_version;
        Ok(record.values.get(&current).cloned().unwrap_or_default())
    }

    fn get_many(&self, path: &str, version: Version) -> Result<Vec<String>, StoreError> {
        let record = self.record(path)?;
        let record = record.read();
        Ok(record.values.get(&version).cloned().unwrap_or_default())
    }

    fn set_many(
        &self,
        path: &str,
        values: &[String],
        options: SetOptions,
    ) -> Result<Metadata, StoreError> {
        path::validate(path)?;
        let existing = self.records.read().get(path).cloned();
        let record = match existing {
            Some(record) => record,
            None => {
                let mut records = self.records.write();
                match records.get(path) {
                    Some(record) => record.clone(),
                    None => {
                        // First write: the record is published only once it is committed.
                        let mut record = PathRecord::new(path);
                        let metadata = record.commit(values, options);
                        records.insert(path.to_string(), Arc::new(RwLock::new(record)));
                        return Ok(metadata);
                    }
                }
            }
        };
        let metadata = record.write().commit(values, options);
        Ok(metadata)
    }

    fn metadata(&self, path: &str) -> Result<Metadata, StoreError> {
        Ok(self.record(path)?.read().metadata.clone())
    }
}
