use crate::{Metadata, SetOptions, StoreError, Version};

/// The versioned storage contract shared by every backend.
///
/// Callers hold an `Arc<dyn VersionStore>` and never depend on a concrete
/// adapter. All adapters return the same errors for the same situations:
/// an unknown path is `NotFound`; a known path whose requested version holds
/// no values yields an empty list from the `get_many*` calls and `NotFound`
/// from the single-value calls.
pub trait VersionStore: Send + Sync {
    /// Full value set of the path's current version.
    fn get_many_current(&self, path: &str) -> Result<Vec<String>, StoreError>;

    /// Full value set of an explicit version.
    fn get_many(&self, path: &str, version: Version) -> Result<Vec<String>, StoreError>;

    /// Write `values` as a new version of `path` in one atomic step.
    fn set_many(
        &self,
        path: &str,
        values: &[String],
        options: SetOptions,
    ) -> Result<Metadata, StoreError>;

    /// Metadata snapshot for `path`.
    fn metadata(&self, path: &str) -> Result<Metadata, StoreError>;

    /// Release underlying resources. Called once at shutdown.
    fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }

    /// First value of the current version.
    fn get_current(&self, path: &str) -> Result<String, StoreError> {
        first_value(path, self.get_many_current(path)?)
    }

    /// First value of an explicit version.
    fn get(&self, path: &str, version: Version) -> Result<String, StoreError> {
        first_value(path, self.get_many(path, version)?)
    }

    /// Write a single value as a new version.
    fn set(&self, path: &str, value: &str, options: SetOptions) -> Result<Metadata, StoreError> {
        self.set_many(path, &[value.to_string()], options)
    }
}

fn first_value(path: &str, values: Vec<String>) -> Result<String, StoreError> {
    values
        .into_iter()
        .next()
        .ok_or_else(|| StoreError::not_found(path))
}
