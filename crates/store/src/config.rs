use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{FileStore, MemoryStore, SqliteStore, StoreError, VersionStore};

/// Which backend to open, as read from configuration.
///
/// ```yaml
/// type: file
/// root: ./arbor-data
/// ```
///
/// ```yaml
/// type: sqlite
/// path: ./arbor.db
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    /// Process-local map; contents vanish on exit.
    Memory,
    /// Directory-backed persistent store.
    File { root: PathBuf },
    /// Relational store in one SQLite database file.
    Sqlite { path: PathBuf },
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::File {
            root: PathBuf::from("arbor-data"),
        }
    }
}

/// Construct the configured backend once; share the handle with every caller.
pub fn open_store(config: &BackendConfig) -> Result<Arc<dyn VersionStore>, StoreError> {
    match config {
        BackendConfig::Memory => {
            tracing::info!("using in-memory backend");
            Ok(Arc::new(MemoryStore::new()))
        }
        BackendConfig::File { root } => {
            tracing::info!(root = %root.display(), "using file backend");
            Ok(Arc::new(FileStore::open(root)?))
        }
        BackendConfig::Sqlite { path } => {
            tracing::info!(db = %path.display(), "using sqlite backend");
            Ok(Arc::new(SqliteStore::open(path)?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SetOptions;

    #[test]
    fn backend_config_json_shape() {
        let memory: BackendConfig = serde_json::from_str(r#"{"type":"memory"}"#).unwrap();
        assert_eq!(memory, BackendConfig::Memory);

        let file: BackendConfig =
            serde_json::from_str(r#"{"type":"file","root":"/var/lib/arbor"}"#).unwrap();
        assert_eq!(
            file,
            BackendConfig::File {
                root: PathBuf::from("/var/lib/arbor")
            }
        );

        let sqlite: BackendConfig =
            serde_json::from_str(r#"{"type":"sqlite","path":"/var/lib/arbor.db"}"#).unwrap();
        assert_eq!(
            sqlite,
            BackendConfig::Sqlite {
                path: PathBuf::from("/var/lib/arbor.db")
            }
        );

        assert!(serde_json::from_str::<BackendConfig>(r#"{"type":"postgres"}"#).is_err());
    }

    #[test]
    fn open_store_builds_each_backend() {
        let memory = open_store(&BackendConfig::Memory).unwrap();
        memory.set("/a", "1", SetOptions::default()).unwrap();
        assert_eq!(memory.get_current("/a").unwrap(), "1");

        let tmp = tempfile::tempdir().unwrap();
        let file = open_store(&BackendConfig::File {
            root: tmp.path().join("data"),
        })
        .unwrap();
        file.set("/a", "2", SetOptions::default()).unwrap();
        assert_eq!(file.get_current("/a").unwrap(), "2");
        file.close().unwrap();

        let sqlite = open_store(&BackendConfig::Sqlite {
            path: tmp.path().join("arbor.db"),
        })
        .unwrap();
        sqlite.set("/a", "3", SetOptions::default()).unwrap();
        assert_eq!(sqlite.get_current("/a").unwrap(), "3");
        sqlite.close().unwrap();
    }
}
