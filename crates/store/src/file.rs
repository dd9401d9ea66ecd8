//! File-backed versioned store.
//!
//! Layout inside the store directory:
//! ```text
//! store.meta.json                        - layout schema version
//! paths/<sha256(path)>/
//!   metadata.json                        - Metadata record for the path
//!   values/
//!     000001.cbor.zst                    - CBOR+zstd value set of version 1
//! ```
//!
//! A write lands the value set file first and the metadata file second, each
//! through a temp file and a rename. The metadata rename is the commit point:
//! readers resolve versions through `metadata.json` and so never see a
//! version whose values are not on disk yet.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Metadata, SetOptions, StoreError, Version, VersionStore, path};

/// Current layout schema version.
const STORE_SCHEMA_VERSION: u32 = 1;

const META_FILE: &str = "store.meta.json";
const PATHS_DIR: &str = "paths";
const VALUES_DIR: &str = "values";
const METADATA_FILE: &str = "metadata.json";

/// Contents of `store.meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreMeta {
    pub schema_version: u32,
}

/// One value set as persisted. Carries its own path and version so the
/// values file can be checked against the metadata that points at it.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ValueSetRecord {
    path: String,
    version: Version,
    values: Vec<String>,
}

/// Versioned store persisted as one directory per path.
///
/// Writers to the same path serialize on an in-process mutex for that path.
/// The store assumes it is the only process writing to its root.
pub struct FileStore {
    root: PathBuf,
    meta: StoreMeta,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl FileStore {
    /// Open or create a store at the given directory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join(PATHS_DIR))?;

        let meta_path = root.join(META_FILE);
        let meta = if meta_path.exists() {
            let meta: StoreMeta = serde_json::from_reader(std::fs::File::open(&meta_path)?)?;
            if meta.schema_version != STORE_SCHEMA_VERSION {
                return Err(StoreError::SchemaMismatch {
                    file_version: meta.schema_version,
                    expected_version: STORE_SCHEMA_VERSION,
                });
            }
            meta
        } else {
            let meta = StoreMeta {
                schema_version: STORE_SCHEMA_VERSION,
            };
            write_atomic(&meta_path, &serde_json::to_vec_pretty(&meta)?)?;
            meta
        };

        tracing::debug!(root = %root.display(), "opened file store");
        Ok(Self {
            root,
            meta,
            locks: Mutex::new(HashMap::new()),
        })
    }

    /// Get the path to the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the layout metadata.
    pub fn meta(&self) -> &StoreMeta {
        &self.meta
    }

    /// Every stored path, sorted.
    pub fn paths(&self) -> Result<Vec<String>, StoreError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(self.root.join(PATHS_DIR))? {
            let dir = entry?.path();
            if !dir.is_dir() {
                continue;
            }
            match read_json::<Metadata>(&dir.join(METADATA_FILE))? {
                Some(meta) => paths.push(meta.path),
                // A first write that never committed.
                None => continue,
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Check every committed path: metadata decodes and sits in the directory
    /// its path hashes to, pointers are ordered, and each version up to
    /// `latest_version` has a value set recorded for the same path and version.
    pub fn verify_integrity(&self) -> Result<(), StoreError> {
        for entry in std::fs::read_dir(self.root.join(PATHS_DIR))? {
            let dir = entry?.path();
            if !dir.is_dir() {
                continue;
            }
            let Some(meta) = read_json::<Metadata>(&dir.join(METADATA_FILE))? else {
                continue;
            };

            let expected_dir = self.path_dir(&meta.path);
            if expected_dir != dir {
                return Err(StoreError::IntegrityMismatch {
                    expected: expected_dir.display().to_string(),
                    actual: dir.display().to_string(),
                });
            }
            if meta.current_version > meta.latest_version {
                return Err(StoreError::IntegrityMismatch {
                    expected: format!("current version <= {}", meta.latest_version),
                    actual: format!("current version {}", meta.current_version),
                });
            }
            for version in 1..=meta.latest_version {
                let file = values_file(&dir, version);
                if !file.exists() {
                    return Err(StoreError::IntegrityMismatch {
                        expected: format!("value set for {} version {version}", meta.path),
                        actual: "missing file".into(),
                    });
                }
                let record = read_value_set(&file)?;
                check_record(&record, &meta.path, version)?;
            }
        }
        Ok(())
    }

    fn path_dir(&self, path: &str) -> PathBuf {
        self.root.join(PATHS_DIR).join(sha256_hex(path.as_bytes()))
    }

    fn path_lock(&self, path: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .entry(path.to_string())
            .or_default()
            .clone()
    }

    fn read_metadata(&self, path: &str) -> Result<Metadata, StoreError> {
        read_json(&self.path_dir(path).join(METADATA_FILE))?
            .ok_or_else(|| StoreError::not_found(path))
    }

    fn read_values(&self, meta: &Metadata, version: Version) -> Result<Vec<String>, StoreError> {
        // Version 0 is never written; anything past latest is uncommitted.
        if version == 0 || version > meta.latest_version {
            return Ok(Vec::new());
        }
        let file = values_file(&self.path_dir(&meta.path), version);
        if !file.exists() {
            return Ok(Vec::new());
        }
        let record = read_value_set(&file)?;
        check_record(&record, &meta.path, version)?;
        Ok(record.values)
    }
}

impl VersionStore for FileStore {
    fn get_many_current(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let meta = self.read_metadata(path)?;
        self.read_values(&meta, meta.current_version)
    }

    fn get_many(&self, path: &str, version: Version) -> Result<Vec<String>, StoreError> {
        let meta = self.read_metadata(path)?;
        self.read_values(&meta, version)
    }

    fn set_many(
        &self,
        path: &str,
        values: &[String],
        options: SetOptions,
    ) -> Result<Metadata, StoreError> {
        path::validate(path)?;
        let lock = self.path_lock(path);
        let _guard = lock.lock();
        let _span = tracing::debug_span!("file_store_write", path).entered();

        let mut meta = match self.read_metadata(path) {
            Ok(meta) => meta,
            Err(StoreError::NotFound { .. }) => Metadata::new(path),
            Err(e) => return Err(e),
        };
        let version = meta.advance(options);

        let dir = self.path_dir(path);
        std::fs::create_dir_all(dir.join(VALUES_DIR))?;

        let record = ValueSetRecord {
            path: path.to_string(),
            version,
            values: values.to_vec(),
        };
        let compressed = zstd_compress(&cbor_serialize(&record)?)?;
        write_atomic(&values_file(&dir, version), &compressed)?;
        write_atomic(&dir.join(METADATA_FILE), &serde_json::to_vec_pretty(&meta)?)?;

        tracing::debug!(
            version,
            current = meta.current_version,
            count = values.len(),
            "committed value set"
        );
        Ok(meta)
    }

    fn metadata(&self, path: &str) -> Result<Metadata, StoreError> {
        self.read_metadata(path)
    }

    fn close(&self) -> Result<(), StoreError> {
        tracing::debug!(root = %self.root.display(), "closed file store");
        Ok(())
    }
}

fn values_file(dir: &Path, version: Version) -> PathBuf {
    dir.join(VALUES_DIR).join(format!("{version:06}.cbor.zst"))
}

fn check_record(record: &ValueSetRecord, path: &str, version: Version) -> Result<(), StoreError> {
    if record.path != path || record.version != version {
        return Err(StoreError::IntegrityMismatch {
            expected: format!("{path}@{version}"),
            actual: format!("{}@{}", record.path, record.version),
        });
    }
    Ok(())
}

fn read_value_set(file: &Path) -> Result<ValueSetRecord, StoreError> {
    let compressed = std::fs::read(file)?;
    cbor_deserialize(&zstd_decompress(&compressed)?)
}

/// Read a JSON file, mapping a missing file to `None`.
fn read_json<T: for<'de> Deserialize<'de>>(file: &Path) -> Result<Option<T>, StoreError> {
    match std::fs::read(file) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Write `data` to a sibling temp file, sync it, then rename over `target`.
fn write_atomic(target: &Path, data: &[u8]) -> Result<(), StoreError> {
    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = target.with_file_name(format!(".{file_name}.tmp"));
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(data)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, target)?;
    Ok(())
}

fn cbor_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| StoreError::CborEncode(e.to_string()))?;
    Ok(buf)
}

fn cbor_deserialize<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, StoreError> {
    ciborium::from_reader(data).map_err(|e| StoreError::CborDecode(e.to_string()))
}

fn zstd_compress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut encoder = zstd::Encoder::new(Vec::new(), 3)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

fn zstd_decompress(data: &[u8]) -> Result<Vec<u8>, StoreError> {
    let mut decoder = zstd::Decoder::new(data)?;
    let mut buf = Vec::new();
    decoder.read_to_end(&mut buf)?;
    Ok(buf)
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
