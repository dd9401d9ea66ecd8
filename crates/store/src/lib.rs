//! Versioned storage: every write to a path creates a new immutable version.
//!
//! # Invariants
//! - `current_version <= latest_version` for every path.
//! - `latest_version` grows by exactly one per write, however many values it carries.
//! - A reader never sees a version pointer ahead of its committed values.
//! - Writes to one path serialize. Writes to different paths do not block each
//!   other in the memory and file adapters; SQLite admits one writer at a time.
//! - A path has no metadata until its first write commits.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod path;
pub mod sqlite;
pub mod store;
pub mod types;

#[cfg(test)]
mod contract;

pub use config::{BackendConfig, open_store};
pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::VersionStore;
pub use types::{Metadata, SetOptions, Version};
