use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Version number of one write to a path. The first write lands at 1.
pub type Version = u64;

/// Per-path version bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub path: String,
    /// Highest version ever written.
    pub latest_version: Version,
    /// Version served when no explicit version is requested.
    pub current_version: Version,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Metadata {
    /// Metadata for a path that has not been written yet.
    ///
    /// Both pointers start at 0, so the first write becomes version 1 and
    /// version 0 never holds values.
    pub fn new(path: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            path: path.into(),
            latest_version: 0,
            current_version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Advance to the next version and return it, promoting it to current
    /// unless `options.keep_current` is set.
    pub fn advance(&mut self, options: SetOptions) -> Version {
        self.latest_version += 1;
        if !options.keep_current {
            self.current_version = self.latest_version;
        }
        self.updated_at = Utc::now();
        self.latest_version
    }
}

/// Options for `set` / `set_many`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetOptions {
    /// Keep the previous current version instead of promoting the new one.
    #[serde(default)]
    pub keep_current: bool,
}

impl SetOptions {
    pub fn keep_current() -> Self {
        Self { keep_current: true }
    }
}
