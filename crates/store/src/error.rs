/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("path {path} not found")]
    NotFound { path: String },
    #[error("invalid path {path:?}: must start with '/' and have non-empty segments")]
    InvalidPath { path: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CBOR serialization error: {0}")]
    CborEncode(String),
    #[error("CBOR deserialization error: {0}")]
    CborDecode(String),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
}

impl StoreError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Whether this is a missing path or an empty resolved value set.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_path() {
        let err = StoreError::not_found("/a/b");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "path /a/b not found");
    }

    #[test]
    fn io_error_is_not_not_found() {
        let err = StoreError::from(std::io::Error::other("disk gone"));
        assert!(!err.is_not_found());
    }
}
