//! Path rules shared by the stores and the query assembler.

use crate::StoreError;

/// Root separator. Also the reserved key for a branch's own leaf value in query results.
pub const SEPARATOR: char = '/';

/// Whether `path` starts at the root and every segment is non-empty.
pub fn is_valid(path: &str) -> bool {
    match path.strip_prefix(SEPARATOR) {
        Some(rest) => !rest.is_empty() && rest.split(SEPARATOR).all(|s| !s.is_empty()),
        None => false,
    }
}

/// Validate a path, returning `InvalidPath` when it is malformed.
pub fn validate(path: &str) -> Result<(), StoreError> {
    if is_valid(path) {
        Ok(())
    } else {
        Err(StoreError::InvalidPath {
            path: path.to_string(),
        })
    }
}

/// Segments of a valid path, without the empty segment before the leading `/`.
pub fn segments(path: &str) -> Result<Vec<&str>, StoreError> {
    validate(path)?;
    Ok(path[1..].split(SEPARATOR).collect())
}

/// Append one segment to a prefix, treating `/` as the empty prefix.
pub fn join(prefix: &str, name: &str) -> String {
    let base = prefix.trim_end_matches(SEPARATOR);
    format!("{base}{SEPARATOR}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_paths() {
        assert!(is_valid("/a"));
        assert!(is_valid("/a/b/c"));
        assert!(!is_valid("a/b"));
        assert!(!is_valid("/"));
        assert!(!is_valid(""));
        assert!(!is_valid("/a//b"));
        assert!(!is_valid("/a/"));
    }

    #[test]
    fn segments_drop_leading_root() {
        assert_eq!(segments("/A/B/C").unwrap(), vec!["A", "B", "C"]);
        assert!(matches!(
            segments("A/B"),
            Err(StoreError::InvalidPath { .. })
        ));
    }

    #[test]
    fn join_from_root_and_nested() {
        assert_eq!(join("/", "A"), "/A");
        assert_eq!(join("/A", "B"), "/A/B");
        assert_eq!(join("/A/", "B"), "/A/B");
    }
}
