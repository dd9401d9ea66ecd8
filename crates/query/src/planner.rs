//! Flattens a parsed query into the ordered list of `(path, version)` lookups.

use arbor_store::path;
use serde::{Deserialize, Serialize};

use crate::QueryError;
use crate::ast::{Argument, Document, Field, Value};
use crate::parser::parse_query;

/// Version sentinel meaning "whatever the path's current version is".
pub const CURRENT_VERSION: i64 = -1;

/// One store lookup derived from a leaf field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub path: String,
    /// Explicit version, or `CURRENT_VERSION`.
    pub version: i64,
}

impl Selection {
    pub fn new(path: impl Into<String>, version: i64) -> Self {
        Self {
            path: path.into(),
            version,
        }
    }

    pub fn current(path: impl Into<String>) -> Self {
        Self::new(path, CURRENT_VERSION)
    }

    pub fn is_current(&self) -> bool {
        self.version == CURRENT_VERSION
    }
}

/// Parse query text and plan its selections.
pub fn plan(query: &str) -> Result<Vec<Selection>, QueryError> {
    let document = parse_query(query)?;
    plan_document(&document)
}

/// Selections for every top-level field, in depth-first field order.
pub fn plan_document(document: &Document) -> Result<Vec<Selection>, QueryError> {
    let mut selections = Vec::new();
    for field in &document.fields {
        collect(field, "/", &mut selections)?;
    }
    Ok(selections)
}

/// Selections contributed by `field` under `prefix`.
pub fn selections_for_field(field: &Field, prefix: &str) -> Result<Vec<Selection>, QueryError> {
    let mut selections = Vec::new();
    collect(field, prefix, &mut selections)?;
    Ok(selections)
}

fn collect(field: &Field, prefix: &str, out: &mut Vec<Selection>) -> Result<(), QueryError> {
    let field_path = path::join(prefix, &field.name);
    if field.is_leaf() {
        let version = field_version(&field.arguments)?;
        out.push(Selection::new(field_path, version));
    } else {
        for child in &field.selection_set {
            collect(child, &field_path, out)?;
        }
    }
    Ok(())
}

/// The `version` argument of a leaf; absent means current.
pub fn field_version(arguments: &[Argument]) -> Result<i64, QueryError> {
    match arguments.iter().find(|a| a.name == "version") {
        None => Ok(CURRENT_VERSION),
        Some(Argument {
            value: Value::Int(version),
            ..
        }) => Ok(*version),
        Some(arg) => {
            tracing::debug!(kind = arg.value.kind(), "rejected version argument");
            Err(QueryError::invalid_query("invalid version provided"))
        }
    }
}
