//! Query engine: turns a nested selection query into one assembled result tree.
//!
//! ```text
//! query text -> parser -> planner (ordered selections) -> store lookups -> assembler
//! ```
//!
//! # Invariants
//! - Selections come out in left-to-right, depth-first field order; merging depends on it.
//! - Parse, version and path errors are raised before any storage call.
//! - A leaf with no stored value is omitted from the result, never reported as an error.

pub mod assembler;
pub mod ast;
pub mod engine;
pub mod error;
mod lexer;
pub mod parser;
pub mod planner;
pub mod tree;

pub use assembler::assemble;
pub use engine::QueryEngine;
pub use error::{ParseError, QueryError, Span};
pub use parser::{MAX_DEPTH, parse_query};
pub use planner::{CURRENT_VERSION, Selection, plan, plan_document};
pub use tree::{Node, ResultTree};
