//! Syntax tree for selection queries.

use crate::Span;

/// A whole query: an optional operation header and its top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Name after the `query` keyword, if one was given.
    pub name: Option<String>,
    pub fields: Vec<Field>,
}

/// One field. A field with children is a branch; without, a leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub arguments: Vec<Argument>,
    pub selection_set: Vec<Field>,
    pub span: Span,
}

impl Field {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            selection_set: Vec::new(),
            span: Span::default(),
        }
    }

    pub fn branch(name: impl Into<String>, children: Vec<Field>) -> Self {
        Self {
            selection_set: children,
            ..Self::leaf(name)
        }
    }

    pub fn with_argument(mut self, name: impl Into<String>, value: Value) -> Self {
        self.arguments.push(Argument {
            name: name.into(),
            value,
            span: Span::default(),
        });
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.selection_set.is_empty()
    }

    /// Value of the named argument, if present.
    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.name == name)
    }
}

/// `name: value` inside a field's parentheses.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub value: Value,
    pub span: Span,
}

/// Literal argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
    /// Bare name: `true`, `false`, `null` or an enum-like word.
    Name(String),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Name(_) => "name",
        }
    }
}
