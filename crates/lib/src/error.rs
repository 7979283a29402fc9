//! Error types raised while turning a script into a catalog.
//!
//! Builder functions and the marshaler return these as plain `Result`s. They
//! only become Lua errors at the closure boundary in [`crate::lua::globals`],
//! and every Lua error leaving a script run is reported as a [`ScriptError`].

use std::path::PathBuf;

use thiserror::Error;

/// Misuse of a builder function: wrong arity, wrong type or a missing tag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
  #[error("'{func}' takes {expected} argument(s), got {got}")]
  Arity {
    func: &'static str,
    expected: usize,
    got: usize,
  },

  #[error("bad argument #{arg} to '{func}' ({expected} expected, got {got})")]
  Type {
    func: &'static str,
    arg: usize,
    expected: &'static str,
    got: String,
  },

  #[error("bad argument #3 to '{func}' (expected tagged resource table)")]
  UntaggedResource { func: &'static str },
}

/// Failure to copy a script value into a schema-described record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarshalError {
  #[error("copy_struct: non-string key in table (got {found})")]
  NonStringKey { found: String },

  #[error("copy_struct: unknown field '{field}' for {schema}")]
  UnknownField { schema: &'static str, field: String },

  #[error("copy_struct: type mismatch for field '{field}': expected {expected}, got {found}")]
  TypeMismatch {
    field: &'static str,
    expected: &'static str,
    found: String,
  },

  #[error("copy_struct: field '{field}' has unsupported type {ty}")]
  UnsupportedFieldType { field: &'static str, ty: String },

  #[error("copy_list: non-text element at index {index}")]
  NonTextElement { index: usize },

  #[error("copy_list: non-struct element at index {index}")]
  NonStructElement { index: usize },

  #[error("copy_list: unsupported element type {ty}")]
  UnsupportedElementType { ty: String },

  #[error("copy_struct: fields '{first}' and '{second}' are both members of union '{union}'")]
  UnionConflict {
    union: &'static str,
    first: &'static str,
    second: &'static str,
  },

  #[error("recursion too deep (limit {limit})")]
  RecursionTooDeep { limit: usize },
}

/// Terminal failure of a script run.
#[derive(Debug, Error)]
pub enum ScriptError {
  #[error("cannot read '{}': {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("{message}")]
  Lua { message: String },
}

impl From<mlua::Error> for ScriptError {
  fn from(err: mlua::Error) -> Self {
    ScriptError::Lua {
      message: err.to_string(),
    }
  }
}

impl From<ArgumentError> for mlua::Error {
  fn from(err: ArgumentError) -> Self {
    mlua::Error::external(err)
  }
}

impl From<MarshalError> for mlua::Error {
  fn from(err: MarshalError) -> Self {
    mlua::Error::external(err)
  }
}
