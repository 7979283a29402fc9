//! The catalog: the only artifact a script run produces.
//!
//! Resources keep the order the script registered them in. Dependencies are
//! plain ID values; nothing here checks that they point at a registered
//! resource, and duplicates are kept.

use std::io;

use serde::Serialize;

use crate::error::MarshalError;
use crate::marshal::Marshaler;
use crate::record::StructValue;
use crate::schema::{EXEC, FILE, StructSchema};
use crate::value::ScriptTable;

/// An ordered list of resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
  resources: Vec<Resource>,
}

/// One catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
  pub id: u64,
  pub comment: String,
  pub dependencies: Vec<u64>,
  pub kind: ResourceKind,
}

/// Payload of a resource. Exactly one kind is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
  Noop,
  File(FileSpec),
  Exec(ExecSpec),
}

/// A file to place on the target, shaped by [`FILE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FileSpec(StructValue);

/// A command to run on the target, shaped by [`EXEC`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExecSpec(StructValue);

impl FileSpec {
  pub fn schema() -> &'static StructSchema {
    &FILE
  }

  pub fn build(marshaler: &Marshaler, table: &ScriptTable) -> Result<Self, MarshalError> {
    marshaler.build(table, Self::schema()).map(FileSpec)
  }

  pub fn path(&self) -> Option<&str> {
    self.0.get_text("path")
  }

  pub fn as_struct(&self) -> &StructValue {
    &self.0
  }
}

impl ExecSpec {
  pub fn schema() -> &'static StructSchema {
    &EXEC
  }

  pub fn build(marshaler: &Marshaler, table: &ScriptTable) -> Result<Self, MarshalError> {
    marshaler.build(table, Self::schema()).map(ExecSpec)
  }

  pub fn command(&self) -> Option<&StructValue> {
    self.0.get_struct("command")
  }

  pub fn as_struct(&self) -> &StructValue {
    &self.0
  }
}

impl ResourceKind {
  pub fn name(&self) -> &'static str {
    match self {
      ResourceKind::Noop => "noop",
      ResourceKind::File(_) => "file",
      ResourceKind::Exec(_) => "exec",
    }
  }
}

impl Catalog {
  pub fn new(resources: Vec<Resource>) -> Self {
    Self { resources }
  }

  pub fn resources(&self) -> &[Resource] {
    &self.resources
  }

  pub fn into_resources(self) -> Vec<Resource> {
    self.resources
  }

  pub fn len(&self) -> usize {
    self.resources.len()
  }

  pub fn is_empty(&self) -> bool {
    self.resources.is_empty()
  }

  /// Encode the catalog as CBOR.
  pub fn write_cbor<W: io::Write>(&self, writer: W) -> Result<(), ciborium::ser::Error<io::Error>> {
    ciborium::into_writer(self, writer)
  }

  pub fn to_json_pretty(&self) -> serde_json::Result<String> {
    serde_json::to_string_pretty(self)
  }
}
