//! Schema-bound records.
//!
//! A [`StructValue`] is the builder the marshaler fills in: a record whose
//! shape is fixed by a [`StructSchema`] and whose fields are set one at a time.
//! Unset fields are simply absent, which is also how they serialize.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use crate::error::MarshalError;
use crate::schema::{Field, StructSchema};

/// The value of a single record field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
  Text(String),
  Data(Vec<u8>),
  Struct(StructValue),
  List(Vec<FieldValue>),
}

/// A record of a particular schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructValue {
  schema: &'static StructSchema,
  // Keyed by declaration index so iteration follows the schema.
  fields: BTreeMap<usize, (&'static Field, FieldValue)>,
}

impl StructValue {
  pub fn new(schema: &'static StructSchema) -> Self {
    Self {
      schema,
      fields: BTreeMap::new(),
    }
  }

  pub fn schema(&self) -> &'static StructSchema {
    self.schema
  }

  /// Set a field declared by this record's schema.
  ///
  /// Fails if another member of the same union is already set.
  pub fn set(&mut self, field: &'static Field, value: FieldValue) -> Result<(), MarshalError> {
    let index = self
      .schema
      .fields
      .iter()
      .position(|declared| std::ptr::eq(declared, field))
      .ok_or_else(|| MarshalError::UnknownField {
        schema: self.schema.name,
        field: field.name.to_string(),
      })?;

    if let Some(union) = field.union
      && let Some((other, _)) = self
        .fields
        .values()
        .find(|(other, _)| other.union == Some(union) && other.name != field.name)
    {
      return Err(MarshalError::UnionConflict {
        union,
        first: other.name,
        second: field.name,
      });
    }

    self.fields.insert(index, (field, value));
    Ok(())
  }

  pub fn get(&self, name: &str) -> Option<&FieldValue> {
    let index = self.schema.field_index(name)?;
    self.fields.get(&index).map(|(_, value)| value)
  }

  pub fn get_text(&self, name: &str) -> Option<&str> {
    match self.get(name)? {
      FieldValue::Text(text) => Some(text),
      _ => None,
    }
  }

  pub fn get_data(&self, name: &str) -> Option<&[u8]> {
    match self.get(name)? {
      FieldValue::Data(data) => Some(data),
      _ => None,
    }
  }

  pub fn get_struct(&self, name: &str) -> Option<&StructValue> {
    match self.get(name)? {
      FieldValue::Struct(value) => Some(value),
      _ => None,
    }
  }

  pub fn get_list(&self, name: &str) -> Option<&[FieldValue]> {
    match self.get(name)? {
      FieldValue::List(items) => Some(items),
      _ => None,
    }
  }

  /// The member of `union` that is currently set, if any.
  pub fn which(&self, union: &str) -> Option<&'static str> {
    self
      .fields
      .values()
      .find(|(field, _)| field.union == Some(union))
      .map(|(field, _)| field.name)
  }

  /// Names of the fields that are set, in declaration order.
  pub fn field_names(&self) -> impl Iterator<Item = &'static str> + '_ {
    self.fields.values().map(|(field, _)| field.name)
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }
}

impl Serialize for StructValue {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(self.fields.len()))?;
    for (field, value) in self.fields.values() {
      map.serialize_entry(field.name, value)?;
    }
    map.end()
  }
}

impl Serialize for FieldValue {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      FieldValue::Text(text) => serializer.serialize_str(text),
      FieldValue::Data(data) => serializer.serialize_bytes(data),
      FieldValue::Struct(value) => value.serialize(serializer),
      FieldValue::List(items) => {
        let mut seq = serializer.serialize_seq(Some(items.len()))?;
        for item in items {
          seq.serialize_element(item)?;
        }
        seq.end()
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::schema::{FILE, FILE_SYMLINK};

  fn field(schema: &'static StructSchema, name: &str) -> &'static Field {
    schema.find_field(name).unwrap()
  }

  #[test]
  fn set_and_get_text() {
    let mut file = StructValue::new(&FILE);
    file
      .set(field(&FILE, "path"), FieldValue::Text("/etc/motd".into()))
      .unwrap();
    assert_eq!(file.get_text("path"), Some("/etc/motd"));
    assert_eq!(file.get_data("path"), None);
    assert!(file.get("plain").is_none());
  }

  #[test]
  fn union_members_are_exclusive() {
    let mut file = StructValue::new(&FILE);
    let mut link = StructValue::new(&FILE_SYMLINK);
    link
      .set(field(&FILE_SYMLINK, "target"), FieldValue::Text("/tmp".into()))
      .unwrap();
    file.set(field(&FILE, "symlink"), FieldValue::Struct(link)).unwrap();
    assert_eq!(file.which("which"), Some("symlink"));

    let err = file
      .set(
        field(&FILE, "directory"),
        FieldValue::Struct(StructValue::new(field_schema(&FILE, "directory"))),
      )
      .unwrap_err();
    assert_eq!(
      err,
      MarshalError::UnionConflict {
        union: "which",
        first: "symlink",
        second: "directory",
      }
    );
  }

  fn field_schema(schema: &'static StructSchema, name: &str) -> &'static StructSchema {
    match field(schema, name).ty {
      crate::schema::Type::Struct(inner) => inner,
      other => panic!("{} is not a struct field: {}", name, other),
    }
  }

  #[test]
  fn foreign_field_is_rejected() {
    let mut link = StructValue::new(&FILE_SYMLINK);
    let err = link
      .set(field(&FILE, "path"), FieldValue::Text("x".into()))
      .unwrap_err();
    assert!(matches!(err, MarshalError::UnknownField { .. }));
  }

  #[test]
  fn serializes_set_fields_in_schema_order() {
    let mut file = StructValue::new(&FILE);
    let mut link = StructValue::new(&FILE_SYMLINK);
    link
      .set(field(&FILE_SYMLINK, "target"), FieldValue::Text("/b".into()))
      .unwrap();
    file.set(field(&FILE, "symlink"), FieldValue::Struct(link)).unwrap();
    file.set(field(&FILE, "path"), FieldValue::Text("/a".into())).unwrap();

    let json = serde_json::to_string(&file).unwrap();
    assert_eq!(json, r#"{"path":"/a","symlink":{"target":"/b"}}"#);
    assert_eq!(file.field_names().collect::<Vec<_>>(), ["path", "symlink"]);
  }
}
