//! Schema-driven copying of script tables into records.
//!
//! [`copy_struct`] walks a table snapshot against the schema of the record
//! being built. Every key has to name a declared field and every value has to
//! fit that field's type; the first violation aborts the copy and the
//! partially built record is dropped by the caller.

use crate::consts::DEFAULT_MAX_DEPTH;
use crate::error::MarshalError;
use crate::record::{FieldValue, StructValue};
use crate::schema::{StructSchema, Type};
use crate::value::{ScriptTable, ScriptValue};

/// Copies script values into records, bounding how deep it will descend.
#[derive(Debug, Clone, Copy)]
pub struct Marshaler {
  max_depth: usize,
}

impl Default for Marshaler {
  fn default() -> Self {
    Self::new(DEFAULT_MAX_DEPTH)
  }
}

impl Marshaler {
  pub fn new(max_depth: usize) -> Self {
    Self { max_depth }
  }

  pub fn max_depth(&self) -> usize {
    self.max_depth
  }

  /// Copy every pair of `table` into `builder`.
  pub fn copy_struct(&self, table: &ScriptTable, builder: &mut StructValue) -> Result<(), MarshalError> {
    self.copy_struct_at(table, builder, 0)
  }

  /// Build a fresh record of `schema` from `table`.
  pub fn build(&self, table: &ScriptTable, schema: &'static StructSchema) -> Result<StructValue, MarshalError> {
    let mut builder = StructValue::new(schema);
    self.copy_struct(table, &mut builder)?;
    Ok(builder)
  }

  fn descend(&self, depth: usize) -> Result<usize, MarshalError> {
    if depth >= self.max_depth {
      return Err(MarshalError::RecursionTooDeep { limit: self.max_depth });
    }
    Ok(depth + 1)
  }

  fn copy_struct_at(&self, table: &ScriptTable, builder: &mut StructValue, depth: usize) -> Result<(), MarshalError> {
    let depth = self.descend(depth)?;
    let schema = builder.schema();

    for (key, value) in table.pairs() {
      let ScriptValue::String(raw_key) = key else {
        return Err(MarshalError::NonStringKey {
          found: key.type_name().to_string(),
        });
      };
      let key = String::from_utf8_lossy(raw_key);
      let field = schema.find_field(&key).ok_or_else(|| MarshalError::UnknownField {
        schema: schema.name,
        field: key.to_string(),
      })?;

      let copied = match field.ty {
        Type::Text => match (value, text_value(value)) {
          (_, Some(text)) => FieldValue::Text(text),
          (ScriptValue::String(_), None) => {
            return Err(MarshalError::TypeMismatch {
              field: field.name,
              expected: "text",
              found: "non-UTF-8 string".to_string(),
            });
          }
          _ => return Err(mismatch(field.name, "text", value)),
        },
        Type::Data => match value {
          ScriptValue::String(bytes) => FieldValue::Data(bytes.clone()),
          _ => return Err(mismatch(field.name, "data", value)),
        },
        Type::Struct(sub_schema) => {
          let ScriptValue::Table(sub_table) = value else {
            return Err(mismatch(field.name, "struct", value));
          };
          let mut sub = StructValue::new(sub_schema);
          self.copy_struct_at(sub_table, &mut sub, depth)?;
          FieldValue::Struct(sub)
        }
        Type::List(element) => {
          let ScriptValue::Table(list) = value else {
            return Err(mismatch(field.name, "list", value));
          };
          let len = list.len();
          let mut items = Vec::new();
          if len > 0 {
            self.copy_list_at(list, element, len, &mut items, depth)?;
          }
          FieldValue::List(items)
        }
        other => {
          return Err(MarshalError::UnsupportedFieldType {
            field: field.name,
            ty: other.to_string(),
          });
        }
      };

      builder.set(field, copied)?;
    }

    Ok(())
  }

  /// Copy elements `1..=len` of `list` as `element` values.
  ///
  /// `len` may come from `__len`, so it is never used to size the output.
  pub fn copy_list(&self, list: &ScriptTable, element: &Type, len: usize) -> Result<Vec<FieldValue>, MarshalError> {
    let mut items = Vec::new();
    self.copy_list_at(list, element, len, &mut items, 0)?;
    Ok(items)
  }

  fn copy_list_at(
    &self,
    list: &ScriptTable,
    element: &Type,
    len: usize,
    items: &mut Vec<FieldValue>,
    depth: usize,
  ) -> Result<(), MarshalError> {
    let depth = self.descend(depth)?;

    match *element {
      Type::Text => {
        for index in 1..=len {
          let text = text_value(list.index(index)).ok_or(MarshalError::NonTextElement { index })?;
          items.push(FieldValue::Text(text));
        }
      }
      Type::Struct(schema) => {
        for index in 1..=len {
          let ScriptValue::Table(entry) = list.index(index) else {
            return Err(MarshalError::NonStructElement { index });
          };
          let mut sub = StructValue::new(schema);
          self.copy_struct_at(entry, &mut sub, depth)?;
          items.push(FieldValue::Struct(sub));
        }
      }
      other => {
        return Err(MarshalError::UnsupportedElementType { ty: other.to_string() });
      }
    }

    Ok(())
  }
}

/// A string that is valid UTF-8; numbers are not coerced.
fn text_value(value: &ScriptValue) -> Option<String> {
  match value {
    ScriptValue::String(bytes) => String::from_utf8(bytes.clone()).ok(),
    _ => None,
  }
}

fn mismatch(field: &'static str, expected: &'static str, found: &ScriptValue) -> MarshalError {
  MarshalError::TypeMismatch {
    field,
    expected,
    found: found.type_name().to_string(),
  }
}

/// Copy `table` into `builder` with the default depth limit.
pub fn copy_struct(table: &ScriptTable, builder: &mut StructValue) -> Result<(), MarshalError> {
  Marshaler::default().copy_struct(table, builder)
}

#[cfg(test)]
mod tests {
  use mlua::prelude::*;

  use super::*;
  use crate::schema::{EXEC, FILE, Field};

  static CHILD: StructSchema = StructSchema {
    name: "Child",
    fields: &[Field {
      name: "value",
      ty: Type::Text,
      union: None,
    }],
  };

  static PARENT: StructSchema = StructSchema {
    name: "Parent",
    fields: &[
      Field {
        name: "name",
        ty: Type::Text,
        union: None,
      },
      Field {
        name: "child",
        ty: Type::Struct(&CHILD),
        union: None,
      },
    ],
  };

  fn s(text: &str) -> ScriptValue {
    ScriptValue::str(text)
  }

  fn record(fields: Vec<(&str, ScriptValue)>) -> ScriptTable {
    ScriptTable::record(fields)
  }

  fn seq(values: Vec<ScriptValue>) -> ScriptValue {
    ScriptTable::sequence(values).into()
  }

  #[test]
  fn copies_nested_struct() {
    let input = record(vec![("name", s("a")), ("child", record(vec![("value", s("b"))]).into())]);

    let out = Marshaler::default().build(&input, &PARENT).unwrap();

    assert_eq!(out.get_text("name"), Some("a"));
    assert_eq!(out.get_struct("child").and_then(|c| c.get_text("value")), Some("b"));
  }

  #[test]
  fn rejects_unknown_field() {
    let input = record(vec![("unknownField", s("x"))]);
    let err = Marshaler::default().build(&input, &PARENT).unwrap_err();
    assert_eq!(
      err,
      MarshalError::UnknownField {
        schema: "Parent",
        field: "unknownField".to_string(),
      }
    );
  }

  #[test]
  fn rejects_number_for_text() {
    let input = record(vec![("name", ScriptValue::Integer(5))]);
    let err = Marshaler::default().build(&input, &PARENT).unwrap_err();
    assert_eq!(
      err,
      MarshalError::TypeMismatch {
        field: "name",
        expected: "text",
        found: "number".to_string(),
      }
    );
  }

  #[test]
  fn rejects_non_string_key() {
    let input = ScriptTable::from_pairs(vec![(ScriptValue::Boolean(true), s("x"))]);
    let err = Marshaler::default().build(&input, &PARENT).unwrap_err();
    assert!(matches!(err, MarshalError::NonStringKey { ref found } if found == "boolean"));
  }

  #[test]
  fn rejects_integer_key() {
    let input = ScriptTable::sequence([s("x")]);
    let err = Marshaler::default().build(&input, &PARENT).unwrap_err();
    assert!(matches!(err, MarshalError::NonStringKey { .. }));
  }

  #[test]
  fn rejects_invalid_utf8_for_text() {
    let input = record(vec![("name", ScriptValue::String(vec![0xff, 0xfe]))]);
    let err = Marshaler::default().build(&input, &PARENT).unwrap_err();
    assert!(matches!(err, MarshalError::TypeMismatch { ref found, .. } if found == "non-UTF-8 string"));
  }

  #[test]
  fn rejects_scalar_for_struct() {
    let input = record(vec![("child", s("b"))]);
    let err = Marshaler::default().build(&input, &PARENT).unwrap_err();
    assert!(matches!(err, MarshalError::TypeMismatch { expected: "struct", .. }));
  }

  #[test]
  fn data_fields_take_raw_bytes() {
    let content = ScriptValue::String(vec![0, 159, 146, 150]);
    let input = record(vec![
      ("path", s("/bin/blob")),
      ("plain", record(vec![("content", content)]).into()),
    ]);

    let out = Marshaler::default().build(&input, &FILE).unwrap();
    let plain = out.get_struct("plain").unwrap();
    assert_eq!(plain.get_data("content"), Some(&[0u8, 159, 146, 150][..]));
    assert_eq!(out.which("which"), Some("plain"));
  }

  #[test]
  fn data_rejects_tables() {
    let input = record(vec![("plain", record(vec![("content", record(vec![]).into())]).into())]);
    let err = Marshaler::default().build(&input, &FILE).unwrap_err();
    assert!(matches!(err, MarshalError::TypeMismatch { expected: "data", .. }));
  }

  #[test]
  fn copies_text_list() {
    let command = record(vec![("argv", seq(vec![s("apt-get"), s("update")]))]);
    let input = record(vec![("command", command.into())]);

    let out = Marshaler::default().build(&input, &EXEC).unwrap();
    let argv = out.get_struct("command").and_then(|c| c.get_list("argv")).unwrap();
    assert_eq!(argv, [FieldValue::Text("apt-get".into()), FieldValue::Text("update".into())]);
  }

  #[test]
  fn copies_struct_list() {
    let env = seq(vec![
      record(vec![("name", s("LANG")), ("value", s("C"))]).into(),
      record(vec![("name", s("HOME")), ("value", s("/root"))]).into(),
    ]);
    let command = record(vec![("argv", seq(vec![s("true")])), ("environment", env)]);
    let input = record(vec![("command", command.into())]);

    let out = Marshaler::default().build(&input, &EXEC).unwrap();
    let environment = out
      .get_struct("command")
      .and_then(|c| c.get_list("environment"))
      .unwrap();
    assert_eq!(environment.len(), 2);
    let FieldValue::Struct(first) = &environment[0] else {
      panic!("expected struct element");
    };
    assert_eq!(first.get_text("name"), Some("LANG"));
    assert_eq!(first.get_text("value"), Some("C"));
  }

  #[test]
  fn empty_list_is_initialized() {
    let command = record(vec![("argv", seq(vec![]))]);
    let input = record(vec![("command", command.into())]);
    let out = Marshaler::default().build(&input, &EXEC).unwrap();
    let argv = out.get_struct("command").and_then(|c| c.get_list("argv")).unwrap();
    assert!(argv.is_empty());
  }

  #[test]
  fn list_rejects_non_text_element() {
    let command = record(vec![("argv", seq(vec![s("echo"), ScriptValue::Integer(1)]))]);
    let input = record(vec![("command", command.into())]);
    let err = Marshaler::default().build(&input, &EXEC).unwrap_err();
    assert_eq!(err, MarshalError::NonTextElement { index: 2 });
  }

  #[test]
  fn list_rejects_non_struct_element() {
    let command = record(vec![("environment", seq(vec![s("LANG=C")]))]);
    let input = record(vec![("command", command.into())]);
    let err = Marshaler::default().build(&input, &EXEC).unwrap_err();
    assert_eq!(err, MarshalError::NonStructElement { index: 1 });
  }

  fn exec_payload(lua: &Lua, argv: &str) -> LuaResult<ScriptTable> {
    let table: LuaTable = lua
      .load(format!("return {{ command = {{ argv = {argv} }} }}"))
      .eval()?;
    ScriptTable::from_lua(&table, 16)
  }

  #[test]
  fn huge_len_list_fails_at_first_missing_element() -> LuaResult<()> {
    let lua = Lua::new();

    let empty = exec_payload(&lua, "setmetatable({}, { __len = function() return math.maxinteger end })")?;
    let err = Marshaler::default().build(&empty, &EXEC).unwrap_err();
    assert_eq!(err, MarshalError::NonTextElement { index: 1 });

    let one = exec_payload(
      &lua,
      r#"setmetatable({ "echo" }, { __len = function() return math.maxinteger end })"#,
    )?;
    let err = Marshaler::default().build(&one, &EXEC).unwrap_err();
    assert_eq!(err, MarshalError::NonTextElement { index: 2 });
    Ok(())
  }

  #[test]
  fn list_elements_come_through_index_metamethod() -> LuaResult<()> {
    let lua = Lua::new();
    let input = exec_payload(
      &lua,
      r#"setmetatable({}, {
        __len = function() return 2 end,
        __index = function(_, i) return "arg" .. i end,
      })"#,
    )?;

    let out = Marshaler::default().build(&input, &EXEC).unwrap();
    let argv = out.get_struct("command").and_then(|c| c.get_list("argv")).unwrap();
    assert_eq!(argv, [FieldValue::Text("arg1".into()), FieldValue::Text("arg2".into())]);
    Ok(())
  }

  #[test]
  fn long_list_copies_every_element() {
    let values: Vec<_> = (0..50_000).map(|i| s(&i.to_string())).collect();
    let command = record(vec![("argv", seq(values))]);
    let input = record(vec![("command", command.into())]);

    let out = Marshaler::default().build(&input, &EXEC).unwrap();
    let argv = out.get_struct("command").and_then(|c| c.get_list("argv")).unwrap();
    assert_eq!(argv.len(), 50_000);
    assert_eq!(argv[49_999], FieldValue::Text("49999".into()));
  }

  #[test]
  fn list_field_rejects_scalar() {
    let command = record(vec![("argv", s("echo hi"))]);
    let input = record(vec![("command", command.into())]);
    let err = Marshaler::default().build(&input, &EXEC).unwrap_err();
    assert!(matches!(err, MarshalError::TypeMismatch { expected: "list", .. }));
  }

  #[test]
  fn unsupported_field_type_is_an_error() {
    let input = record(vec![("always", ScriptValue::Boolean(true))]);
    let err = Marshaler::default().build(&input, &EXEC).unwrap_err();
    assert_eq!(
      err,
      MarshalError::UnsupportedFieldType {
        field: "always",
        ty: "Void".to_string(),
      }
    );
  }

  #[test]
  fn unsupported_element_type_is_an_error() {
    static INT: Type = Type::Int32;
    let list = ScriptTable::sequence([ScriptValue::Integer(1)]);
    let err = Marshaler::default().copy_list(&list, &INT, 1).unwrap_err();
    assert_eq!(err, MarshalError::UnsupportedElementType { ty: "Int32".to_string() });
  }

  #[test]
  fn union_conflict_is_reported() {
    let input = record(vec![
      ("plain", record(vec![]).into()),
      ("symlink", record(vec![("target", s("/x"))]).into()),
    ]);
    let err = Marshaler::default().build(&input, &FILE).unwrap_err();
    assert!(matches!(err, MarshalError::UnionConflict { union: "which", .. }));
  }

  #[test]
  fn depth_limit_is_enforced() {
    let input = record(vec![("child", record(vec![("value", s("b"))]).into())]);

    let err = Marshaler::new(1).build(&input, &PARENT).unwrap_err();
    assert_eq!(err, MarshalError::RecursionTooDeep { limit: 1 });

    assert!(Marshaler::new(2).build(&input, &PARENT).is_ok());
  }

  #[test]
  fn free_function_uses_default_marshaler() {
    let mut builder = StructValue::new(&PARENT);
    copy_struct(&record(vec![("name", s("a"))]), &mut builder).unwrap();
    assert_eq!(builder.get_text("name"), Some("a"));
  }
}
