//! Runtime-introspectable schema descriptors.
//!
//! The marshaler never knows what a file or exec payload looks like; it walks
//! one of these descriptors instead. Adding a field to a payload is a change
//! to the tables at the bottom of this file and nothing else.

use std::fmt;

/// Declared type of a field or list element.
#[derive(Debug, Clone, Copy)]
pub enum Type {
  Void,
  Bool,
  Int32,
  UInt16,
  UInt64,
  Text,
  Data,
  Struct(&'static StructSchema),
  List(&'static Type),
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Type::Void => f.write_str("Void"),
      Type::Bool => f.write_str("Bool"),
      Type::Int32 => f.write_str("Int32"),
      Type::UInt16 => f.write_str("UInt16"),
      Type::UInt64 => f.write_str("UInt64"),
      Type::Text => f.write_str("Text"),
      Type::Data => f.write_str("Data"),
      Type::Struct(schema) => f.write_str(schema.name),
      Type::List(elem) => write!(f, "List({})", elem),
    }
  }
}

/// A named field of a struct schema.
#[derive(Debug)]
pub struct Field {
  pub name: &'static str,
  pub ty: Type,
  /// Name of the union this field belongs to, if any. At most one member of
  /// a union may be set on a record.
  pub union: Option<&'static str>,
}

impl Field {
  const fn new(name: &'static str, ty: Type) -> Self {
    Self { name, ty, union: None }
  }

  const fn member(union: &'static str, name: &'static str, ty: Type) -> Self {
    Self {
      name,
      ty,
      union: Some(union),
    }
  }
}

/// Shape of a structured record.
#[derive(Debug)]
pub struct StructSchema {
  pub name: &'static str,
  pub fields: &'static [Field],
}

impl StructSchema {
  pub fn find_field(&self, name: &str) -> Option<&'static Field> {
    self.fields.iter().find(|field| field.name == name)
  }

  /// Position of a field in declaration order; used to keep output stable.
  pub fn field_index(&self, name: &str) -> Option<usize> {
    self.fields.iter().position(|field| field.name == name)
  }
}

impl PartialEq for Field {
  fn eq(&self, other: &Self) -> bool {
    std::ptr::eq(self, other)
  }
}

impl Eq for Field {}

impl PartialEq for StructSchema {
  fn eq(&self, other: &Self) -> bool {
    std::ptr::eq(self, other)
  }
}

impl Eq for StructSchema {}

// Catalog payload schemas.

pub static USER_REF: StructSchema = StructSchema {
  name: "UserRef",
  fields: &[Field::member("ref", "id", Type::Int32), Field::member("ref", "name", Type::Text)],
};

pub static GROUP_REF: StructSchema = StructSchema {
  name: "GroupRef",
  fields: &[Field::member("ref", "id", Type::Int32), Field::member("ref", "name", Type::Text)],
};

pub static FILE_MODE: StructSchema = StructSchema {
  name: "File.Mode",
  fields: &[
    Field::new("bits", Type::UInt16),
    Field::new("user", Type::Struct(&USER_REF)),
    Field::new("group", Type::Struct(&GROUP_REF)),
  ],
};

pub static FILE_PLAIN: StructSchema = StructSchema {
  name: "File.Plain",
  fields: &[
    Field::new("content", Type::Data),
    Field::new("mode", Type::Struct(&FILE_MODE)),
  ],
};

pub static FILE_DIRECTORY: StructSchema = StructSchema {
  name: "File.Directory",
  fields: &[Field::new("mode", Type::Struct(&FILE_MODE))],
};

pub static FILE_SYMLINK: StructSchema = StructSchema {
  name: "File.Symlink",
  fields: &[Field::new("target", Type::Text)],
};

pub static FILE: StructSchema = StructSchema {
  name: "File",
  fields: &[
    Field::new("path", Type::Text),
    Field::member("which", "plain", Type::Struct(&FILE_PLAIN)),
    Field::member("which", "directory", Type::Struct(&FILE_DIRECTORY)),
    Field::member("which", "symlink", Type::Struct(&FILE_SYMLINK)),
    Field::member("which", "absent", Type::Void),
  ],
};

pub static ENV_VAR: StructSchema = StructSchema {
  name: "EnvVar",
  fields: &[Field::new("name", Type::Text), Field::new("value", Type::Text)],
};

static TEXT: Type = Type::Text;
static ENV_VAR_ELEM: Type = Type::Struct(&ENV_VAR);

pub static EXEC_COMMAND: StructSchema = StructSchema {
  name: "Exec.Command",
  fields: &[
    Field::member("program", "argv", Type::List(&TEXT)),
    Field::member("program", "bash", Type::Data),
    Field::new("environment", Type::List(&ENV_VAR_ELEM)),
    Field::new("workingDirectory", Type::Text),
  ],
};

pub static EXEC: StructSchema = StructSchema {
  name: "Exec",
  fields: &[
    Field::new("command", Type::Struct(&EXEC_COMMAND)),
    Field::member("condition", "always", Type::Void),
    Field::member("condition", "onlyIf", Type::Struct(&EXEC_COMMAND)),
    Field::member("condition", "unless", Type::Struct(&EXEC_COMMAND)),
    Field::member("condition", "fileAbsent", Type::Text),
  ],
};
