//! Resource identifiers.
//!
//! Resources are named by 64-bit IDs. Most IDs are derived from free-form text
//! by hashing it; the low bit of a derived ID is always set so it can be told
//! apart from the explicit IDs a script may hand out through `mcm.id`.

use std::fmt;

use mlua::prelude::*;
use sha2::{Digest, Sha256};

use crate::consts::ID_HASH_PREFIX;

/// A resource identifier together with the comment it is displayed with.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Id {
  value: u64,
  comment: String,
}

impl Id {
  /// An ID chosen by the script author. The value is used as-is.
  pub fn explicit(value: u64, comment: impl Into<String>) -> Self {
    Self {
      value,
      comment: comment.into(),
    }
  }

  pub fn value(&self) -> u64 {
    self.value
  }

  pub fn comment(&self) -> &str {
    &self.comment
  }

  /// Whether the value carries the derived-ID tag bit.
  pub fn is_derived(&self) -> bool {
    self.value & 1 == 1
  }
}

impl fmt::Display for Id {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} (0x{:016x})", self.comment, self.value)
  }
}

/// Derive an ID from text.
///
/// The value is the first 8 bytes of `SHA-256(ID_HASH_PREFIX || text)` read
/// little-endian, with bit 0 forced on. The text becomes the comment.
pub fn derive_id(text: &[u8]) -> Id {
  Id {
    value: id_hash(text),
    comment: String::from_utf8_lossy(text).into_owned(),
  }
}

pub(crate) fn id_hash(text: &[u8]) -> u64 {
  let mut hasher = Sha256::new();
  hasher.update(ID_HASH_PREFIX.as_bytes());
  hasher.update(text);
  let digest = hasher.finalize();

  let mut head = [0u8; 8];
  head.copy_from_slice(&digest[..8]);
  u64::from_le_bytes(head) | 1
}

impl LuaUserData for Id {
  fn add_fields<F: LuaUserDataFields<Self>>(fields: &mut F) {
    // Lua integers are signed; the bit pattern round-trips through `mcm.id`.
    fields.add_field_method_get("value", |_, this| Ok(this.value as i64));
    fields.add_field_method_get("comment", |_, this| Ok(this.comment.clone()));
  }

  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(this.to_string()));
    methods.add_meta_method(LuaMetaMethod::Eq, |_, this, other: LuaAnyUserData| {
      Ok(other.borrow::<Id>().map(|other| *this == *other).unwrap_or(false))
    });
  }
}
