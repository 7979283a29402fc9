//! Resource-kind tags on script tables.
//!
//! `mcm.file{...}` and `mcm.exec{...}` don't build anything: they mark the
//! table with the kind of payload it should later be marshaled into. The mark
//! lives in the table's metatable under [`RESOURCE_KIND_META_KEY`] as a
//! userdata value, so a script cannot fake it with a plain string.
//!
//! Tagging never hides behavior a table already had. When the table carries a
//! metatable, the new metatable starts as a copy of the old one's entries
//! (metamethods included) and keeps the old one as its parent through
//! `__index`, so plain lookups on the metatable still fall through to it.

use std::fmt;

use mlua::prelude::*;

use crate::consts::RESOURCE_KIND_META_KEY;

/// Payload shape a tagged table will be interpreted as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKindTag {
  Noop,
  File,
  Exec,
}

impl ResourceKindTag {
  pub fn as_str(self) -> &'static str {
    match self {
      ResourceKindTag::Noop => "noop",
      ResourceKindTag::File => "file",
      ResourceKindTag::Exec => "exec",
    }
  }
}

impl fmt::Display for ResourceKindTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl LuaUserData for ResourceKindTag {
  fn add_methods<M: LuaUserDataMethods<Self>>(methods: &mut M) {
    methods.add_meta_method(LuaMetaMethod::ToString, |_, this, ()| Ok(format!("mcm.{}", this)));
  }
}

/// Attach `kind` to `table`, preserving any metatable it already has.
pub fn tag(lua: &Lua, table: &LuaTable, kind: ResourceKindTag) -> LuaResult<()> {
  let meta = lua.create_table()?;

  if let Some(previous) = table.metatable() {
    for pair in previous.pairs::<LuaValue, LuaValue>() {
      let (key, value) = pair?;
      meta.raw_set(key, value)?;
    }
    let parent = lua.create_table_with_capacity(0, 1)?;
    parent.raw_set("__index", previous)?;
    meta.set_metatable(Some(parent))?;
  }

  meta.raw_set(RESOURCE_KIND_META_KEY, kind)?;
  table.set_metatable(Some(meta))?;
  Ok(())
}

/// Read the kind tag of `table`, if it has one.
pub fn kind_of(table: &LuaTable) -> Option<ResourceKindTag> {
  let meta = table.metatable()?;
  match meta.raw_get::<LuaValue>(RESOURCE_KIND_META_KEY).ok()? {
    LuaValue::UserData(ud) => ud.borrow::<ResourceKindTag>().ok().map(|kind| *kind),
    _ => None,
  }
}

/// Create the pre-tagged `mcm.noop` table.
pub fn noop_table(lua: &Lua) -> LuaResult<LuaTable> {
  let noop = lua.create_table()?;
  tag(lua, &noop, ResourceKindTag::Noop)?;
  Ok(noop)
}
