use std::cell::RefCell;
use std::rc::Rc;

use mlua::prelude::*;

use crate::lua::Collector;
use crate::lua::globals;
use crate::marshal::Marshaler;

/// Create a Lua state for catalog scripts.
///
/// Only the pure libraries are opened: base, package, coroutine, table,
/// string, math and utf8. Scripts get no `io`, `os` or `debug`. The `mcm`
/// module is registered on top.
pub fn create_runtime(collector: Rc<RefCell<Collector>>, marshaler: Marshaler) -> LuaResult<Lua> {
  let libs = LuaStdLib::PACKAGE
    | LuaStdLib::COROUTINE
    | LuaStdLib::TABLE
    | LuaStdLib::STRING
    | LuaStdLib::MATH
    | LuaStdLib::UTF8;
  let lua = Lua::new_with(libs, LuaOptions::default())?;

  globals::register_globals(&lua, collector, marshaler)?;

  Ok(lua)
}

/// Load and execute one chunk. `name` is the chunk name Lua reports in
/// errors and tracebacks (`@path` for files).
pub fn exec_chunk(lua: &Lua, name: &str, source: &[u8]) -> LuaResult<()> {
  tracing::debug!(chunk = %name, bytes = source.len(), "loading chunk");
  lua.load(source).set_name(name).exec()
}
