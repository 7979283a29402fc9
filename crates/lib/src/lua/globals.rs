//! The `mcm` builder module.
//!
//! Registered both as the `mcm` global and in `package.loaded`, so scripts may
//! use it directly or through `require "mcm"`:
//!
//! - `mcm.hash(text)` - derive an ID from text
//! - `mcm.id(value, comment)` - an explicit ID
//! - `mcm.file{...}` / `mcm.exec{...}` - tag a table with a resource kind
//! - `mcm.noop` - a pre-tagged empty resource
//! - `mcm.resource(id, deps, tagged)` - register a resource

use std::cell::RefCell;
use std::rc::Rc;

use mlua::prelude::*;

use crate::catalog::{ExecSpec, FileSpec, Resource, ResourceKind};
use crate::consts::MODULE_NAME;
use crate::error::ArgumentError;
use crate::id::{Id, derive_id};
use crate::lua::Collector;
use crate::marshal::Marshaler;
use crate::tag::{self, ResourceKindTag};
use crate::value::ScriptTable;

const HASH: &str = "mcm.hash";
const ID: &str = "mcm.id";
const FILE: &str = "mcm.file";
const EXEC: &str = "mcm.exec";
const RESOURCE: &str = "mcm.resource";

/// Build the `mcm` module and install it.
pub fn register_globals(lua: &Lua, collector: Rc<RefCell<Collector>>, marshaler: Marshaler) -> LuaResult<()> {
  let mcm = lua.create_table()?;

  mcm.set(
    "hash",
    lua.create_function(|lua, args: LuaMultiValue| {
      check_arity(HASH, 1, args.len())?;
      let text = args.into_iter().next().unwrap_or(LuaValue::Nil);
      let text = string_arg(lua, HASH, 1, &text)?;
      Ok(derive_id(&text))
    })?,
  )?;

  mcm.set(
    "id",
    lua.create_function(|_, args: LuaMultiValue| {
      check_arity(ID, 2, args.len())?;
      let mut args = args.into_iter();
      let value = match args.next() {
        // Bit pattern is kept, so negative integers map to the high half.
        Some(LuaValue::Integer(value)) => value as u64,
        other => return Err(type_error(ID, 1, "integer", other.as_ref()).into_lua_err()),
      };
      let comment = match args.next() {
        Some(LuaValue::String(comment)) => comment.to_string_lossy(),
        other => return Err(type_error(ID, 2, "string", other.as_ref()).into_lua_err()),
      };
      Ok(Id::explicit(value, comment))
    })?,
  )?;

  mcm.set("file", kind_marker(lua, FILE, ResourceKindTag::File)?)?;
  mcm.set("exec", kind_marker(lua, EXEC, ResourceKindTag::Exec)?)?;
  mcm.set("noop", tag::noop_table(lua)?)?;

  mcm.set(
    "resource",
    lua.create_function(move |lua, args: LuaMultiValue| {
      let resource = build_resource(lua, args, &marshaler)?;
      collector.borrow_mut().push(resource);
      Ok(())
    })?,
  )?;

  let package: LuaTable = lua.globals().get("package")?;
  let loaded: LuaTable = package.get("loaded")?;
  loaded.set(MODULE_NAME, &mcm)?;
  lua.globals().set(MODULE_NAME, mcm)?;

  Ok(())
}

/// `mcm.file` / `mcm.exec`: tag the single table argument and return it.
fn kind_marker(lua: &Lua, func: &'static str, kind: ResourceKindTag) -> LuaResult<LuaFunction> {
  lua.create_function(move |lua, args: LuaMultiValue| {
    check_arity(func, 1, args.len())?;
    let table = match args.into_iter().next() {
      Some(LuaValue::Table(table)) => table,
      other => return Err(type_error(func, 1, "table", other.as_ref()).into_lua_err()),
    };
    tag::tag(lua, &table, kind)?;
    Ok(table)
  })
}

fn build_resource(lua: &Lua, args: LuaMultiValue, marshaler: &Marshaler) -> LuaResult<Resource> {
  check_arity(RESOURCE, 3, args.len())?;
  let mut args = args.into_iter();
  let mut next = || args.next().unwrap_or(LuaValue::Nil);
  let (id_arg, deps_arg, payload_arg) = (next(), next(), next());

  let LuaValue::Table(deps) = deps_arg else {
    return Err(type_error(RESOURCE, 2, "table", Some(&deps_arg)).into_lua_err());
  };
  let LuaValue::Table(payload) = payload_arg else {
    return Err(type_error(RESOURCE, 3, "table", Some(&payload_arg)).into_lua_err());
  };
  let kind = tag::kind_of(&payload).ok_or(ArgumentError::UntaggedResource { func: RESOURCE }.into_lua_err())?;

  let id = resolve_id(lua, 1, &id_arg)?;

  let mut dependencies = Vec::new();
  for index in 1..=deps.len()? {
    let dep: LuaValue = deps.get(index)?;
    dependencies.push(resolve_id(lua, 2, &dep)?.value());
  }

  let kind = match kind {
    ResourceKindTag::Noop => ResourceKind::Noop,
    ResourceKindTag::File => {
      let table = ScriptTable::from_lua(&payload, marshaler.max_depth())?;
      ResourceKind::File(FileSpec::build(marshaler, &table)?)
    }
    ResourceKindTag::Exec => {
      let table = ScriptTable::from_lua(&payload, marshaler.max_depth())?;
      ResourceKind::Exec(ExecSpec::build(marshaler, &table)?)
    }
  };

  Ok(Resource {
    id: id.value(),
    comment: id.comment().to_string(),
    dependencies,
    kind,
  })
}

/// An `mcm.hash`/`mcm.id` value, or text to derive an ID from.
fn resolve_id(lua: &Lua, arg: usize, value: &LuaValue) -> LuaResult<Id> {
  if let LuaValue::UserData(ud) = value
    && let Ok(id) = ud.borrow::<Id>()
  {
    return Ok((*id).clone());
  }
  match value {
    LuaValue::String(_) | LuaValue::Integer(_) | LuaValue::Number(_) => {
      let text = string_arg(lua, RESOURCE, arg, value)?;
      Ok(derive_id(&text))
    }
    _ => Err(type_error(RESOURCE, arg, "mcm.hash or string", Some(value)).into_lua_err()),
  }
}

/// Bytes of a string argument. Numbers convert the way Lua converts them.
fn string_arg(lua: &Lua, func: &'static str, arg: usize, value: &LuaValue) -> LuaResult<Vec<u8>> {
  match value {
    LuaValue::String(s) => Ok(s.as_bytes().to_vec()),
    LuaValue::Integer(_) | LuaValue::Number(_) => match lua.coerce_string(value.clone())? {
      Some(s) => Ok(s.as_bytes().to_vec()),
      None => Err(type_error(func, arg, "string", Some(value)).into_lua_err()),
    },
    _ => Err(type_error(func, arg, "string", Some(value)).into_lua_err()),
  }
}

fn check_arity(func: &'static str, expected: usize, got: usize) -> Result<(), ArgumentError> {
  if got != expected {
    return Err(ArgumentError::Arity { func, expected, got });
  }
  Ok(())
}

fn type_error(func: &'static str, arg: usize, expected: &'static str, got: Option<&LuaValue>) -> ArgumentError {
  ArgumentError::Type {
    func,
    arg,
    expected,
    got: got.map_or("no value", LuaValue::type_name).to_string(),
  }
}
