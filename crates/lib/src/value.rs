//! Owned snapshots of script values.
//!
//! The marshaler works on [`ScriptValue`] rather than on live `mlua` values so
//! it can be exercised without an interpreter. Snapshots keep table pairs in
//! iteration order and record `#t` as the script would see it, along with the
//! elements `t[1]..t[#t]` as an indexed read would return them.

use std::collections::HashMap;

use mlua::prelude::*;

use crate::error::MarshalError;

/// A script value, detached from the interpreter.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
  Nil,
  Boolean(bool),
  Integer(i64),
  Number(f64),
  String(Vec<u8>),
  Table(ScriptTable),
  /// Functions, userdata, threads and the like. Only the type name is kept.
  Other(&'static str),
}

static NIL: ScriptValue = ScriptValue::Nil;

/// A snapshot of a script table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptTable {
  pairs: Vec<(ScriptValue, ScriptValue)>,
  len: usize,
  /// `t[1]`, `t[2]`, ... up to `#t` or the first nil.
  slots: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
  /// Position of the raw entry in `pairs`.
  Raw(usize),
  /// Supplied by `__index`.
  Inherited(ScriptValue),
}

impl ScriptValue {
  pub fn str(s: impl AsRef<[u8]>) -> Self {
    ScriptValue::String(s.as_ref().to_vec())
  }

  pub fn type_name(&self) -> &'static str {
    match self {
      ScriptValue::Nil => "nil",
      ScriptValue::Boolean(_) => "boolean",
      ScriptValue::Integer(_) | ScriptValue::Number(_) => "number",
      ScriptValue::String(_) => "string",
      ScriptValue::Table(_) => "table",
      ScriptValue::Other(name) => *name,
    }
  }

  pub fn as_table(&self) -> Option<&ScriptTable> {
    match self {
      ScriptValue::Table(table) => Some(table),
      _ => None,
    }
  }

  /// Snapshot a live Lua value, descending at most `max_depth` tables deep.
  pub fn from_lua(value: &LuaValue, max_depth: usize) -> LuaResult<Self> {
    snapshot(value, 0, max_depth)
  }
}

fn snapshot(value: &LuaValue, depth: usize, max_depth: usize) -> LuaResult<ScriptValue> {
  Ok(match value {
    LuaValue::Nil => ScriptValue::Nil,
    LuaValue::Boolean(b) => ScriptValue::Boolean(*b),
    LuaValue::Integer(i) => ScriptValue::Integer(*i),
    LuaValue::Number(n) => ScriptValue::Number(*n),
    LuaValue::String(s) => ScriptValue::String(s.as_bytes().to_vec()),
    LuaValue::Table(table) => ScriptValue::Table(snapshot_table(table, depth, max_depth)?),
    other => ScriptValue::Other(other.type_name()),
  })
}

fn snapshot_table(table: &LuaTable, depth: usize, max_depth: usize) -> LuaResult<ScriptTable> {
  if depth >= max_depth {
    return Err(LuaError::external(MarshalError::RecursionTooDeep { limit: max_depth }));
  }
  let mut pairs = Vec::new();
  let mut positions = HashMap::new();
  for pair in table.pairs::<LuaValue, LuaValue>() {
    let (key, value) = pair?;
    if let LuaValue::Integer(i) = key {
      positions.insert(i, pairs.len());
    }
    pairs.push((snapshot(&key, depth + 1, max_depth)?, snapshot(&value, depth + 1, max_depth)?));
  }

  let len = table.len()?.max(0);
  let mut slots = Vec::new();
  for i in 1..=len {
    if let Some(&pos) = positions.get(&i) {
      slots.push(Slot::Raw(pos));
      continue;
    }
    let value: LuaValue = table.get(i)?;
    if value.is_nil() {
      break;
    }
    slots.push(Slot::Inherited(snapshot(&value, depth + 1, max_depth)?));
  }

  Ok(ScriptTable {
    pairs,
    len: len as usize,
    slots,
  })
}

impl ScriptTable {
  /// Snapshot a live Lua table, descending at most `max_depth` tables deep.
  pub fn from_lua(table: &LuaTable, max_depth: usize) -> LuaResult<Self> {
    snapshot_table(table, 0, max_depth)
  }

  /// Build a table from key/value pairs. The length is the border `#t`
  /// would report for a proper sequence.
  pub fn from_pairs(pairs: Vec<(ScriptValue, ScriptValue)>) -> Self {
    let positions: HashMap<i64, usize> = pairs
      .iter()
      .enumerate()
      .filter_map(|(pos, (key, value))| match key {
        ScriptValue::Integer(i) if *value != ScriptValue::Nil => Some((*i, pos)),
        _ => None,
      })
      .collect();
    let slots: Vec<Slot> = (1..)
      .map_while(|i| positions.get(&i).map(|&pos| Slot::Raw(pos)))
      .collect();
    Self {
      pairs,
      len: slots.len(),
      slots,
    }
  }

  /// Build a table from string-keyed fields.
  pub fn record<K: AsRef<str>>(fields: impl IntoIterator<Item = (K, ScriptValue)>) -> Self {
    Self::from_pairs(
      fields
        .into_iter()
        .map(|(key, value)| (ScriptValue::str(key.as_ref()), value))
        .collect(),
    )
  }

  /// Build a sequence `{ v1, v2, ... }`.
  pub fn sequence(values: impl IntoIterator<Item = ScriptValue>) -> Self {
    let pairs: Vec<_> = values
      .into_iter()
      .enumerate()
      .map(|(i, value)| (ScriptValue::Integer(i as i64 + 1), value))
      .collect();
    let len = pairs.len();
    Self {
      pairs,
      len,
      slots: (0..len).map(Slot::Raw).collect(),
    }
  }

  pub fn pairs(&self) -> &[(ScriptValue, ScriptValue)] {
    &self.pairs
  }

  /// `#t` as seen by the script when the snapshot was taken.
  pub fn len(&self) -> usize {
    self.len
  }

  pub fn is_empty(&self) -> bool {
    self.pairs.is_empty()
  }

  /// `t[i]` (1-based) as the script read it while `1 <= i <= #t`. Nil past
  /// the first missing element.
  pub fn index(&self, i: usize) -> &ScriptValue {
    match i.checked_sub(1).and_then(|i| self.slots.get(i)) {
      Some(Slot::Raw(pos)) => &self.pairs[*pos].1,
      Some(Slot::Inherited(value)) => value,
      None => &NIL,
    }
  }
}

impl From<ScriptTable> for ScriptValue {
  fn from(table: ScriptTable) -> Self {
    ScriptValue::Table(table)
  }
}
