//! luacat-lib: Lua scripts in, resource catalogs out
//!
//! This crate provides the front-end of the catalog compiler:
//! - `Id`: content-derived 64-bit resource identifiers
//! - `tag`: resource-kind tags carried by script tables
//! - `marshal`: schema-driven copying of script tables into records
//! - `lua::Interpreter`: the embedded Lua runtime and its `mcm` module
//! - `Catalog`: the ordered resource list a run produces

pub mod catalog;
pub mod consts;
pub mod error;
pub mod id;
pub mod lua;
pub mod marshal;
pub mod record;
pub mod schema;
pub mod tag;
pub mod value;

pub use catalog::{Catalog, Resource, ResourceKind};
pub use error::{ArgumentError, MarshalError, ScriptError};
pub use id::{Id, derive_id};
pub use lua::{Interpreter, Options, RunState};
