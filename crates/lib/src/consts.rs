//! Constants shared across the crate.

/// Domain-separation prefix hashed in front of every derived resource ID.
pub const ID_HASH_PREFIX: &str = "mcm-luacat ID: ";

/// Metatable key holding a table's resource-kind tag.
pub const RESOURCE_KIND_META_KEY: &str = "mcm_resource";

/// Name of the builder module, both as a global and as a `require` target.
pub const MODULE_NAME: &str = "mcm";

/// Default nesting limit for snapshotting and marshaling script tables.
pub const DEFAULT_MAX_DEPTH: usize = 200;
