//! Lua runtime and script evaluation.
//!
//! An [`Interpreter`] owns one Lua state with the `mcm` module installed and
//! collects every resource the scripts it runs register. Typical usage is one
//! or more calls to [`Interpreter::run`] followed by [`Interpreter::finish`].
//!
//! # Submodules
//!
//! - [`globals`] - the `mcm` builder module
//! - [`runtime`] - Lua VM construction and chunk loading

pub mod globals;
pub mod runtime;

use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Resource};
use crate::consts::DEFAULT_MAX_DEPTH;
use crate::error::ScriptError;
use crate::marshal::Marshaler;

/// Interpreter settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
  /// How many tables deep a resource payload may nest.
  pub max_depth: usize,
}

impl Default for Options {
  fn default() -> Self {
    Self {
      max_depth: DEFAULT_MAX_DEPTH,
    }
  }
}

/// Where the interpreter is in its most recent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
  Created,
  Running,
  Finished,
  Failed,
}

/// Resources registered so far, in registration order.
#[derive(Debug, Default)]
pub struct Collector {
  resources: Vec<Resource>,
  seen: HashSet<u64>,
}

impl Collector {
  pub fn push(&mut self, resource: Resource) {
    if !self.seen.insert(resource.id) {
      warn!(
        id = format_args!("0x{:016x}", resource.id),
        comment = %resource.comment,
        "duplicate resource id, keeping both"
      );
    }
    debug!(
      id = format_args!("0x{:016x}", resource.id),
      comment = %resource.comment,
      kind = resource.kind.name(),
      dependencies = resource.dependencies.len(),
      "registered resource"
    );
    self.resources.push(resource);
  }

  pub fn len(&self) -> usize {
    self.resources.len()
  }

  pub fn is_empty(&self) -> bool {
    self.resources.is_empty()
  }

  /// Move the collected resources out as a catalog.
  pub fn take(&mut self) -> Catalog {
    self.seen.clear();
    Catalog::new(std::mem::take(&mut self.resources))
  }
}

/// A Lua state that turns scripts into a catalog.
pub struct Interpreter {
  lua: Lua,
  collector: Rc<RefCell<Collector>>,
  state: RunState,
}

impl Interpreter {
  pub fn new() -> Result<Self, ScriptError> {
    Self::with_options(Options::default())
  }

  pub fn with_options(options: Options) -> Result<Self, ScriptError> {
    let collector = Rc::new(RefCell::new(Collector::default()));
    let lua = runtime::create_runtime(collector.clone(), Marshaler::new(options.max_depth))?;
    Ok(Self {
      lua,
      collector,
      state: RunState::Created,
    })
  }

  pub fn state(&self) -> RunState {
    self.state
  }

  /// Run the Lua file at `path`.
  ///
  /// Resources registered before a failure stay collected.
  pub fn run(&mut self, path: impl AsRef<Path>) -> Result<(), ScriptError> {
    let path = path.as_ref();
    let source = std::fs::read(path).map_err(|source| ScriptError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    self.exec(&format!("@{}", path.display()), &source)
  }

  /// Run an in-memory chunk. `name` is used verbatim as the chunk name.
  pub fn run_source(&mut self, name: &str, source: impl AsRef<[u8]>) -> Result<(), ScriptError> {
    self.exec(name, source.as_ref())
  }

  fn exec(&mut self, name: &str, source: &[u8]) -> Result<(), ScriptError> {
    info!(chunk = %name, "running script");
    self.state = RunState::Running;

    match runtime::exec_chunk(&self.lua, name, source) {
      Ok(()) => {
        self.state = RunState::Finished;
        info!(chunk = %name, resources = self.collector.borrow().len(), "script finished");
        Ok(())
      }
      Err(err) => {
        self.state = RunState::Failed;
        Err(err.into())
      }
    }
  }

  /// Close the Lua state and return everything registered, in order.
  pub fn finish(self) -> Catalog {
    let catalog = self.collector.borrow_mut().take();
    info!(resources = catalog.len(), "catalog assembled");
    catalog
  }
}
