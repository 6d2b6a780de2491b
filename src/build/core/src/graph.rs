/* src/build/core/src/graph.rs */

// Module graph lookup and the guard that keeps server-only modules out of
// client bundles.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::ResolvedConfig;
use crate::error::BuildError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
  #[serde(default)]
  pub imported_ids: Vec<String>,
  #[serde(default)]
  pub dynamically_imported_ids: Vec<String>,
}

/// Read access to the bundler's module graph, keyed by absolute module id.
pub trait ModuleGraph {
  fn module_info(&self, id: &str) -> Option<ModuleInfo>;
}

/// Module graph dumped by the bundler as `{ "<id>": { importedIds, dynamicallyImportedIds } }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleGraphFile {
  pub modules: BTreeMap<String, ModuleInfo>,
}

impl ModuleGraphFile {
  pub fn read(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("failed to read module graph at {}", path.display()))?;
    serde_json::from_str(&content)
      .with_context(|| format!("failed to parse module graph at {}", path.display()))
  }
}

impl ModuleGraph for ModuleGraphFile {
  fn module_info(&self, id: &str) -> Option<ModuleInfo> {
    self.modules.get(id).cloned()
  }
}

/// Absolute id prefixes that must never be reachable from a client entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IllegalImportSet {
  prefixes: Vec<String>,
}

impl IllegalImportSet {
  pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
    Self { prefixes: prefixes.into_iter().collect() }
  }

  /// Private env modules generated by sync and everything under `lib/server/`.
  pub fn for_config(config: &ResolvedConfig) -> Self {
    let env = config.generated_dir.join("runtime").join("env");
    let private = |kind: &str| env.join(kind).join("private").to_string_lossy().into_owned();
    let lib_server = format!("{}/", config.lib_dir.join("server").to_string_lossy());
    Self::new([private("static"), private("dynamic"), lib_server])
  }

  /// A prefix ending in `/` forbids that directory. Any other prefix forbids
  /// the module itself (`private`, `private.js`) and a directory of that name.
  pub fn is_forbidden(&self, id: &str) -> bool {
    self.prefixes.iter().any(|p| {
      let (base, dir_only) = match p.strip_suffix('/') {
        Some(base) => (base, true),
        None => (p.as_str(), false),
      };
      id.strip_prefix(base).is_some_and(|rest| {
        rest.is_empty() || rest.starts_with('/') || (!dir_only && rest.starts_with('.'))
      })
    })
  }

  pub fn prefixes(&self) -> &[String] {
    &self.prefixes
  }
}

/// `id` is `boundary` itself or lies below it; `/app` does not contain `/app-other`.
fn within(id: &str, boundary: &str) -> bool {
  id.strip_prefix(boundary.trim_end_matches('/'))
    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

struct Walk<'a> {
  graph: &'a dyn ModuleGraph,
  illegal: &'a IllegalImportSet,
  boundary: &'a str,
  seen: HashSet<String>,
  chain: Vec<String>,
}

impl Walk<'_> {
  /// Returns the offending module id, with `chain` left pointing at it.
  fn visit(&mut self, id: &str) -> Option<String> {
    if !within(id, self.boundary) || !self.seen.insert(id.to_string()) {
      return None;
    }
    self.chain.push(id.to_string());
    if self.illegal.is_forbidden(id) {
      return Some(id.to_string());
    }
    if let Some(info) = self.graph.module_info(id) {
      for next in info.imported_ids.iter().chain(&info.dynamically_imported_ids) {
        if let Some(found) = self.visit(next) {
          return Some(found);
        }
      }
    }
    self.chain.pop();
    None
  }
}

/// Fail with [`BuildError::IllegalImport`] if a forbidden module is reachable
/// from `entry`. Ids outside `boundary` (dependencies, virtual modules) are
/// not followed. Ids in the error are shown relative to `root`.
pub fn check_illegal_imports(
  graph: &dyn ModuleGraph,
  entry: &str,
  illegal: &IllegalImportSet,
  boundary: &str,
  root: &Path,
) -> Result<()> {
  let mut walk = Walk { graph, illegal, boundary, seen: HashSet::new(), chain: Vec::new() };
  let Some(found) = walk.visit(entry) else {
    return Ok(());
  };
  let root = root.to_string_lossy();
  let display = |id: &str| -> String {
    id.strip_prefix(root.as_ref()).map(|s| s.trim_start_matches('/')).unwrap_or(id).to_string()
  };
  Err(
    BuildError::IllegalImport {
      module: display(&found),
      chain: walk.chain.iter().map(|id| display(id)).collect(),
    }
    .into(),
  )
}
