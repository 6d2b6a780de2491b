/* src/build/core/src/manifest/bundler.rs */

// Vite-format bundler manifest: `{ "<key>": { file, imports, dynamicImports, css, ... } }`.
// Keys are project-relative source paths (or `_`-prefixed shared chunks).

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundlerManifestEntry {
  pub file: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub src: Option<String>,
  #[serde(default)]
  pub is_entry: bool,
  #[serde(default)]
  pub is_dynamic_entry: bool,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub imports: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub dynamic_imports: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub css: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub assets: Vec<String>,
}

pub type BundlerManifest = BTreeMap<String, BundlerManifestEntry>;

pub fn read_bundler_manifest(path: &Path) -> Result<BundlerManifest> {
  let content = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read bundler manifest at {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse bundler manifest at {}", path.display()))
}

/// Files an entry needs at runtime. Sorted and duplicate free, so the result
/// does not depend on the order imports were declared in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDeps {
  pub file: String,
  pub imports: Vec<String>,
  pub stylesheets: Vec<String>,
  pub assets: Vec<String>,
}

#[derive(Default)]
struct DepsAcc<'a> {
  seen: HashSet<&'a str>,
  imports: BTreeSet<&'a str>,
  stylesheets: BTreeSet<&'a str>,
  assets: BTreeSet<&'a str>,
}

/// Resolve the transitive dependencies of `entry` by following `imports`,
/// `dynamicImports` and `css` edges of the bundler manifest.
pub fn find_deps(manifest: &BundlerManifest, entry: &str) -> Result<EntryDeps> {
  let Some(root) = manifest.get(entry) else {
    bail!("entry \"{entry}\" is missing from the bundler manifest");
  };

  let mut acc = DepsAcc::default();
  collect_deps(manifest, entry, &mut acc)?;
  acc.imports.remove(root.file.as_str());

  Ok(EntryDeps {
    file: root.file.clone(),
    imports: acc.imports.into_iter().map(str::to_string).collect(),
    stylesheets: acc.stylesheets.into_iter().map(str::to_string).collect(),
    assets: acc.assets.into_iter().map(str::to_string).collect(),
  })
}

fn collect_deps<'a>(manifest: &'a BundlerManifest, key: &'a str, acc: &mut DepsAcc<'a>) -> Result<()> {
  if !acc.seen.insert(key) {
    return Ok(());
  }
  let Some(chunk) = manifest.get(key) else {
    bail!("\"{key}\" is imported but missing from the bundler manifest");
  };

  acc.imports.insert(&chunk.file);
  acc.stylesheets.extend(chunk.css.iter().map(String::as_str));
  acc.assets.extend(chunk.assets.iter().map(String::as_str));

  for next in chunk.imports.iter().chain(&chunk.dynamic_imports) {
    collect_deps(manifest, next, acc)?;
  }
  Ok(())
}
