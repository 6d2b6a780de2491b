/* src/build/core/src/config/resolved.rs */

// Absolute paths and derived values, computed once per build from strata.toml.

use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, bail};
use serde_json::Value;

use super::{PrerenderSection, ServiceWorkerSection, StrataConfig};

/// File extensions tried when a configured entry is given without one.
const ENTRY_EXTENSIONS: &[&str] = &["js", "ts", "mjs"];

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
  pub name: String,
  pub root: PathBuf,
  pub app_dir: String,
  pub base: String,
  pub assets_path: String,
  pub version: String,
  /// `<root>/.strata`
  pub out_dir: PathBuf,
  /// `<out_dir>/generated`, written by sync and never cleared by the build.
  pub generated_dir: PathBuf,
  /// `<out_dir>/output`, cleared at the start of every build.
  pub output_dir: PathBuf,
  pub client_out: PathBuf,
  pub server_out: PathBuf,
  pub prerendered_out: PathBuf,
  pub routes_dir: PathBuf,
  pub lib_dir: PathBuf,
  pub assets_dir: PathBuf,
  pub service_worker: Option<PathBuf>,
  pub hooks_server: Option<PathBuf>,
  pub bundler_command: Option<String>,
  pub server_command: Option<String>,
  pub bundler_manifest: String,
  pub module_graph: String,
  pub bundler_config: Value,
  pub prerender: PrerenderSection,
  pub service_worker_options: ServiceWorkerSection,
}

impl ResolvedConfig {
  pub fn from_strata_config(config: &StrataConfig, root: &Path) -> Result<Self> {
    let root = if root.as_os_str().is_empty() { Path::new(".") } else { root };
    let root =
      root.canonicalize().with_context(|| format!("failed to canonicalize {}", root.display()))?;
    let kit = &config.kit;

    let out_dir = root.join(&kit.out_dir);
    let output_dir = out_dir.join("output");
    let version = match &kit.version {
      Some(v) => v.clone(),
      None => SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_default(),
    };

    let bundler_config = serde_json::to_value(&config.bundler.config)
      .context("bundler.config cannot be represented as JSON")?;
    if !bundler_config.is_object() {
      bail!("bundler.config must be a table");
    }

    Ok(Self {
      name: config.project.name.clone(),
      app_dir: kit.app_dir.clone(),
      base: kit.paths.base.clone(),
      assets_path: kit.paths.assets.clone(),
      version,
      generated_dir: out_dir.join("generated"),
      client_out: output_dir.join("client"),
      server_out: output_dir.join("server"),
      prerendered_out: output_dir.join("prerendered"),
      routes_dir: root.join(&kit.files.routes),
      lib_dir: root.join(&kit.files.lib),
      assets_dir: root.join(&kit.files.assets),
      service_worker: resolve_entry(&root.join(&kit.files.service_worker)),
      hooks_server: resolve_entry(&root.join(&kit.files.hooks_server)),
      bundler_command: config.bundler.command.clone(),
      server_command: config.bundler.server_command.clone(),
      bundler_manifest: config.bundler.manifest.clone(),
      module_graph: config.bundler.module_graph.clone(),
      bundler_config,
      prerender: config.prerender.clone(),
      service_worker_options: config.service_worker.clone(),
      out_dir,
      output_dir,
      root,
    })
  }

  /// Public path of client assets, e.g. `/docs/_app`.
  pub fn app_path(&self) -> String {
    format!("{}/{}", self.base, self.app_dir).trim_start_matches('/').to_string()
  }

  /// Fixed bundler entry that bootstraps the client runtime.
  pub fn client_start(&self) -> PathBuf {
    self.generated_dir.join("client").join("start.js")
  }

  pub fn server_index(&self) -> PathBuf {
    self.generated_dir.join("server").join("index.js")
  }

  pub fn results_file(&self) -> PathBuf {
    self.output_dir.join("prerender-results.json")
  }

  /// Path relative to the project root with forward slashes, the form used as
  /// bundler manifest keys.
  pub fn relative(&self, path: &Path) -> String {
    let rel = path.strip_prefix(&self.root).unwrap_or(path);
    rel
      .components()
      .filter_map(|c| match c {
        Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
        Component::ParentDir => Some("..".to_string()),
        _ => None,
      })
      .collect::<Vec<_>>()
      .join("/")
  }

  /// Module id the bundler reports for a project file.
  pub fn module_id(&self, rel: &str) -> String {
    self.root.join(rel).to_string_lossy().into_owned()
  }
}

/// Accept `path` as-is if it is a file, otherwise try the known extensions.
pub fn resolve_entry(path: &Path) -> Option<PathBuf> {
  if path.is_file() {
    return Some(path.to_path_buf());
  }
  ENTRY_EXTENSIONS.iter().map(|ext| path.with_extension(ext)).find(|p| p.is_file())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::parse_strata_config;

  fn resolve(toml_str: &str, root: &Path) -> ResolvedConfig {
    let config = parse_strata_config(toml_str).unwrap();
    ResolvedConfig::from_strata_config(&config, root).unwrap()
  }

  #[test]
  fn derives_output_tree() {
    let tmp = tempfile::tempdir().unwrap();
    let resolved = resolve("[project]\nname = \"t\"\n", tmp.path());
    assert!(resolved.client_out.ends_with(".strata/output/client"));
    assert!(resolved.server_out.ends_with(".strata/output/server"));
    assert!(resolved.generated_dir.ends_with(".strata/generated"));
    assert_eq!(resolved.app_path(), "_app");
    assert!(resolved.service_worker.is_none());
  }

  #[test]
  fn app_path_includes_base() {
    let tmp = tempfile::tempdir().unwrap();
    let resolved = resolve("[project]\nname = \"t\"\n[kit.paths]\nbase = \"/docs\"\n", tmp.path());
    assert_eq!(resolved.app_path(), "docs/_app");
  }

  #[test]
  fn service_worker_resolved_with_extension() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(tmp.path().join("src")).unwrap();
    std::fs::write(tmp.path().join("src/service-worker.ts"), "").unwrap();
    let resolved = resolve("[project]\nname = \"t\"\n", tmp.path());
    assert!(resolved.service_worker.unwrap().ends_with("src/service-worker.ts"));
  }

  #[test]
  fn relative_uses_forward_slashes() {
    let tmp = tempfile::tempdir().unwrap();
    let resolved = resolve("[project]\nname = \"t\"\n", tmp.path());
    let file = resolved.routes_dir.join("blog").join("[slug]").join("+page.svelte");
    assert_eq!(resolved.relative(&file), "src/routes/blog/[slug]/+page.svelte");
  }

  #[test]
  fn explicit_version_is_kept() {
    let tmp = tempfile::tempdir().unwrap();
    let resolved = resolve("[project]\nname = \"t\"\n[kit]\nversion = \"v42\"\n", tmp.path());
    assert_eq!(resolved.version, "v42");
  }
}
