/* src/build/core/src/config/types.rs */

use anyhow::{Result, bail};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct StrataConfig {
  pub project: ProjectConfig,
  #[serde(default)]
  pub kit: KitSection,
  #[serde(default)]
  pub bundler: BundlerSection,
  #[serde(default)]
  pub prerender: PrerenderSection,
  #[serde(default)]
  pub service_worker: ServiceWorkerSection,
  #[serde(default)]
  pub adapter: Option<AdapterSection>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
  pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct KitSection {
  #[serde(default = "default_app_dir")]
  pub app_dir: String,
  #[serde(default = "default_out_dir")]
  pub out_dir: String,
  /// Deployment version; defaults to the build timestamp.
  pub version: Option<String>,
  #[serde(default)]
  pub files: FilesSection,
  #[serde(default)]
  pub paths: PathsSection,
}

impl Default for KitSection {
  fn default() -> Self {
    Self {
      app_dir: default_app_dir(),
      out_dir: default_out_dir(),
      version: None,
      files: FilesSection::default(),
      paths: PathsSection::default(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilesSection {
  #[serde(default = "default_routes")]
  pub routes: String,
  #[serde(default = "default_lib")]
  pub lib: String,
  #[serde(default = "default_assets")]
  pub assets: String,
  #[serde(default = "default_service_worker")]
  pub service_worker: String,
  #[serde(default = "default_hooks_server")]
  pub hooks_server: String,
}

impl Default for FilesSection {
  fn default() -> Self {
    Self {
      routes: default_routes(),
      lib: default_lib(),
      assets: default_assets(),
      service_worker: default_service_worker(),
      hooks_server: default_hooks_server(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsSection {
  /// Mount path of the app, e.g. `/docs`. Empty for the domain root.
  #[serde(default)]
  pub base: String,
  /// Absolute URL static assets are served from. Empty when served by the app.
  #[serde(default)]
  pub assets: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BundlerSection {
  pub command: Option<String>,
  pub server_command: Option<String>,
  #[serde(default = "default_bundler_manifest")]
  pub manifest: String,
  #[serde(default = "default_module_graph")]
  pub module_graph: String,
  /// Options passed through to the bundler. Framework-controlled keys win.
  #[serde(default)]
  pub config: toml::Table,
}

impl Default for BundlerSection {
  fn default() -> Self {
    Self {
      command: None,
      server_command: None,
      manifest: default_bundler_manifest(),
      module_graph: default_module_graph(),
      config: toml::Table::new(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrerenderSection {
  pub command: Option<String>,
  #[serde(default = "default_entries")]
  pub entries: Vec<String>,
  #[serde(default = "default_true")]
  pub crawl: bool,
  /// Fail when a crawled link matches no route.
  #[serde(default = "default_true")]
  pub strict: bool,
}

impl Default for PrerenderSection {
  fn default() -> Self {
    Self { command: None, entries: default_entries(), crawl: true, strict: true }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceWorkerSection {
  pub command: Option<String>,
  #[serde(default = "default_true")]
  pub register: bool,
}

impl Default for ServiceWorkerSection {
  fn default() -> Self {
    Self { command: None, register: true }
  }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdapterKind {
  #[default]
  Static,
  Command,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdapterSection {
  #[serde(default)]
  pub kind: AdapterKind,
  pub command: Option<String>,
  #[serde(default = "default_adapter_out")]
  pub out: String,
}

impl StrataConfig {
  pub fn validate(&self) -> Result<()> {
    let app_dir = &self.kit.app_dir;
    if app_dir.is_empty() {
      bail!("kit.app_dir cannot be empty");
    }
    if app_dir.starts_with('/') || app_dir.ends_with('/') {
      bail!("kit.app_dir cannot start or end with '/', got \"{app_dir}\"");
    }

    let base = &self.kit.paths.base;
    if !base.is_empty() && (!base.starts_with('/') || base.ends_with('/')) {
      bail!("kit.paths.base must be empty or a root-relative path without trailing slash, got \"{base}\"");
    }

    let assets = &self.kit.paths.assets;
    if !assets.is_empty() && !(assets.starts_with("http://") || assets.starts_with("https://")) {
      bail!("kit.paths.assets must be an absolute URL, got \"{assets}\"");
    }

    if let Some(adapter) = &self.adapter
      && adapter.kind == AdapterKind::Command
      && adapter.command.is_none()
    {
      bail!("adapter.command is required when adapter.kind = \"command\"");
    }
    Ok(())
  }
}

fn default_app_dir() -> String {
  "_app".to_string()
}

fn default_out_dir() -> String {
  ".strata".to_string()
}

fn default_routes() -> String {
  "src/routes".to_string()
}

fn default_lib() -> String {
  "src/lib".to_string()
}

fn default_assets() -> String {
  "static".to_string()
}

fn default_service_worker() -> String {
  "src/service-worker".to_string()
}

fn default_hooks_server() -> String {
  "src/hooks.server".to_string()
}

fn default_bundler_manifest() -> String {
  ".vite/manifest.json".to_string()
}

fn default_module_graph() -> String {
  ".vite/module-graph.json".to_string()
}

fn default_entries() -> Vec<String> {
  vec!["*".to_string()]
}

fn default_adapter_out() -> String {
  "build".to_string()
}

fn default_true() -> bool {
  true
}
