/* src/build/core/src/manifest/runtime.rs */

// Runtime manifest: the data the server bundle loads at request time, emitted
// both as an ES module and as JSON.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::bundler::{EntryDeps, find_deps};
use super::types::{PageNodes, RouteParam};
use crate::bundle::BuildData;
use crate::config::ResolvedConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeManifest {
  pub app_dir: String,
  pub app_path: String,
  pub assets: Vec<String>,
  /// Client bootstrap entry and everything it pulls in.
  pub client: EntryDeps,
  pub server_entry: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hooks: Option<String>,
  pub nodes: Vec<ManifestNode>,
  pub routes: Vec<ManifestRoute>,
  #[serde(default)]
  pub prerendered_routes: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub service_worker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestNode {
  pub index: usize,
  /// Server module, relative to the server output directory.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub server: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub client: Option<EntryDeps>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestRoute {
  pub id: String,
  pub pattern: String,
  pub params: Vec<RouteParam>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page: Option<PageNodes>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub endpoint: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub prerender: Option<bool>,
}

impl RuntimeManifest {
  /// Build the manifest from finished client and server results.
  /// `prerendered_routes` lists route ids served entirely from prerendered files.
  pub fn assemble(
    config: &ResolvedConfig,
    build_data: &BuildData,
    prerendered_routes: &BTreeSet<String>,
  ) -> Result<Self> {
    let raw = &build_data.client.raw_manifest;
    let start_key = config.relative(&config.client_start());
    let client = find_deps(raw, &start_key).context("failed to resolve client start entry")?;

    let server = &build_data.server;
    let mut nodes = Vec::with_capacity(build_data.manifest_data.nodes.len());
    for (index, node) in build_data.manifest_data.nodes.iter().enumerate() {
      let server_module = match node.server_entry() {
        Some(src) => Some(server.modules.get(src).cloned().with_context(|| {
          format!("module {src} for node {index} is missing from the server build")
        })?),
        None => None,
      };
      let client_deps = match node.client_entry() {
        Some(key) => Some(
          find_deps(raw, key).with_context(|| format!("failed to resolve client node {index}"))?,
        ),
        None => None,
      };
      nodes.push(ManifestNode { index, server: server_module, client: client_deps });
    }

    let mut routes = Vec::with_capacity(build_data.manifest_data.routes.len());
    for route in &build_data.manifest_data.routes {
      let endpoint = match &route.endpoint {
        Some(src) => Some(server.modules.get(src).cloned().with_context(|| {
          format!("endpoint {src} for route {} is missing from the server build", route.id)
        })?),
        None => None,
      };
      routes.push(ManifestRoute {
        id: route.id.clone(),
        pattern: route.pattern.clone(),
        params: route.params.clone(),
        page: route.page.clone(),
        endpoint,
        prerender: route.prerender,
      });
    }

    Ok(Self {
      app_dir: build_data.app_dir.clone(),
      app_path: build_data.app_path.clone(),
      assets: build_data.manifest_data.assets.iter().map(|a| a.file.clone()).collect(),
      client,
      server_entry: server.entry.clone(),
      hooks: server.hooks.clone(),
      nodes,
      routes,
      prerendered_routes: prerendered_routes.iter().cloned().collect(),
      service_worker: build_data.service_worker.clone(),
    })
  }
}

fn js(value: &impl Serialize) -> Result<String> {
  serde_json::to_string(value).context("failed to serialize manifest value")
}

fn lazy_import(file: Option<&str>) -> Result<String> {
  match file {
    Some(f) => Ok(format!("() => import({})", js(&format!("./{f}"))?)),
    None => Ok("null".to_string()),
  }
}

/// Render the manifest as an ES module exporting a `manifest` constant.
/// Output depends only on `manifest`, byte for byte.
pub fn render_manifest_module(manifest: &RuntimeManifest) -> Result<String> {
  let mut out = String::new();
  out.push_str("// Generated by strata. Do not edit.\n\n");
  out.push_str("export const manifest = {\n");
  let _ = writeln!(out, "\tappDir: {},", js(&manifest.app_dir)?);
  let _ = writeln!(out, "\tappPath: {},", js(&manifest.app_path)?);
  let _ = writeln!(out, "\tassets: new Set({}),", js(&manifest.assets)?);
  let _ = writeln!(out, "\tclient: {},", js(&manifest.client)?);
  let _ = writeln!(out, "\tentry: {},", lazy_import(Some(manifest.server_entry.as_str()))?);
  let _ = writeln!(out, "\thooks: {},", lazy_import(manifest.hooks.as_deref())?);

  out.push_str("\tnodes: [\n");
  for node in &manifest.nodes {
    let _ = writeln!(out, "\t\t{},", lazy_import(node.server.as_deref())?);
  }
  out.push_str("\t],\n");

  out.push_str("\tnodeClients: [\n");
  for node in &manifest.nodes {
    let _ = writeln!(out, "\t\t{},", js(&node.client)?);
  }
  out.push_str("\t],\n");

  out.push_str("\troutes: [\n");
  for route in &manifest.routes {
    out.push_str("\t\t{\n");
    let _ = writeln!(out, "\t\t\tid: {},", js(&route.id)?);
    let _ = writeln!(out, "\t\t\tpattern: new RegExp({}),", js(&route.pattern)?);
    let _ = writeln!(out, "\t\t\tparams: {},", js(&route.params)?);
    let _ = writeln!(out, "\t\t\tpage: {},", js(&route.page)?);
    let _ = writeln!(out, "\t\t\tendpoint: {}", lazy_import(route.endpoint.as_deref())?);
    out.push_str("\t\t},\n");
  }
  out.push_str("\t],\n");

  let _ = writeln!(out, "\tprerendered: new Set({}),", js(&manifest.prerendered_routes)?);
  let _ = writeln!(out, "\tserviceWorker: {}", js(&manifest.service_worker)?);
  out.push_str("};\n");
  Ok(out)
}

/// Write `<stem>.js` and `<stem>.json` into the server output directory.
/// Returns the path of the JSON file.
pub fn write_manifest_files(
  manifest: &RuntimeManifest,
  server_out: &Path,
  stem: &str,
) -> Result<PathBuf> {
  std::fs::create_dir_all(server_out)
    .with_context(|| format!("failed to create {}", server_out.display()))?;

  let module_path = server_out.join(format!("{stem}.js"));
  std::fs::write(&module_path, render_manifest_module(manifest)?)
    .with_context(|| format!("failed to write {}", module_path.display()))?;

  let json_path = server_out.join(format!("{stem}.json"));
  std::fs::write(&json_path, serde_json::to_string_pretty(manifest)?)
    .with_context(|| format!("failed to write {}", json_path.display()))?;
  Ok(json_path)
}

pub fn read_manifest_file(path: &Path) -> Result<RuntimeManifest> {
  let content =
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
  serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}
