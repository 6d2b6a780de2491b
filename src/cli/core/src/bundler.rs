/* src/cli/core/src/bundler.rs */

// Client and server builds driven by a user-supplied bundler command. The
// command reads the merged config from `STRATA_BUNDLER_CONFIG` and must leave a
// Vite-format manifest (and, for the client, a module graph dump) in its out dir.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use strata_build::bundle::{Asset, Chunk, ClientBuildResult, EntryDependency, ServerBuildResult};
use strata_build::config::ResolvedConfig;
use strata_build::graph::ModuleGraphFile;
use strata_build::manifest::{BundlerManifest, read_bundler_manifest};
use strata_build::pipeline::{
  ClientBuilder, ClientOutput, ServerBuildOptions, ServerBuilder,
};

use crate::shell::run_command;

pub(crate) const TARGET_ENV: &str = "STRATA_BUILD_TARGET";
pub(crate) const BUNDLER_CONFIG_ENV: &str = "STRATA_BUNDLER_CONFIG";
pub(crate) const OUT_DIR_ENV: &str = "STRATA_OUT_DIR";

/// Write the merged config where the bundler command can read it.
fn write_bundler_config(config: &ResolvedConfig, target: &str, merged: &Value) -> Result<PathBuf> {
  std::fs::create_dir_all(&config.generated_dir)
    .with_context(|| format!("failed to create {}", config.generated_dir.display()))?;
  let path = config.generated_dir.join(format!("bundler.{target}.json"));
  std::fs::write(&path, serde_json::to_string_pretty(merged)?)
    .with_context(|| format!("failed to write {}", path.display()))?;
  Ok(path)
}

fn run_bundler(config: &ResolvedConfig, command: &str, target: &str, merged: &Value, out: &Path) -> Result<()> {
  let config_path = write_bundler_config(config, target, merged)?;
  let config_path = config_path.to_string_lossy();
  let out = out.to_string_lossy();
  run_command(
    &config.root,
    command,
    &format!("{target} bundler"),
    &[(TARGET_ENV, target), (BUNDLER_CONFIG_ENV, &config_path), (OUT_DIR_ENV, &out)],
  )
}

fn file_of(manifest: &BundlerManifest, keys: &[String]) -> Vec<String> {
  keys.iter().filter_map(|k| manifest.get(k)).map(|e| e.file.clone()).collect()
}

/// JavaScript chunks in manifest key order.
fn chunks_from(config: &ResolvedConfig, manifest: &BundlerManifest) -> Vec<Chunk> {
  manifest
    .iter()
    .filter(|(_, e)| e.file.ends_with(".js"))
    .map(|(key, entry)| Chunk {
      file_name: entry.file.clone(),
      name: entry.name.clone(),
      is_entry: entry.is_entry,
      facade_module_id: entry.is_entry.then(|| config.module_id(entry.src.as_deref().unwrap_or(key))),
      imports: file_of(manifest, &entry.imports),
      dynamic_imports: file_of(manifest, &entry.dynamic_imports),
    })
    .collect()
}

pub(crate) fn client_result(config: &ResolvedConfig, manifest: BundlerManifest) -> ClientBuildResult {
  let chunks = chunks_from(config, &manifest);
  let assets: BTreeSet<&str> = manifest
    .values()
    .flat_map(|e| e.css.iter().chain(&e.assets))
    .map(String::as_str)
    .collect();
  let entry_dependencies = manifest
    .iter()
    .filter(|(_, e)| e.is_entry || e.is_dynamic_entry)
    .map(|(key, e)| EntryDependency {
      id: config.module_id(e.src.as_deref().unwrap_or(key)),
      key: key.clone(),
      file: e.file.clone(),
    })
    .collect();
  ClientBuildResult {
    chunks,
    assets: assets.into_iter().map(|f| Asset { file_name: f.to_string() }).collect(),
    entry_dependencies,
    raw_manifest: manifest,
  }
}

pub(crate) struct CommandClientBuilder;

impl ClientBuilder for CommandClientBuilder {
  fn build_client(&self, config: &ResolvedConfig, merged: &Value) -> Result<ClientOutput> {
    let command = config.bundler_command.as_deref().context("bundler.command is required")?;
    run_bundler(config, command, "client", merged, &config.client_out)?;

    let manifest = read_bundler_manifest(&config.client_out.join(&config.bundler_manifest))?;
    let graph = ModuleGraphFile::read(&config.client_out.join(&config.module_graph))?;
    Ok(ClientOutput { result: client_result(config, manifest), graph })
  }
}

pub(crate) fn server_result(config: &ResolvedConfig, manifest: &BundlerManifest) -> Result<ServerBuildResult> {
  let index_key = config.relative(&config.server_index());
  let entry = manifest
    .get(&index_key)
    .map(|e| e.file.clone())
    .with_context(|| format!("server entry {index_key} is missing from the server manifest"))?;
  let hooks = config
    .hooks_server
    .as_ref()
    .and_then(|p| manifest.get(&config.relative(p)))
    .map(|e| e.file.clone());

  let modules: BTreeMap<String, String> = manifest
    .iter()
    .filter(|(_, e)| e.is_entry)
    .map(|(key, e)| (e.src.clone().unwrap_or_else(|| key.clone()), e.file.clone()))
    .collect();

  Ok(ServerBuildResult { entry, modules, hooks, chunks: chunks_from(config, manifest) })
}

pub(crate) struct CommandServerBuilder;

impl ServerBuilder for CommandServerBuilder {
  fn build_server(
    &self,
    options: &ServerBuildOptions<'_>,
    _client: &ClientBuildResult,
  ) -> Result<ServerBuildResult> {
    let config = options.config;
    let command = config
      .server_command
      .as_deref()
      .or(config.bundler_command.as_deref())
      .context("bundler.server_command or bundler.command is required")?;
    run_bundler(config, command, "server", options.merged, &config.server_out)?;

    let manifest = read_bundler_manifest(&config.server_out.join(&config.bundler_manifest))?;
    server_result(config, &manifest)
  }
}
