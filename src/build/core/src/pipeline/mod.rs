/* src/build/core/src/pipeline/mod.rs */

// Build stage orchestration: configure -> build_start -> write_bundle -> close_bundle.
// Each hook checks the current stage; any failure moves the session to `Failed`.

mod collab;
mod session;


use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use anyhow::{Context, Result, bail};
use serde_json::Value;

pub use collab::{
  ClientBuilder, ClientOutput, Collaborators, RouteSync, ServerBuildOptions, ServerBuilder,
  WorkerBuildOptions, WorkerBuilder,
};
pub use session::BuildSession;

use crate::adapter::{Builder, Logger};
use crate::bundle::{BuildData, ClientBuildResult};
use crate::config::{
  ResolvedConfig, enforced_client_config, enforced_server_config, merge_config, overridden_paths,
};
use crate::error::BuildError;
use crate::graph::{IllegalImportSet, ModuleGraph, check_illegal_imports};
use crate::manifest::{ManifestData, RuntimeManifest, write_manifest_files};
use crate::prerender::prerender;
use crate::ui::{self, DIM, RESET};

const TOTAL_STEPS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
  Idle,
  Configured,
  ClientBuilding,
  ServerBuilding,
  ManifestWriting,
  Prerendering,
  WorkerBuilding,
  Adapting,
  Done,
  Failed,
}

impl fmt::Display for Stage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::Idle => "idle",
      Self::Configured => "configured",
      Self::ClientBuilding => "building the client",
      Self::ServerBuilding => "building the server",
      Self::ManifestWriting => "writing the manifest",
      Self::Prerendering => "prerendering",
      Self::WorkerBuilding => "building the service worker",
      Self::Adapting => "adapting",
      Self::Done => "done",
      Self::Failed => "failed",
    };
    f.write_str(s)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
  /// `write_bundle` never completed; nothing was adapted.
  Skipped,
  Adapted,
  NoAdapter,
}

/// Client bundler entries: the runtime bootstrap plus one entry per node.
pub fn client_input(config: &ResolvedConfig, data: &ManifestData) -> BTreeMap<String, String> {
  let mut input = BTreeMap::new();
  input.insert("start".to_string(), config.client_start().to_string_lossy().into_owned());
  for (i, node) in data.nodes.iter().enumerate() {
    if let Some(entry) = node.client_entry() {
      input.insert(format!("nodes/{i}"), config.module_id(entry));
    }
  }
  input
}

/// Server bundler entries: the server index, node modules, endpoints and hooks.
pub fn server_input(config: &ResolvedConfig, data: &ManifestData) -> BTreeMap<String, String> {
  let mut input = BTreeMap::new();
  input.insert("index".to_string(), config.server_index().to_string_lossy().into_owned());
  for (i, node) in data.nodes.iter().enumerate() {
    if let Some(entry) = node.server_entry() {
      input.insert(format!("nodes/{i}"), config.module_id(entry));
    }
  }
  for (i, route) in data.routes.iter().enumerate() {
    if let Some(endpoint) = &route.endpoint {
      input.insert(format!("endpoints/{i}"), config.module_id(endpoint));
    }
  }
  if let Some(hooks) = &config.hooks_server {
    input.insert("hooks".to_string(), hooks.to_string_lossy().into_owned());
  }
  input
}

/// Clear the output tree and write the version marker. `generated/` is left alone.
fn prepare_output(config: &ResolvedConfig) -> Result<()> {
  if config.output_dir.exists() {
    std::fs::remove_dir_all(&config.output_dir)
      .with_context(|| format!("failed to clear {}", config.output_dir.display()))?;
  }
  let app = config.client_out.join(&config.app_dir);
  std::fs::create_dir_all(&app).with_context(|| format!("failed to create {}", app.display()))?;
  std::fs::create_dir_all(&config.server_out)
    .with_context(|| format!("failed to create {}", config.server_out.display()))?;

  let version = serde_json::json!({ "version": config.version });
  let path = app.join("version.json");
  std::fs::write(&path, serde_json::to_string(&version)?)
    .with_context(|| format!("failed to write {}", path.display()))?;
  Ok(())
}

/// Public paths a service worker may cache.
fn worker_files(config: &ResolvedConfig, build_data: &BuildData) -> Vec<String> {
  let client = build_data.client.files().map(|f| format!("{}/{f}", config.base));
  let assets = build_data.manifest_data.assets.iter().map(|a| format!("{}/{}", config.base, a.file));
  client.chain(assets).collect()
}

pub struct Pipeline {
  session: BuildSession,
  collab: Collaborators,
  verbose: bool,
}

impl Pipeline {
  pub fn new(config: ResolvedConfig, collab: Collaborators) -> Self {
    Self { session: BuildSession::new(config), collab, verbose: false }
  }

  pub fn verbose(mut self, verbose: bool) -> Self {
    self.verbose = verbose;
    self
  }

  pub fn session(&self) -> &BuildSession {
    &self.session
  }

  pub fn into_session(self) -> BuildSession {
    self.session
  }

  fn require(&self, action: &'static str, allowed: &[Stage]) -> Result<()> {
    if allowed.contains(&self.session.stage) {
      return Ok(());
    }
    Err(BuildError::StageDependencyUnmet { action, stage: self.session.stage }.into())
  }

  fn record<T>(&mut self, result: Result<T>) -> Result<T> {
    if result.is_err() {
      tracing::debug!(stage = %self.session.stage, "stage failed");
      self.session.stage = Stage::Failed;
    }
    result
  }

  /// Merge the user's bundler options with the framework's. Every enforced
  /// option the user tried to set is reported once as a warning.
  pub fn configure(&mut self, user: &Value) -> Result<Value> {
    self.require("configure", &[Stage::Idle])?;
    let result = self.configure_inner(user);
    self.record(result)
  }

  fn configure_inner(&mut self, user: &Value) -> Result<Value> {
    let session = &mut self.session;
    let manifest_data =
      self.collab.sync.manifest_data(&session.config).context("failed to sync routes")?;
    let input = client_input(&session.config, &manifest_data);
    let merged = merge_config(user, &enforced_client_config(&session.config, &input));

    let overridden = overridden_paths(user, &merged);
    if !overridden.is_empty() {
      ui::warn("these bundler options are controlled by strata and were overridden:");
      for path in &overridden {
        ui::detail(&format!("{DIM}-{RESET} {path}"));
      }
      ui::blank();
    }
    tracing::debug!(
      routes = manifest_data.routes.len(),
      nodes = manifest_data.nodes.len(),
      overridden = overridden.len(),
      "configured"
    );

    session.warnings.extend(overridden.into_iter().map(|p| format!("bundler option {p} was overridden")));
    session.manifest_data = Some(manifest_data);
    session.client_config = Some(merged.clone());
    session.stage = Stage::Configured;
    Ok(merged)
  }

  /// Reset the output tree and compute the forbidden import set.
  pub fn build_start(&mut self) -> Result<()> {
    self.require("start the build", &[Stage::Configured])?;
    let result = prepare_output(&self.session.config);
    self.record(result)?;
    self.session.illegal = Some(IllegalImportSet::for_config(&self.session.config));
    self.session.build_completed = false;
    self.session.stage = Stage::ClientBuilding;
    Ok(())
  }

  /// Everything after the client bundle: import guard, server build, manifest,
  /// prerender and service worker. Sets `build_completed` only on full success.
  pub async fn write_bundle(
    &mut self,
    client: ClientBuildResult,
    graph: &dyn ModuleGraph,
  ) -> Result<()> {
    self.require("write the bundle", &[Stage::ClientBuilding])?;
    let result = self.write_bundle_inner(client, graph).await;
    self.record(result)
  }

  async fn write_bundle_inner(
    &mut self,
    client: ClientBuildResult,
    graph: &dyn ModuleGraph,
  ) -> Result<()> {
    let verbose = self.verbose;
    let session = &mut self.session;
    let collab = &self.collab;

    let illegal = match &session.illegal {
      Some(set) => set.clone(),
      None => IllegalImportSet::for_config(&session.config),
    };
    let root = session.config.root.clone();
    let boundary = root.to_string_lossy().into_owned();
    for dep in &client.entry_dependencies {
      check_illegal_imports(graph, &dep.id, &illegal, &boundary, &root)?;
    }
    ui::detail_ok(&format!("{} client entries free of server-only imports", client.entry_dependencies.len()));

    session.stage = Stage::ServerBuilding;
    ui::step(2, TOTAL_STEPS, "Building server");
    let manifest_data =
      session.manifest_data.clone().context("route data missing, configure did not run")?;
    let input = server_input(&session.config, &manifest_data);
    let merged =
      merge_config(&session.config.bundler_config, &enforced_server_config(&session.config, &input));
    let options = ServerBuildOptions {
      config: &session.config,
      merged: &merged,
      input: &input,
      manifest_data: &manifest_data,
    };
    let server = collab.server.build_server(&options, &client).context("server build failed")?;
    ui::detail_ok(&format!("{} server modules", server.modules.len()));

    let config = &session.config;
    let build_data = BuildData {
      app_dir: config.app_dir.clone(),
      app_path: config.app_path(),
      manifest_data,
      service_worker: config.service_worker.as_ref().map(|_| format!("{}/service-worker.js", config.base)),
      client,
      server,
    };

    session.stage = Stage::ManifestWriting;
    ui::step(3, TOTAL_STEPS, "Writing manifest");
    let full = RuntimeManifest::assemble(&session.config, &build_data, &BTreeSet::new())?;
    let full_path = write_manifest_files(&full, &session.config.server_out, "manifest-full")?;
    ui::detail_ok("manifest-full.js");

    session.stage = Stage::Prerendering;
    ui::step(4, TOTAL_STEPS, "Prerendering");
    let prerendered = prerender(&session.config, &collab.prerender, &full_path, verbose).await?;
    let routes = prerendered.prerendered_routes(&build_data.manifest_data.routes);
    let manifest = RuntimeManifest::assemble(&session.config, &build_data, &routes)?;
    write_manifest_files(&manifest, &session.config.server_out, "manifest")?;
    ui::detail_ok(&format!(
      "{} pages, {} assets, {} redirects",
      prerendered.pages.len(),
      prerendered.assets.len(),
      prerendered.redirects.len()
    ));
    tracing::debug!(routes = ?routes, "prerendered routes");

    session.stage = Stage::WorkerBuilding;
    ui::step(5, TOTAL_STEPS, "Building service worker");
    match &session.config.service_worker {
      Some(entry) => {
        if !session.config.assets_path.is_empty() {
          return Err(
            BuildError::MutualExclusion {
              first: "a service worker".into(),
              second: "kit.paths.assets".into(),
            }
            .into(),
          );
        }
        match &collab.worker {
          Some(worker) => {
            worker.build_service_worker(&WorkerBuildOptions {
              config: &session.config,
              entry,
              build_data: &build_data,
              prerendered: &prerendered,
              files: worker_files(&session.config, &build_data),
            })?;
            ui::detail_ok("service-worker.js");
          }
          None => ui::detail_warn("no service worker builder configured, skipping"),
        }
      }
      None => ui::detail(&format!("{DIM}no service worker{RESET}")),
    }

    session.build_data = Some(build_data);
    session.prerendered = Some(prerendered);
    session.build_completed = true;
    Ok(())
  }

  /// Hand the finished build to the adapter. Returns `Skipped` without error
  /// when the build never completed.
  pub fn close_bundle(&mut self) -> Result<CloseOutcome> {
    if !self.session.build_completed {
      tracing::debug!(stage = %self.session.stage, "build incomplete, skipping adapter");
      return Ok(CloseOutcome::Skipped);
    }
    self.require("run the adapter", &[Stage::WorkerBuilding])?;
    let result = self.close_bundle_inner();
    self.record(result)
  }

  fn close_bundle_inner(&mut self) -> Result<CloseOutcome> {
    let session = &mut self.session;
    session.stage = Stage::Adapting;
    ui::step(6, TOTAL_STEPS, "Adapting");

    let (Some(build_data), Some(prerendered)) = (&session.build_data, &session.prerendered) else {
      bail!("build data missing after a completed build");
    };
    let outcome = match &self.collab.adapter {
      Some(adapter) => {
        let builder = Builder {
          config: &session.config,
          build_data,
          prerendered,
          log: Logger { verbose: self.verbose },
        };
        adapter.adapt(&builder).with_context(|| format!("adapter {} failed", adapter.name()))?;
        ui::detail_ok(&format!("adapter {}", adapter.name()));
        CloseOutcome::Adapted
      }
      None => {
        ui::detail_warn("no adapter configured, the app was built but not packaged for deployment");
        ui::detail(&format!(
          "{DIM}add an [adapter] section to strata.toml; build output is in {}{RESET}",
          session.config.output_dir.display()
        ));
        CloseOutcome::NoAdapter
      }
    };
    session.stage = Stage::Done;
    Ok(outcome)
  }

  /// One-shot production build: the four hooks in order around a client build.
  pub async fn run(&mut self, client_builder: &dyn ClientBuilder) -> Result<CloseOutcome> {
    let user = self.session.config.bundler_config.clone();
    let merged = self.configure(&user)?;
    self.build_start()?;

    ui::step(1, TOTAL_STEPS, "Building client");
    let built =
      client_builder.build_client(&self.session.config, &merged).context("client build failed");
    let output = self.record(built)?;
    ui::detail_ok(&format!(
      "{} chunks, {} assets",
      output.result.chunks.len(),
      output.result.assets.len()
    ));

    self.write_bundle(output.result, &output.graph).await?;
    self.close_bundle()
  }
}
