/* src/build/core/src/pipeline/collab.rs */

// Interfaces to the pieces of the toolchain the pipeline drives but does not own.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde_json::Value;

use crate::adapter::Adapter;
use crate::bundle::{BuildData, ClientBuildResult, ServerBuildResult};
use crate::config::ResolvedConfig;
use crate::graph::ModuleGraphFile;
use crate::manifest::ManifestData;
use crate::prerender::{PrerenderCommand, PrerenderResult};

/// Produces the route tree and writes generated runtime modules.
pub trait RouteSync {
  fn manifest_data(&self, config: &ResolvedConfig) -> Result<ManifestData>;
}

/// Output of a client bundler run.
#[derive(Debug, Clone, Default)]
pub struct ClientOutput {
  pub result: ClientBuildResult,
  pub graph: ModuleGraphFile,
}

pub trait ClientBuilder {
  /// `merged` is the final bundler configuration returned by `configure`.
  fn build_client(&self, config: &ResolvedConfig, merged: &Value) -> Result<ClientOutput>;
}

pub struct ServerBuildOptions<'a> {
  pub config: &'a ResolvedConfig,
  /// Final bundler configuration for the server bundle.
  pub merged: &'a Value,
  /// Entry name -> absolute source path.
  pub input: &'a BTreeMap<String, String>,
  pub manifest_data: &'a ManifestData,
}

pub trait ServerBuilder {
  fn build_server(
    &self,
    options: &ServerBuildOptions<'_>,
    client: &ClientBuildResult,
  ) -> Result<ServerBuildResult>;
}

pub struct WorkerBuildOptions<'a> {
  pub config: &'a ResolvedConfig,
  /// Absolute path of the service worker source.
  pub entry: &'a Path,
  pub build_data: &'a BuildData,
  pub prerendered: &'a PrerenderResult,
  /// Public paths of client output and static assets the worker may cache.
  pub files: Vec<String>,
}

pub trait WorkerBuilder {
  fn build_service_worker(&self, options: &WorkerBuildOptions<'_>) -> Result<()>;
}

/// Everything outside the pipeline's own stages.
pub struct Collaborators {
  pub sync: Box<dyn RouteSync>,
  pub server: Box<dyn ServerBuilder>,
  pub worker: Option<Box<dyn WorkerBuilder>>,
  pub adapter: Option<Box<dyn Adapter>>,
  pub prerender: PrerenderCommand,
}
