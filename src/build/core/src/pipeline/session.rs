/* src/build/core/src/pipeline/session.rs */

// Per-build state threaded through every stage. Created once per build and
// never shared between builds.

use serde_json::Value;

use super::Stage;
use crate::bundle::BuildData;
use crate::config::ResolvedConfig;
use crate::graph::IllegalImportSet;
use crate::manifest::ManifestData;
use crate::prerender::PrerenderResult;

#[derive(Debug)]
pub struct BuildSession {
  pub config: ResolvedConfig,
  pub(super) stage: Stage,
  pub(super) client_config: Option<Value>,
  pub(super) manifest_data: Option<ManifestData>,
  pub(super) illegal: Option<IllegalImportSet>,
  pub(super) build_data: Option<BuildData>,
  pub(super) prerendered: Option<PrerenderResult>,
  /// Set only after every stage of `write_bundle` succeeded.
  pub(super) build_completed: bool,
  pub(super) warnings: Vec<String>,
}

impl BuildSession {
  pub fn new(config: ResolvedConfig) -> Self {
    Self {
      config,
      stage: Stage::Idle,
      client_config: None,
      manifest_data: None,
      illegal: None,
      build_data: None,
      prerendered: None,
      build_completed: false,
      warnings: Vec::new(),
    }
  }

  pub fn stage(&self) -> Stage {
    self.stage
  }

  /// Merged client bundler configuration, available after `configure`.
  pub fn client_config(&self) -> Option<&Value> {
    self.client_config.as_ref()
  }

  pub fn manifest_data(&self) -> Option<&ManifestData> {
    self.manifest_data.as_ref()
  }

  pub fn illegal_imports(&self) -> Option<&IllegalImportSet> {
    self.illegal.as_ref()
  }

  pub fn build_data(&self) -> Option<&BuildData> {
    self.build_data.as_ref()
  }

  pub fn prerendered(&self) -> Option<&PrerenderResult> {
    self.prerendered.as_ref()
  }

  pub fn build_completed(&self) -> bool {
    self.build_completed
  }

  pub fn warnings(&self) -> &[String] {
    &self.warnings
  }
}
