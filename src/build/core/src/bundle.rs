/* src/build/core/src/bundle.rs */

// Results handed back by the client and server bundler runs, and the
// aggregate consumed by adapters.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::manifest::{BundlerManifest, ManifestData};

/// Executable output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
  pub file_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default)]
  pub is_entry: bool,
  /// Module id of the entry this chunk was emitted for.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub facade_module_id: Option<String>,
  #[serde(default)]
  pub imports: Vec<String>,
  #[serde(default)]
  pub dynamic_imports: Vec<String>,
}

/// Static output file (styles, images, fonts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
  pub file_name: String,
}

/// A client entry module and the file emitted for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDependency {
  /// Absolute module id, as reported by the module graph.
  pub id: String,
  /// Key in the bundler manifest (project-relative).
  pub key: String,
  pub file: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientBuildResult {
  pub chunks: Vec<Chunk>,
  pub assets: Vec<Asset>,
  pub entry_dependencies: Vec<EntryDependency>,
  pub raw_manifest: BundlerManifest,
}

impl ClientBuildResult {
  /// Every emitted file, chunks first, in bundler order.
  pub fn files(&self) -> impl Iterator<Item = &str> {
    self
      .chunks
      .iter()
      .map(|c| c.file_name.as_str())
      .chain(self.assets.iter().map(|a| a.file_name.as_str()))
  }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerBuildResult {
  /// Emitted file of the server entry point.
  pub entry: String,
  /// Project-relative source path -> emitted server module.
  pub modules: BTreeMap<String, String>,
  /// Emitted module exporting the server hooks, if the project has any.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub hooks: Option<String>,
  #[serde(default)]
  pub chunks: Vec<Chunk>,
}

/// Everything an adapter needs, created once client and server builds succeed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildData {
  pub app_dir: String,
  pub app_path: String,
  pub manifest_data: ManifestData,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub service_worker: Option<String>,
  pub client: ClientBuildResult,
  pub server: ServerBuildResult,
}
