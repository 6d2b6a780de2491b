/* src/cli/core/src/worker.rs */

use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;
use strata_build::pipeline::{WorkerBuildOptions, WorkerBuilder};

use crate::bundler::OUT_DIR_ENV;
use crate::shell::run_command;

const INFO_ENV: &str = "STRATA_SERVICE_WORKER_INFO";
const ENTRY_ENV: &str = "STRATA_SERVICE_WORKER_ENTRY";

/// What the service worker gets to know about the build.
#[derive(Debug, Serialize)]
struct ServiceWorkerInfo {
  /// Client bundle output.
  build: Vec<String>,
  /// Client output plus static assets.
  files: Vec<String>,
  /// Prerendered page paths.
  prerendered: Vec<String>,
  version: String,
}

fn info(options: &WorkerBuildOptions<'_>) -> ServiceWorkerInfo {
  let base = &options.config.base;
  ServiceWorkerInfo {
    build: options.build_data.client.files().map(|f| format!("{base}/{f}")).collect(),
    files: options.files.clone(),
    prerendered: options.prerendered.pages.keys().map(|p| format!("{base}{p}")).collect(),
    version: options.config.version.clone(),
  }
}

/// Builds `service-worker.js` into the client output, either through
/// `service_worker.command` or by prefixing a plain JS entry with the build info.
pub(crate) struct CommandWorkerBuilder {
  pub command: Option<String>,
}

impl WorkerBuilder for CommandWorkerBuilder {
  fn build_service_worker(&self, options: &WorkerBuildOptions<'_>) -> Result<()> {
    let config = options.config;
    let info = info(options);
    let out = config.client_out.join("service-worker.js");

    if let Some(command) = &self.command {
      let info_path = config.generated_dir.join("service-worker.json");
      std::fs::create_dir_all(&config.generated_dir)?;
      std::fs::write(&info_path, serde_json::to_string_pretty(&info)?)
        .with_context(|| format!("failed to write {}", info_path.display()))?;
      let info_path = info_path.to_string_lossy();
      let entry = options.entry.to_string_lossy();
      let out_dir = config.client_out.to_string_lossy();
      return run_command(
        &config.root,
        command,
        "service worker build",
        &[(INFO_ENV, &info_path), (ENTRY_ENV, &entry), (OUT_DIR_ENV, &out_dir)],
      );
    }

    inline_entry(options.entry, &info, &out)
  }
}

fn inline_entry(entry: &Path, info: &ServiceWorkerInfo, out: &Path) -> Result<()> {
  let ext = entry.extension().and_then(|e| e.to_str()).unwrap_or_default();
  if ext != "js" && ext != "mjs" {
    bail!(
      "service worker {} needs a build step, set service_worker.command in strata.toml",
      entry.display()
    );
  }
  let source =
    std::fs::read_to_string(entry).with_context(|| format!("failed to read {}", entry.display()))?;
  let content = format!("const manifest = {};\n\n{source}", serde_json::to_string(info)?);
  std::fs::write(out, content).with_context(|| format!("failed to write {}", out.display()))
}
