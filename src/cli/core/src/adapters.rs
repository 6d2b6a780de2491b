/* src/cli/core/src/adapters.rs */

use std::path::PathBuf;

use anyhow::{Context, Result};
use strata_build::adapter::{Adapter, Builder};
use strata_build::config::{AdapterKind, AdapterSection, ResolvedConfig};

use crate::shell::run_command;

const BUILD_DATA_ENV: &str = "STRATA_BUILD_DATA";
const PRERENDERED_ENV: &str = "STRATA_PRERENDERED";
const ADAPTER_OUT_ENV: &str = "STRATA_ADAPTER_OUT";

pub(crate) fn from_config(
  section: Option<&AdapterSection>,
  config: &ResolvedConfig,
) -> Option<Box<dyn Adapter>> {
  let section = section?;
  let out = config.root.join(&section.out);
  match (section.kind, &section.command) {
    (AdapterKind::Command, Some(command)) => {
      Some(Box::new(CommandAdapter { command: command.clone(), out }))
    }
    _ => Some(Box::new(StaticAdapter { out })),
  }
}

/// Writes a fully static site: client output, static assets and prerendered pages.
pub(crate) struct StaticAdapter {
  pub out: PathBuf,
}

impl Adapter for StaticAdapter {
  fn name(&self) -> &str {
    "static"
  }

  fn adapt(&self, builder: &Builder<'_>) -> Result<()> {
    builder.rimraf(&self.out)?;
    let client = builder.write_client(&self.out)?;
    let assets = builder.write_assets(&self.out)?;
    let pages = builder.write_prerendered(&self.out)?;
    builder.log.minor(&format!("{} client files, {} static assets", client.len(), assets.len()));

    let dynamic: Vec<&str> = builder
      .build_data
      .manifest_data
      .routes
      .iter()
      .filter(|r| r.page.is_some() && r.is_dynamic() && r.prerender != Some(true))
      .map(|r| r.id.as_str())
      .collect();
    if !dynamic.is_empty() {
      builder.log.warn(&format!(
        "{} dynamic route(s) were not prerendered and need a server: {}",
        dynamic.len(),
        dynamic.join(", ")
      ));
    }
    builder.log.success(&format!("{} prerendered files written to {}", pages.len(), self.out.display()));
    Ok(())
  }
}

/// Hands the build to an external command. The command finds the serialized
/// build data and prerender results through environment variables.
pub(crate) struct CommandAdapter {
  pub command: String,
  pub out: PathBuf,
}

impl Adapter for CommandAdapter {
  fn name(&self) -> &str {
    "command"
  }

  fn adapt(&self, builder: &Builder<'_>) -> Result<()> {
    let config = builder.config;
    let data_path = config.output_dir.join("build-data.json");
    std::fs::write(&data_path, serde_json::to_string_pretty(builder.build_data)?)
      .with_context(|| format!("failed to write {}", data_path.display()))?;
    let results = config.results_file();
    builder.prerendered.write(&results)?;

    let data_path = data_path.to_string_lossy();
    let results = results.to_string_lossy();
    let out = self.out.to_string_lossy();
    run_command(
      &config.root,
      &self.command,
      "adapter",
      &[(BUILD_DATA_ENV, &data_path), (PRERENDERED_ENV, &results), (ADAPTER_OUT_ENV, &out)],
    )?;
    builder.log.success(&format!("adapter command finished, output in {}", self.out.display()));
    Ok(())
  }
}
