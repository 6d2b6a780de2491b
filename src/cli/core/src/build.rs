/* src/cli/core/src/build.rs */

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use strata_build::config::{ResolvedConfig, StrataConfig};
use strata_build::pipeline::{CloseOutcome, Collaborators, Pipeline};
use strata_build::prerender::{CONFIG_ENV, PrerenderCommand};
use strata_build::ui;

use crate::adapters;
use crate::bundler::{CommandClientBuilder, CommandServerBuilder};
use crate::sync::FsSync;
use crate::worker::CommandWorkerBuilder;

pub(crate) async fn run_build(
  config_path: &Path,
  config: &StrataConfig,
  base_dir: &Path,
  verbose: bool,
) -> Result<()> {
  let started = Instant::now();
  ui::banner("build", Some(config.project.name.as_str()));

  let resolved = ResolvedConfig::from_strata_config(config, base_dir)?;
  let config_path = config_path
    .canonicalize()
    .with_context(|| format!("failed to canonicalize {}", config_path.display()))?;

  let collab = Collaborators {
    sync: Box::new(FsSync),
    server: Box::new(CommandServerBuilder),
    worker: Some(Box::new(CommandWorkerBuilder {
      command: resolved.service_worker_options.command.clone(),
    })),
    adapter: adapters::from_config(config.adapter.as_ref(), &resolved),
    prerender: PrerenderCommand::current_exe()?
      .env(CONFIG_ENV, config_path.to_string_lossy()),
  };

  let mut pipeline = Pipeline::new(resolved, collab).verbose(verbose);
  let outcome = pipeline.run(&CommandClientBuilder).await?;

  let session = pipeline.session();
  ui::blank();
  if !session.warnings().is_empty() {
    ui::warn(&format!("{} warning(s), see above", session.warnings().len()));
  }
  let elapsed = started.elapsed().as_secs_f64();
  match outcome {
    CloseOutcome::Adapted | CloseOutcome::NoAdapter => {
      ui::ok(&format!("build complete in {elapsed:.1}s"));
    }
    CloseOutcome::Skipped => ui::warn("build did not complete, nothing was adapted"),
  }
  Ok(())
}
