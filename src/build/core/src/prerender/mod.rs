/* src/build/core/src/prerender/mod.rs */

mod pairs;
mod process;
mod types;

use std::path::Path;

use anyhow::{Context, Result};

pub use pairs::PairMap;
pub use process::{
  CONFIG_ENV, PRERENDER_SUBCOMMAND, PrerenderArgs, PrerenderCommand, run_prerender_process,
};
pub use types::{PrerenderResult, PrerenderedAsset, PrerenderedPage, PrerenderedRedirect};

use crate::config::ResolvedConfig;

/// Run the prerender child against a written manifest and load its results.
pub async fn prerender(
  config: &ResolvedConfig,
  command: &PrerenderCommand,
  manifest_file: &Path,
  verbose: bool,
) -> Result<PrerenderResult> {
  let results_file = config.results_file();
  let _ = std::fs::remove_file(&results_file);

  run_prerender_process(
    command,
    PRERENDER_SUBCOMMAND,
    &PrerenderArgs {
      cwd: &config.root,
      out_dir: &config.output_dir,
      results_file: &results_file,
      manifest_file,
      verbose,
    },
  )
  .await?;

  PrerenderResult::read(&results_file).context("prerender child exited without writing results")
}
