/* src/cli/core/src/main.rs */

mod adapters;
mod build;
mod bundler;
mod prerender;
mod shell;
mod sync;
mod worker;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use strata_build::config::{StrataConfig, find_strata_config, load_strata_config};
use strata_build::prerender::CONFIG_ENV;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "strata", about = "Strata build CLI", version)]
struct Cli {
  /// Show debug logs and minor adapter output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Build the app for production
  Build {
    /// Path to strata.toml (auto-detected if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
  },
  /// Render static pages from a finished server build (run by `strata build`)
  #[command(hide = true)]
  Prerender {
    out_dir: PathBuf,
    results: PathBuf,
    manifest: PathBuf,
    #[arg(default_value = "false")]
    verbose_flag: String,
  },
}

fn init_tracing(verbose: bool) {
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
  tracing_subscriber::fmt().with_env_filter(filter).without_time().with_writer(std::io::stderr).init();
}

/// Resolve config path (explicit, then `STRATA_CONFIG`, then upward search) and parse it
fn resolve_config(explicit: Option<PathBuf>) -> Result<(PathBuf, StrataConfig)> {
  let path = match explicit.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from)) {
    Some(p) => p,
    None => {
      let cwd = std::env::current_dir().context("failed to get cwd")?;
      find_strata_config(&cwd)?
    }
  };
  let config = load_strata_config(&path)?;
  Ok((path, config))
}

fn base_dir(config_path: &Path) -> &Path {
  match config_path.parent() {
    Some(p) if !p.as_os_str().is_empty() => p,
    _ => Path::new("."),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  match cli.command {
    Command::Build { config } => {
      init_tracing(cli.verbose);
      let (config_path, strata_config) = resolve_config(config)?;
      build::run_build(&config_path, &strata_config, base_dir(&config_path), cli.verbose).await?;
    }
    Command::Prerender { out_dir, results, manifest, verbose_flag } => {
      let verbose = cli.verbose || verbose_flag == "true";
      init_tracing(verbose);
      let (config_path, strata_config) = resolve_config(None)?;
      let args = prerender::ChildArgs { out_dir, results, manifest, verbose };
      prerender::run_child(&strata_config, base_dir(&config_path), &args)?;
    }
  }

  Ok(())
}
