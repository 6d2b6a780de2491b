/* src/build/core/src/config/loader.rs */

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use super::StrataConfig;

pub const CONFIG_FILE: &str = "strata.toml";

/// Walk upward from `start` to find `strata.toml`, like Cargo.toml discovery
pub fn find_strata_config(start: &Path) -> Result<PathBuf> {
  let mut dir =
    start.canonicalize().with_context(|| format!("failed to canonicalize {}", start.display()))?;
  loop {
    let candidate = dir.join(CONFIG_FILE);
    if candidate.is_file() {
      return Ok(candidate);
    }
    if !dir.pop() {
      bail!("{CONFIG_FILE} not found (searched upward from {})", start.display());
    }
  }
}

pub fn load_strata_config(path: &Path) -> Result<StrataConfig> {
  let content =
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
  parse_strata_config(&content).with_context(|| format!("failed to parse {}", path.display()))
}

pub fn parse_strata_config(content: &str) -> Result<StrataConfig> {
  let config: StrataConfig = toml::from_str(content)?;
  config.validate()?;
  Ok(config)
}
