/* src/build/core/src/adapter.rs */

// Deployment adapters receive a `Builder` once every build stage succeeded.

use std::path::Path;

use anyhow::{Context, Result};

use crate::bundle::BuildData;
use crate::config::ResolvedConfig;
use crate::prerender::PrerenderResult;
use crate::ui::{self, DIM, RESET};

pub trait Adapter {
  fn name(&self) -> &str;
  fn adapt(&self, builder: &Builder<'_>) -> Result<()>;
}

/// Operator-facing log handed to adapters. `minor` lines only show with `-v`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logger {
  pub verbose: bool,
}

impl Logger {
  pub fn info(&self, msg: &str) {
    ui::detail(msg);
  }

  pub fn success(&self, msg: &str) {
    ui::detail_ok(msg);
  }

  pub fn warn(&self, msg: &str) {
    ui::detail_warn(msg);
  }

  pub fn error(&self, msg: &str) {
    ui::fail(msg);
  }

  pub fn minor(&self, msg: &str) {
    if self.verbose {
      ui::detail(&format!("{DIM}{msg}{RESET}"));
    }
  }
}

pub struct Builder<'a> {
  pub config: &'a ResolvedConfig,
  pub build_data: &'a BuildData,
  pub prerendered: &'a PrerenderResult,
  pub log: Logger,
}

impl Builder<'_> {
  /// Copy the client output into `dest`. Returns copied files, relative to `dest`.
  pub fn write_client(&self, dest: &Path) -> Result<Vec<String>> {
    copy(&self.config.client_out, dest)
  }

  pub fn write_server(&self, dest: &Path) -> Result<Vec<String>> {
    copy(&self.config.server_out, dest)
  }

  pub fn write_prerendered(&self, dest: &Path) -> Result<Vec<String>> {
    if !self.config.prerendered_out.exists() {
      return Ok(vec![]);
    }
    copy(&self.config.prerendered_out, dest)
  }

  /// Copy the static assets directory, if the project has one.
  pub fn write_assets(&self, dest: &Path) -> Result<Vec<String>> {
    if !self.config.assets_dir.is_dir() {
      return Ok(vec![]);
    }
    copy(&self.config.assets_dir, dest)
  }

  pub fn rimraf(&self, dir: &Path) -> Result<()> {
    if dir.exists() {
      std::fs::remove_dir_all(dir).with_context(|| format!("failed to remove {}", dir.display()))?;
    }
    Ok(())
  }
}

/// Recursively copy `from` into `to`, creating directories as needed.
/// Returns the copied files relative to `to`, forward slashes, sorted.
pub fn copy(from: &Path, to: &Path) -> Result<Vec<String>> {
  let mut files = Vec::new();
  copy_into(from, to, "", &mut files)?;
  files.sort();
  Ok(files)
}

fn copy_into(from: &Path, to: &Path, prefix: &str, files: &mut Vec<String>) -> Result<()> {
  if from.is_file() {
    if let Some(parent) = to.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(from, to)
      .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))?;
    files.push(prefix.to_string());
    return Ok(());
  }

  std::fs::create_dir_all(to).with_context(|| format!("failed to create {}", to.display()))?;
  let entries =
    std::fs::read_dir(from).with_context(|| format!("failed to read {}", from.display()))?;
  for entry in entries {
    let entry = entry?;
    let name = entry.file_name().to_string_lossy().into_owned();
    let rel = if prefix.is_empty() { name.clone() } else { format!("{prefix}/{name}") };
    copy_into(&entry.path(), &to.join(&name), &rel, files)?;
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn copy_returns_sorted_relative_files() {
    let tmp = tempfile::tempdir().unwrap();
    let src = tmp.path().join("src");
    std::fs::create_dir_all(src.join("_app/immutable")).unwrap();
    std::fs::write(src.join("_app/version.json"), "{}").unwrap();
    std::fs::write(src.join("_app/immutable/start.js"), "").unwrap();
    std::fs::write(src.join("index.html"), "").unwrap();

    let dest = tmp.path().join("dest");
    let files = copy(&src, &dest).unwrap();
    assert_eq!(files, vec!["_app/immutable/start.js", "_app/version.json", "index.html"]);
    assert!(dest.join("_app/immutable/start.js").is_file());
  }

  #[test]
  fn copy_single_file() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("a.txt"), "a").unwrap();
    let files = copy(&tmp.path().join("a.txt"), &tmp.path().join("out/b.txt")).unwrap();
    assert_eq!(files, vec![""]);
    assert_eq!(std::fs::read_to_string(tmp.path().join("out/b.txt")).unwrap(), "a");
  }
}
