/* src/cli/core/src/shell.rs */

// Shell command helpers shared by the command-driven collaborators.

use std::path::Path;
use std::process::{Command, Output};

use anyhow::{Context, Result, bail};
use strata_build::ui::{self, DIM, RESET};

fn spawn(base_dir: &Path, command: &str, label: &str, env: &[(&str, &str)]) -> Result<Output> {
  let mut cmd = Command::new("sh");
  cmd.args(["-c", command]);
  cmd.current_dir(base_dir);
  for (k, v) in env {
    cmd.env(k, v);
  }
  let output = cmd.output().with_context(|| format!("failed to run {label}"))?;
  if !output.status.success() {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut msg = format!("{label} exited with status {}", output.status);
    if !stderr.is_empty() {
      msg.push('\n');
      msg.push_str(&stderr);
    }
    if !stdout.is_empty() {
      msg.push('\n');
      msg.push_str(&stdout);
    }
    bail!("{msg}");
  }
  Ok(output)
}

/// Run a shell command, bail on failure (shows both stdout and stderr on error).
pub(crate) fn run_command(
  base_dir: &Path,
  command: &str,
  label: &str,
  env: &[(&str, &str)],
) -> Result<()> {
  ui::detail(&format!("{DIM}{command}{RESET}"));
  spawn(base_dir, command, label, env)?;
  Ok(())
}

/// Run a shell command quietly and return its stdout.
pub(crate) fn capture_command(
  base_dir: &Path,
  command: &str,
  label: &str,
  env: &[(&str, &str)],
) -> Result<String> {
  let output = spawn(base_dir, command, label, env)?;
  String::from_utf8(output.stdout).with_context(|| format!("{label} printed invalid UTF-8"))
}
