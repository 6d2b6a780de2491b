/* src/build/core/src/prerender/process.rs */

// The prerender pass runs in its own OS process so that rendering code never
// shares state with the build. Output is streamed line by line and kept for
// the error report.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;

use crate::error::BuildError;
use crate::ui::{DIM, RESET};

pub const PRERENDER_SUBCOMMAND: &str = "prerender";
pub const CONFIG_ENV: &str = "STRATA_CONFIG";

/// Program and leading arguments of the prerender child. The fixed arguments
/// `[out_dir, results_file, manifest_file, verbose]` are appended at launch.
#[derive(Debug, Clone)]
pub struct PrerenderCommand {
  pub program: PathBuf,
  pub args: Vec<String>,
  pub env: Vec<(String, String)>,
}

impl PrerenderCommand {
  pub fn new(program: impl Into<PathBuf>) -> Self {
    Self { program: program.into(), args: Vec::new(), env: Vec::new() }
  }

  /// The running executable's hidden `prerender` subcommand.
  pub fn current_exe() -> Result<Self> {
    let exe = std::env::current_exe().context("failed to locate the strata executable")?;
    Ok(Self::new(exe).arg(PRERENDER_SUBCOMMAND))
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.push((key.into(), value.into()));
    self
  }
}

/// Paths handed to the child.
#[derive(Debug, Clone)]
pub struct PrerenderArgs<'a> {
  pub cwd: &'a Path,
  pub out_dir: &'a Path,
  pub results_file: &'a Path,
  pub manifest_file: &'a Path,
  pub verbose: bool,
}

fn forward<R>(reader: R, label: String, to_stderr: bool) -> JoinHandle<String>
where
  R: AsyncRead + Unpin + Send + 'static,
{
  tokio::spawn(async move {
    let mut kept = String::new();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    // Raw bytes: a non-UTF-8 line must not stop the drain, or the child dies on SIGPIPE.
    loop {
      buf.clear();
      match reader.read_until(b'\n', &mut buf).await {
        Ok(0) | Err(_) => break,
        Ok(_) => {}
      }
      let line = String::from_utf8_lossy(&buf);
      let line = line.trim_end_matches(['\n', '\r']);
      if to_stderr {
        eprintln!("  {DIM}{label:>10}{RESET} {line}");
      } else {
        println!("  {DIM}{label:>10}{RESET} {line}");
      }
      kept.push_str(&line);
      kept.push('\n');
    }
    kept
  })
}

/// Launch the child, forward its output, and wait for it to exit.
/// A non-zero exit becomes [`BuildError::Subprocess`] carrying the captured output.
pub async fn run_prerender_process(
  command: &PrerenderCommand,
  label: &str,
  args: &PrerenderArgs<'_>,
) -> Result<()> {
  let mut cmd = Command::new(&command.program);
  cmd.args(&command.args);
  cmd.arg(args.out_dir);
  cmd.arg(args.results_file);
  cmd.arg(args.manifest_file);
  cmd.arg(args.verbose.to_string());
  cmd.current_dir(args.cwd);
  cmd.stdout(Stdio::piped());
  cmd.stderr(Stdio::piped());
  cmd.kill_on_drop(true);
  for (k, v) in &command.env {
    cmd.env(k, v);
  }

  tracing::debug!(program = %command.program.display(), args = ?command.args, "spawning prerender child");
  let mut child =
    cmd.spawn().with_context(|| format!("failed to start {}", command.program.display()))?;

  let stdout = child.stdout.take().map(|s| forward(s, label.to_string(), false));
  let stderr = child.stderr.take().map(|s| forward(s, label.to_string(), true));

  let status = child.wait().await.with_context(|| format!("failed to wait for {label}"))?;

  let mut output = String::new();
  for handle in [stdout, stderr].into_iter().flatten() {
    output.push_str(&handle.await.unwrap_or_default());
  }
  tracing::debug!(code = ?status.code(), "prerender child exited");

  if !status.success() {
    return Err(BuildError::Subprocess { label: label.to_string(), code: status.code(), output }.into());
  }
  Ok(())
}

#[cfg(all(test, unix))]
mod tests {
  use super::*;

  fn sh(script: &str) -> PrerenderCommand {
    PrerenderCommand::new("sh").arg("-c").arg(script).arg("prerender")
  }

  fn args(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    (dir.join("out"), dir.join("results.json"), dir.join("manifest.json"))
  }

  #[tokio::test]
  async fn passes_fixed_arguments_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let (out, results, manifest) = args(tmp.path());
    let cmd = sh(r#"printf '%s\n%s\n%s\n%s\n' "$1" "$2" "$3" "$4" > "$2""#);
    run_prerender_process(
      &cmd,
      "prerender",
      &PrerenderArgs {
        cwd: tmp.path(),
        out_dir: &out,
        results_file: &results,
        manifest_file: &manifest,
        verbose: true,
      },
    )
    .await
    .unwrap();
    let written = std::fs::read_to_string(&results).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].ends_with("out"));
    assert!(lines[1].ends_with("results.json"));
    assert!(lines[2].ends_with("manifest.json"));
    assert_eq!(lines[3], "true");
  }

  #[tokio::test]
  async fn failure_carries_code_and_output() {
    let tmp = tempfile::tempdir().unwrap();
    let (out, results, manifest) = args(tmp.path());
    let cmd = sh("echo rendering /about; echo 'render failed' >&2; exit 3");
    let err = run_prerender_process(
      &cmd,
      "prerender",
      &PrerenderArgs {
        cwd: tmp.path(),
        out_dir: &out,
        results_file: &results,
        manifest_file: &manifest,
        verbose: false,
      },
    )
    .await
    .unwrap_err();
    match err.downcast_ref::<BuildError>() {
      Some(BuildError::Subprocess { code, output, .. }) => {
        assert_eq!(*code, Some(3));
        assert!(output.contains("rendering /about"));
        assert!(output.contains("render failed"));
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[tokio::test]
  async fn env_reaches_child() {
    let tmp = tempfile::tempdir().unwrap();
    let (out, results, manifest) = args(tmp.path());
    let cmd = sh(r#"printf '%s' "$STRATA_CONFIG" > "$2""#).env(CONFIG_ENV, "/p/strata.toml");
    run_prerender_process(
      &cmd,
      "prerender",
      &PrerenderArgs {
        cwd: tmp.path(),
        out_dir: &out,
        results_file: &results,
        manifest_file: &manifest,
        verbose: false,
      },
    )
    .await
    .unwrap();
    assert_eq!(std::fs::read_to_string(&results).unwrap(), "/p/strata.toml");
  }

  #[tokio::test]
  async fn invalid_utf8_output_keeps_draining() {
    let tmp = tempfile::tempdir().unwrap();
    let (out, results, manifest) = args(tmp.path());
    let cmd = sh(
      r#"printf 'bad \377 byte\n'; i=0; while [ $i -lt 20000 ]; do echo "line $i"; i=$((i+1)); done; echo done > "$2""#,
    );
    run_prerender_process(
      &cmd,
      "prerender",
      &PrerenderArgs {
        cwd: tmp.path(),
        out_dir: &out,
        results_file: &results,
        manifest_file: &manifest,
        verbose: false,
      },
    )
    .await
    .unwrap();
    assert_eq!(std::fs::read_to_string(&results).unwrap(), "done\n");
  }
}
