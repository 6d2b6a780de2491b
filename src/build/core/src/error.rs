/* src/build/core/src/error.rs */

// Fatal build failures that callers may want to tell apart. Everything else
// (I/O, collaborator failures) travels as plain `anyhow::Error` with context.

use thiserror::Error;

use crate::pipeline::Stage;

#[derive(Debug, Error)]
pub enum BuildError {
  /// A server-only module is reachable from client code.
  #[error(
    "cannot import {module} into client-side code:\n  {}\n\nserver-only modules (private env, lib/server) must not be reachable from the browser",
    chain.join(" \u{2192} ")
  )]
  IllegalImport { module: String, chain: Vec<String> },

  /// The prerender child exited unsuccessfully.
  #[error("{label} exited with {}{}", describe_code(*code), describe_output(output))]
  Subprocess { label: String, code: Option<i32>, output: String },

  /// Two configuration options that cannot be combined.
  #[error("cannot use {first} alongside {second}")]
  MutualExclusion { first: String, second: String },

  /// A pipeline hook was called in a stage that does not allow it.
  #[error("cannot {action} while the build is {stage}")]
  StageDependencyUnmet { action: &'static str, stage: Stage },
}

fn describe_code(code: Option<i32>) -> String {
  match code {
    Some(c) => format!("code {c}"),
    None => "a signal".to_string(),
  }
}

fn describe_output(output: &str) -> String {
  let trimmed = output.trim_end();
  if trimmed.is_empty() { String::new() } else { format!("\n{trimmed}") }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn illegal_import_message_names_chain() {
    let err = BuildError::IllegalImport {
      module: "src/lib/server/db.js".into(),
      chain: vec!["src/routes/+page.svelte".into(), "src/lib/server/db.js".into()],
    };
    let msg = err.to_string();
    assert!(msg.contains("cannot import src/lib/server/db.js"));
    assert!(msg.contains("src/routes/+page.svelte \u{2192} src/lib/server/db.js"));
  }

  #[test]
  fn subprocess_message_includes_output() {
    let err =
      BuildError::Subprocess { label: "prerender".into(), code: Some(2), output: "boom\n".into() };
    assert_eq!(err.to_string(), "prerender exited with code 2\nboom");
  }

  #[test]
  fn subprocess_message_without_code() {
    let err = BuildError::Subprocess { label: "prerender".into(), code: None, output: String::new() };
    assert_eq!(err.to_string(), "prerender exited with a signal");
  }
}
