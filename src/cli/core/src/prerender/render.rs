/* src/cli/core/src/prerender/render.rs */

// One render request: the configured render command receives the path in
// `STRATA_ROUTE` and prints a JSON response on stdout.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::shell::capture_command;

const ROUTE_ENV: &str = "STRATA_ROUTE";
const MANIFEST_ENV: &str = "STRATA_MANIFEST";

#[derive(Debug, Deserialize)]
struct RenderResponse {
  status: u16,
  #[serde(default)]
  headers: BTreeMap<String, String>,
  #[serde(default)]
  body: String,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Rendered {
  Page { html: String },
  Asset { body: String, content_type: String },
  Redirect { status: u16, location: String },
}

fn header<'a>(headers: &'a BTreeMap<String, String>, name: &str) -> Option<&'a str> {
  headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
}

fn classify(path: &str, response: RenderResponse) -> Result<Rendered> {
  let status = response.status;
  if (300..400).contains(&status) {
    let Some(location) = header(&response.headers, "location") else {
      bail!("{path} responded with {status} but no location header");
    };
    return Ok(Rendered::Redirect { status, location: location.to_string() });
  }
  if !(200..300).contains(&status) {
    bail!("{path} responded with status {status}");
  }
  let content_type = header(&response.headers, "content-type").unwrap_or("text/html");
  if content_type.starts_with("text/html") {
    return Ok(Rendered::Page { html: response.body });
  }
  Ok(Rendered::Asset { body: response.body, content_type: content_type.to_string() })
}

pub(crate) fn render(root: &Path, command: &str, path: &str, manifest: &Path) -> Result<Rendered> {
  let manifest = manifest.to_string_lossy();
  let stdout = capture_command(root, command, &format!("render {path}"), &[
    (ROUTE_ENV, path),
    (MANIFEST_ENV, &manifest),
  ])?;
  let response: RenderResponse = serde_json::from_str(stdout.trim())
    .with_context(|| format!("render command printed invalid JSON for {path}"))?;
  classify(path, response)
}

/// Output file for a page: `/` -> `index.html`, `/about` -> `about.html`,
/// `/docs/` -> `docs/index.html`.
pub(crate) fn page_file(path: &str) -> String {
  let trimmed = path.trim_start_matches('/');
  if trimmed.is_empty() {
    "index.html".to_string()
  } else if trimmed.ends_with('/') {
    format!("{trimmed}index.html")
  } else {
    format!("{trimmed}.html")
  }
}
