/* src/build/core/src/prerender/types.rs */

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::pairs::PairMap;
use crate::manifest::RouteData;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerenderedPage {
  /// Path of the written html file, relative to the prerendered output directory.
  pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerenderedAsset {
  pub file: String,
  pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerenderedRedirect {
  pub status: u16,
  pub location: String,
}

/// Everything the prerender child produced, keyed by request path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrerenderResult {
  #[serde(default)]
  pub pages: PairMap<String, PrerenderedPage>,
  #[serde(default)]
  pub assets: PairMap<String, PrerenderedAsset>,
  #[serde(default)]
  pub redirects: PairMap<String, PrerenderedRedirect>,
}

impl PrerenderResult {
  pub fn read(path: &Path) -> Result<Self> {
    let content = std::fs::read_to_string(path)
      .with_context(|| format!("failed to read prerender results at {}", path.display()))?;
    serde_json::from_str(&content)
      .with_context(|| format!("failed to parse prerender results at {}", path.display()))
  }

  pub fn write(&self, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(self)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
  }

  /// Route ids that need no server at runtime: explicitly prerendered routes,
  /// plus static routes whose page was written.
  pub fn prerendered_routes(&self, routes: &[RouteData]) -> BTreeSet<String> {
    routes
      .iter()
      .filter(|route| {
        route.prerender == Some(true)
          || route.static_path().is_some_and(|path| self.pages.contains_key(path.as_str()))
      })
      .map(|route| route.id.clone())
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::RouteParam;

  fn route(id: &str, dynamic: bool, prerender: Option<bool>) -> RouteData {
    let params = if dynamic {
      vec![RouteParam { name: "slug".into(), matcher: None, optional: false, rest: false }]
    } else {
      vec![]
    };
    RouteData { id: id.into(), pattern: String::new(), params, page: None, endpoint: None, prerender }
  }

  #[test]
  fn results_file_uses_pair_form() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("output/prerender-results.json");
    let mut result = PrerenderResult::default();
    result.pages.insert("/about".into(), PrerenderedPage { file: "about.html".into() });
    result.redirects.insert("/old".into(), PrerenderedRedirect { status: 301, location: "/new".into() });
    result.write(&path).unwrap();

    let raw: serde_json::Value =
      serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["pages"][0][0], "/about");
    assert_eq!(raw["pages"][0][1]["file"], "about.html");
    assert_eq!(PrerenderResult::read(&path).unwrap(), result);
  }

  #[test]
  fn prerendered_routes_from_pages_and_flags() {
    let mut result = PrerenderResult::default();
    result.pages.insert("/about".into(), PrerenderedPage { file: "about.html".into() });
    let routes = vec![
      route("/(marketing)/about", false, None),
      route("/contact", false, None),
      route("/blog/[slug]", true, None),
      route("/docs/[slug]", true, Some(true)),
    ];
    let ids: Vec<String> = result.prerendered_routes(&routes).into_iter().collect();
    assert_eq!(ids, vec!["/(marketing)/about", "/docs/[slug]"]);
  }
}
