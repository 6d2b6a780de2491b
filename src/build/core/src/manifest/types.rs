/* src/build/core/src/manifest/types.rs */

// Route tree produced by the sync step. Read-only for the duration of a build.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestData {
  /// Files served verbatim from the static assets directory.
  pub assets: Vec<StaticAsset>,
  pub nodes: Vec<PageNode>,
  pub routes: Vec<RouteData>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticAsset {
  /// Path relative to the assets directory, forward slashes.
  pub file: String,
  pub size: u64,
}

/// A layout, error page or leaf page. Source paths are project-relative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageNode {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub component: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub universal: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub server: Option<String>,
  /// Value of `export const prerender` in the node's modules, if any.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub prerender: Option<bool>,
}

impl PageNode {
  /// Module the client bundle starts from for this node.
  pub fn client_entry(&self) -> Option<&str> {
    self.component.as_deref().or(self.universal.as_deref())
  }

  /// Module the server bundle starts from for this node.
  pub fn server_entry(&self) -> Option<&str> {
    self.server.as_deref().or(self.universal.as_deref()).or(self.component.as_deref())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteParam {
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub matcher: Option<String>,
  #[serde(default)]
  pub optional: bool,
  #[serde(default)]
  pub rest: bool,
}

/// Node indices making up a page route: layouts and error pages outermost
/// first, `None` where a level has no node of that kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageNodes {
  pub layouts: Vec<Option<usize>>,
  pub errors: Vec<Option<usize>>,
  pub leaf: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteData {
  /// Route id as written on disk, e.g. `/blog/[slug]`.
  pub id: String,
  /// Regular expression source matching request paths.
  pub pattern: String,
  pub params: Vec<RouteParam>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub page: Option<PageNodes>,
  /// Project-relative `+server` module.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub endpoint: Option<String>,
  /// Effective prerender option; innermost declaration wins.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub prerender: Option<bool>,
}

impl RouteData {
  pub fn is_dynamic(&self) -> bool {
    !self.params.is_empty()
  }

  /// Request path for a route without parameters; group segments dropped.
  pub fn static_path(&self) -> Option<String> {
    if self.is_dynamic() {
      return None;
    }
    let segments: Vec<&str> = self
      .id
      .split('/')
      .filter(|s| !s.is_empty() && !(s.starts_with('(') && s.ends_with(')')))
      .collect();
    Some(format!("/{}", segments.join("/")))
  }
}
