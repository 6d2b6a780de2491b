/* src/cli/core/src/prerender/crawl.rs */

use std::sync::OnceLock;

use regex::Regex;

fn href_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r#"href\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap())
}

/// Same-origin paths linked from `html`, without query or fragment.
/// Links into the client asset directory are skipped.
pub(crate) fn find_links(html: &str, app_dir: &str) -> Vec<String> {
  let asset_prefix = format!("/{app_dir}/");
  let mut links = Vec::new();
  for caps in href_re().captures_iter(html) {
    let Some(raw) = caps.get(1).or_else(|| caps.get(2)) else { continue };
    let href = raw.as_str();
    if !href.starts_with('/') || href.starts_with("//") {
      continue;
    }
    let end = href.find(['?', '#']).unwrap_or(href.len());
    let path = &href[..end];
    if path.is_empty() || path.starts_with(&asset_prefix) {
      continue;
    }
    let path = if path.len() > 1 { path.trim_end_matches('/') } else { path };
    if !links.iter().any(|l| l == path) {
      links.push(path.to_string());
    }
  }
  links
}

/// Request path of a route without parameters; group segments dropped.
pub(crate) fn route_path(id: &str) -> String {
  let segments: Vec<&str> = id
    .split('/')
    .filter(|s| !s.is_empty() && !(s.starts_with('(') && s.ends_with(')')))
    .collect();
  format!("/{}", segments.join("/"))
}
