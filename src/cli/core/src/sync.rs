/* src/cli/core/src/sync.rs */

// Filesystem route scan: turns `src/routes` into `ManifestData` and writes the
// generated entry modules the bundler starts from.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use regex::Regex;
use strata_build::config::ResolvedConfig;
use strata_build::manifest::{ManifestData, PageNode, PageNodes, RouteData, RouteParam, StaticAsset};
use strata_build::pipeline::RouteSync;

fn prerender_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| Regex::new(r"export\s+const\s+prerender\s*=\s*(true|false)").unwrap())
}

/// `[name]`, `[name=matcher]`, `[...rest]` and `[[optional]]` segments.
fn param_re() -> &'static Regex {
  static RE: OnceLock<Regex> = OnceLock::new();
  RE.get_or_init(|| {
    Regex::new(r"^\[(\[)?(\.\.\.)?([A-Za-z_][A-Za-z0-9_]*)(?:=([A-Za-z_][A-Za-z0-9_]*))?\]?\]$").unwrap()
  })
}

pub(crate) struct FsSync;

impl RouteSync for FsSync {
  fn manifest_data(&self, config: &ResolvedConfig) -> Result<ManifestData> {
    let data = scan(config)?;
    write_generated(config, &data)?;
    Ok(data)
  }
}

/// Source files of one layout, page or error level, project-relative.
#[derive(Debug, Default, Clone)]
struct NodeFiles {
  component: Option<String>,
  universal: Option<String>,
  server: Option<String>,
}

impl NodeFiles {
  fn is_empty(&self) -> bool {
    self.component.is_none() && self.universal.is_none() && self.server.is_none()
  }
}

#[derive(Debug, Default)]
struct RouteDir {
  /// Route id, `/` for the routes root.
  id: String,
  layout: NodeFiles,
  page: NodeFiles,
  error: Option<String>,
  endpoint: Option<String>,
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
  let mut entries = Vec::new();
  for entry in std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))? {
    entries.push(entry?.path());
  }
  entries.sort();
  Ok(entries)
}

fn collect_dirs(config: &ResolvedConfig, dir: &Path, id: String, out: &mut Vec<RouteDir>) -> Result<()> {
  let mut route = RouteDir { id: id.clone(), ..Default::default() };
  let mut children = Vec::new();

  for path in sorted_entries(dir)? {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
      continue;
    };
    if path.is_dir() {
      let child_id = if id == "/" { format!("/{name}") } else { format!("{id}/{name}") };
      children.push((path, child_id));
      continue;
    }
    let rel = config.relative(&path);
    let (stem, ext) = name.split_once('.').map_or((name.as_str(), ""), |(s, e)| (s, e));
    let is_component = ext == "svelte";
    let is_server = ext.starts_with("server.");
    let files = match stem {
      "+page" => &mut route.page,
      "+layout" => &mut route.layout,
      "+error" if is_component => {
        route.error = Some(rel);
        continue;
      }
      "+server" => {
        route.endpoint = Some(rel);
        continue;
      }
      _ => continue,
    };
    if is_component {
      files.component = Some(rel);
    } else if is_server {
      files.server = Some(rel);
    } else {
      files.universal = Some(rel);
    }
  }

  out.push(route);
  for (path, child_id) in children {
    collect_dirs(config, &path, child_id, out)?;
  }
  Ok(())
}

fn read_prerender(config: &ResolvedConfig, file: Option<&String>) -> Option<bool> {
  let content = std::fs::read_to_string(config.root.join(file?)).ok()?;
  let caps = prerender_re().captures(&content)?;
  Some(&caps[1] == "true")
}

fn node_from(config: &ResolvedConfig, files: &NodeFiles) -> PageNode {
  let prerender = read_prerender(config, files.server.as_ref())
    .or_else(|| read_prerender(config, files.universal.as_ref()));
  PageNode {
    component: files.component.clone(),
    universal: files.universal.clone(),
    server: files.server.clone(),
    prerender,
  }
}

/// Regex source and params for a route id. Group segments match nothing.
fn parse_route_id(id: &str) -> (String, Vec<RouteParam>) {
  let mut pattern = String::from("^");
  let mut params = Vec::new();
  for segment in id.split('/').filter(|s| !s.is_empty()) {
    if segment.starts_with('(') && segment.ends_with(')') {
      continue;
    }
    match param_re().captures(segment) {
      Some(caps) => {
        let optional = caps.get(1).is_some();
        let rest = caps.get(2).is_some();
        params.push(RouteParam {
          name: caps[3].to_string(),
          matcher: caps.get(4).map(|m| m.as_str().to_string()),
          optional,
          rest,
        });
        pattern.push_str(match (optional, rest) {
          (_, true) => "(?:/(.*))?",
          (true, false) => "(?:/([^/]+))?",
          (false, false) => "/([^/]+?)",
        });
      }
      None => {
        let _ = write!(pattern, "/{}", regex::escape(segment));
      }
    }
  }
  if pattern == "^" {
    pattern.push_str("/$");
  } else {
    pattern.push_str("/?$");
  }
  (pattern, params)
}

/// Ids of the route's ancestors, outermost first, including the route itself.
fn ancestry(id: &str) -> Vec<String> {
  let mut chain = vec!["/".to_string()];
  let mut current = String::new();
  for segment in id.split('/').filter(|s| !s.is_empty()) {
    current.push('/');
    current.push_str(segment);
    chain.push(current.clone());
  }
  chain
}

fn scan_assets(dir: &Path, prefix: &str, out: &mut Vec<StaticAsset>) -> Result<()> {
  for path in sorted_entries(dir)? {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let rel = if prefix.is_empty() { name } else { format!("{prefix}/{name}") };
    if path.is_dir() {
      scan_assets(&path, &rel, out)?;
    } else {
      let size = path.metadata().map(|m| m.len()).unwrap_or(0);
      out.push(StaticAsset { file: rel, size });
    }
  }
  Ok(())
}

pub(crate) fn scan(config: &ResolvedConfig) -> Result<ManifestData> {
  let mut dirs = Vec::new();
  if config.routes_dir.is_dir() {
    collect_dirs(config, &config.routes_dir, "/".to_string(), &mut dirs)?;
  }

  // Nodes 0 and 1 are always the root layout and root error page.
  let root = dirs.iter().find(|d| d.id == "/");
  let mut nodes = vec![
    root.map(|r| node_from(config, &r.layout)).unwrap_or_default(),
    PageNode { component: root.and_then(|r| r.error.clone()), ..Default::default() },
  ];
  let mut layouts: BTreeMap<&str, usize> = BTreeMap::from([("/", 0)]);
  let mut errors: BTreeMap<&str, usize> = BTreeMap::from([("/", 1)]);

  for dir in dirs.iter().filter(|d| d.id != "/") {
    if !dir.layout.is_empty() {
      layouts.insert(&dir.id, nodes.len());
      nodes.push(node_from(config, &dir.layout));
    }
    if let Some(error) = &dir.error {
      errors.insert(&dir.id, nodes.len());
      nodes.push(PageNode { component: Some(error.clone()), ..Default::default() });
    }
  }

  let mut routes = Vec::new();
  for dir in &dirs {
    if dir.page.is_empty() && dir.endpoint.is_none() {
      continue;
    }
    let (pattern, params) = parse_route_id(&dir.id);
    let chain = ancestry(&dir.id);

    let mut prerender = None;
    for level in &chain {
      if let Some(&i) = layouts.get(level.as_str())
        && let Some(p) = nodes[i].prerender
      {
        prerender = Some(p);
      }
    }

    let page = if dir.page.is_empty() {
      None
    } else {
      let leaf = nodes.len();
      let node = node_from(config, &dir.page);
      if node.prerender.is_some() {
        prerender = node.prerender;
      }
      nodes.push(node);
      Some(PageNodes {
        layouts: chain.iter().map(|l| layouts.get(l.as_str()).copied()).collect(),
        errors: chain.iter().map(|l| errors.get(l.as_str()).copied()).collect(),
        leaf,
      })
    };
    if page.is_none()
      && let Some(p) = read_prerender(config, dir.endpoint.as_ref())
    {
      prerender = Some(p);
    }

    routes.push(RouteData {
      id: dir.id.clone(),
      pattern,
      params,
      page,
      endpoint: dir.endpoint.clone(),
      prerender,
    });
  }

  let mut assets = Vec::new();
  if config.assets_dir.is_dir() {
    scan_assets(&config.assets_dir, "", &mut assets)?;
  }

  tracing::debug!(routes = routes.len(), nodes = nodes.len(), assets = assets.len(), "scanned routes");
  Ok(ManifestData { assets, nodes, routes })
}

fn js(value: &str) -> String {
  serde_json::Value::from(value).to_string()
}

fn write_file(path: &Path, content: &str) -> Result<()> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
  }
  std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

/// Write the client bootstrap and the server index into `generated/`.
fn write_generated(config: &ResolvedConfig, data: &ManifestData) -> Result<()> {
  let mut app = String::from("// Generated by strata. Do not edit.\n\nexport const nodes = [\n");
  for node in &data.nodes {
    match node.client_entry() {
      Some(entry) => {
        let _ = writeln!(app, "\t() => import({}),", js(&config.module_id(entry)));
      }
      None => app.push_str("\tnull,\n"),
    }
  }
  app.push_str("];\n\nexport const routes = [\n");
  for route in &data.routes {
    let leaf = route.page.as_ref().map_or("null".to_string(), |p| p.leaf.to_string());
    let _ = writeln!(app, "\t[{}, new RegExp({}), {leaf}],", js(&route.id), js(&route.pattern));
  }
  app.push_str("];\n");

  let start = format!(
    "// Generated by strata. Do not edit.\n\nimport {{ nodes, routes }} from \"./app.js\";\n\n\
     export const version = {};\n\n\
     export function start(target) {{\n\treturn {{ target, nodes, routes, version }};\n}}\n",
    js(&config.version)
  );

  let server = format!(
    "// Generated by strata. Do not edit.\n\n\
     export const options = {{\n\tappDir: {},\n\tbase: {},\n\tversion: {},\n}};\n",
    js(&config.app_dir),
    js(&config.base),
    js(&config.version)
  );

  write_file(&config.generated_dir.join("client").join("app.js"), &app)?;
  write_file(&config.client_start(), &start)?;
  write_file(&config.server_index(), &server)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use strata_build::config::parse_strata_config;

  use super::*;

  fn project(files: &[(&str, &str)]) -> (tempfile::TempDir, ResolvedConfig) {
    let tmp = tempfile::tempdir().unwrap();
    for (path, content) in files {
      let full = tmp.path().join(path);
      std::fs::create_dir_all(full.parent().unwrap()).unwrap();
      std::fs::write(full, content).unwrap();
    }
    let config = parse_strata_config("[project]\nname = \"t\"\n").unwrap();
    let resolved = ResolvedConfig::from_strata_config(&config, tmp.path()).unwrap();
    (tmp, resolved)
  }

  #[test]
  fn route_patterns() {
    assert_eq!(parse_route_id("/").0, "^/$");
    assert_eq!(parse_route_id("/about").0, "^/about/?$");
    assert_eq!(parse_route_id("/(app)/blog/[slug]").0, "^/blog/([^/]+?)/?$");
    let (pattern, params) = parse_route_id("/docs/[...path]");
    assert_eq!(pattern, "^/docs(?:/(.*))?/?$");
    assert!(params[0].rest);
    let (_, params) = parse_route_id("/[[lang]]/[id=integer]");
    assert!(params[0].optional);
    assert_eq!(params[1].matcher.as_deref(), Some("integer"));
  }

  #[test]
  fn scans_pages_layouts_and_endpoints() {
    let (_tmp, config) = project(&[
      ("src/routes/+layout.svelte", ""),
      ("src/routes/+page.svelte", ""),
      ("src/routes/about/+page.svelte", ""),
      ("src/routes/about/+page.js", "export const prerender = true;\n"),
      ("src/routes/blog/+layout.svelte", ""),
      ("src/routes/blog/[slug]/+page.svelte", ""),
      ("src/routes/api/health/+server.js", "export function GET() {}\n"),
      ("static/favicon.png", "png"),
    ]);
    let data = scan(&config).unwrap();

    let ids: Vec<&str> = data.routes.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["/", "/about", "/api/health", "/blog/[slug]"]);
    assert_eq!(data.nodes[0].component.as_deref(), Some("src/routes/+layout.svelte"));
    assert!(data.nodes[1].component.is_none());

    let about = &data.routes[1];
    assert_eq!(about.prerender, Some(true));
    let page = about.page.as_ref().unwrap();
    assert_eq!(page.layouts, vec![Some(0), None]);
    assert_eq!(data.nodes[page.leaf].universal.as_deref(), Some("src/routes/about/+page.js"));

    let health = &data.routes[2];
    assert!(health.page.is_none());
    assert_eq!(health.endpoint.as_deref(), Some("src/routes/api/health/+server.js"));

    let blog = data.routes[3].page.as_ref().unwrap();
    assert_eq!(blog.layouts.len(), 3);
    assert!(blog.layouts[1].is_some());

    assert_eq!(data.assets, vec![StaticAsset { file: "favicon.png".into(), size: 3 }]);
  }

  #[test]
  fn layout_prerender_inherited_and_overridden() {
    let (_tmp, config) = project(&[
      ("src/routes/docs/+layout.js", "export const prerender = true;"),
      ("src/routes/docs/intro/+page.svelte", ""),
      ("src/routes/docs/live/+page.server.js", "export const prerender = false;"),
    ]);
    let data = scan(&config).unwrap();
    let intro = data.routes.iter().find(|r| r.id == "/docs/intro").unwrap();
    let live = data.routes.iter().find(|r| r.id == "/docs/live").unwrap();
    assert_eq!(intro.prerender, Some(true));
    assert_eq!(live.prerender, Some(false));
  }

  #[test]
  fn writes_generated_entries() {
    let (_tmp, config) = project(&[("src/routes/about/+page.svelte", "")]);
    FsSync.manifest_data(&config).unwrap();
    let app = std::fs::read_to_string(config.generated_dir.join("client/app.js")).unwrap();
    assert!(app.contains("+page.svelte"));
    assert!(config.client_start().is_file());
    assert!(config.server_index().is_file());
  }
}
