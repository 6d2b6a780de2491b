/* src/cli/core/src/prerender/mod.rs */

// The prerender child process. Reads the runtime manifest written by the
// parent, renders every prerenderable path and reports back via the results file.

mod crawl;
mod render;

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use regex::Regex;
use strata_build::config::{ResolvedConfig, StrataConfig};
use strata_build::manifest::{ManifestRoute, RuntimeManifest, read_manifest_file};
use strata_build::prerender::{
  PrerenderResult, PrerenderedAsset, PrerenderedPage, PrerenderedRedirect,
};
use strata_build::ui::{self, DIM, RESET};

use self::crawl::{find_links, route_path};
use self::render::{Rendered, page_file, render};

pub(crate) struct ChildArgs {
  pub out_dir: PathBuf,
  pub results: PathBuf,
  pub manifest: PathBuf,
  pub verbose: bool,
}

/// How a path entered the queue; only explicit entries and crawled links
/// count as failures when they match no route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
  Wildcard,
  Entry,
  Crawled,
}

struct Route<'a> {
  data: &'a ManifestRoute,
  pattern: Regex,
}

/// Per-segment rank of a route id: static segments before matched params,
/// plain params, optional params and rest params. Groups are ignored.
fn specificity(id: &str) -> Vec<u8> {
  id.split('/')
    .filter(|s| !s.is_empty() && !(s.starts_with('(') && s.ends_with(')')))
    .map(|s| {
      if s.starts_with("[[") {
        3
      } else if s.starts_with("[...") {
        4
      } else if s.contains('[') {
        if s.contains('=') { 1 } else { 2 }
      } else {
        0
      }
    })
    .collect()
}

/// Compiled routes, most specific first, so that `/blog/archive` wins over
/// `/blog/[slug]` regardless of manifest order.
fn compile_routes(manifest: &RuntimeManifest) -> Result<Vec<Route<'_>>> {
  let mut routes = manifest
    .routes
    .iter()
    .map(|data| {
      let pattern = Regex::new(&data.pattern)
        .with_context(|| format!("invalid pattern for route {}", data.id))?;
      Ok(Route { data, pattern })
    })
    .collect::<Result<Vec<_>>>()?;
  routes.sort_by(|a, b| {
    specificity(&a.data.id).cmp(&specificity(&b.data.id)).then_with(|| a.data.id.cmp(&b.data.id))
  });
  Ok(routes)
}

/// Pages without parameters render unless opted out. Dynamic routes and
/// endpoints render only when opted in.
fn should_render(route: &ManifestRoute) -> bool {
  match route.prerender {
    Some(flag) => flag,
    None => route.params.is_empty() && route.page.is_some(),
  }
}

/// Paths rendered without being asked for: every parameterless route that renders.
fn wildcard_paths(manifest: &RuntimeManifest) -> Vec<String> {
  manifest
    .routes
    .iter()
    .filter(|r| r.params.is_empty() && should_render(r))
    .map(|r| route_path(&r.id))
    .collect()
}

fn write_output(dir: &Path, file: &str, body: &str) -> Result<()> {
  let path = dir.join(file);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  std::fs::write(&path, body).with_context(|| format!("failed to write {}", path.display()))
}

struct Prerenderer<'a> {
  root: &'a Path,
  command: &'a str,
  manifest_path: &'a Path,
  app_dir: &'a str,
  out: PathBuf,
  crawl: bool,
  strict: bool,
  verbose: bool,
  routes: Vec<Route<'a>>,
  queue: VecDeque<(String, Origin)>,
  seen: HashSet<String>,
  result: PrerenderResult,
  failures: Vec<String>,
}

impl Prerenderer<'_> {
  fn enqueue(&mut self, path: String, origin: Origin) {
    if self.seen.insert(path.clone()) {
      self.queue.push_back((path, origin));
    }
  }

  fn run(&mut self) {
    while let Some((path, origin)) = self.queue.pop_front() {
      let Some(route) = self.routes.iter().find(|r| r.pattern.is_match(&path)).map(|r| r.data)
      else {
        if origin != Origin::Wildcard {
          self.unmatched(&path);
        }
        continue;
      };
      if !should_render(route) {
        continue;
      }
      if let Err(e) = self.render_one(&path) {
        self.failures.push(format!("{e:#}"));
      }
    }
  }

  fn unmatched(&mut self, path: &str) {
    let msg = format!("{path} does not match any route");
    if self.strict {
      self.failures.push(msg);
    } else {
      ui::detail_warn(&msg);
    }
  }

  fn render_one(&mut self, path: &str) -> Result<()> {
    let rendered = render(self.root, self.command, path, self.manifest_path)?;
    match rendered {
      Rendered::Page { html } => {
        let file = page_file(path);
        write_output(&self.out, &file, &html)?;
        if self.crawl {
          for link in find_links(&html, self.app_dir) {
            self.enqueue(link, Origin::Crawled);
          }
        }
        self.log(path, &file);
        self.result.pages.insert(path.to_string(), PrerenderedPage { file });
      }
      Rendered::Asset { body, content_type } => {
        let file = path.trim_start_matches('/').to_string();
        write_output(&self.out, &file, &body)?;
        self.log(path, &file);
        self.result.assets.insert(path.to_string(), PrerenderedAsset { file, content_type });
      }
      Rendered::Redirect { status, location } => {
        self.log(path, &format!("{status} {location}"));
        if self.crawl && location.starts_with('/') && !location.starts_with("//") {
          self.enqueue(location.clone(), Origin::Crawled);
        }
        self.result.redirects.insert(path.to_string(), PrerenderedRedirect { status, location });
      }
    }
    Ok(())
  }

  fn log(&self, path: &str, target: &str) {
    if self.verbose {
      ui::detail(&format!("{path} {DIM}-> {target}{RESET}"));
    }
  }
}

pub(crate) fn run_child(config: &StrataConfig, base_dir: &Path, args: &ChildArgs) -> Result<()> {
  let resolved = ResolvedConfig::from_strata_config(config, base_dir)?;
  let manifest = read_manifest_file(&args.manifest)?;
  let empty = PrerenderResult::default();

  let Some(command) = resolved.prerender.command.as_deref() else {
    let explicit: Vec<&str> =
      manifest.routes.iter().filter(|r| r.prerender == Some(true)).map(|r| r.id.as_str()).collect();
    if !explicit.is_empty() {
      bail!("prerender.command is required to prerender {}", explicit.join(", "));
    }
    ui::detail(&format!("{DIM}no prerender.command configured, nothing to prerender{RESET}"));
    return empty.write(&args.results);
  };

  let mut prerenderer = Prerenderer {
    root: &resolved.root,
    command,
    manifest_path: &args.manifest,
    app_dir: &manifest.app_dir,
    out: args.out_dir.join("prerendered"),
    crawl: resolved.prerender.crawl,
    strict: resolved.prerender.strict,
    verbose: args.verbose,
    routes: compile_routes(&manifest)?,
    queue: VecDeque::new(),
    seen: HashSet::new(),
    result: empty,
    failures: Vec::new(),
  };
  for entry in &resolved.prerender.entries {
    if entry == "*" {
      for path in wildcard_paths(&manifest) {
        prerenderer.enqueue(path, Origin::Wildcard);
      }
    } else {
      prerenderer.enqueue(entry.clone(), Origin::Entry);
    }
  }
  prerenderer.run();

  if !prerenderer.failures.is_empty() {
    for failure in &prerenderer.failures {
      ui::fail(failure);
    }
    bail!("prerendering failed for {} path(s)", prerenderer.failures.len());
  }

  let result = prerenderer.result;
  tracing::debug!(pages = result.pages.len(), assets = result.assets.len(), "prerender finished");
  ui::ok(&format!("prerendered {} page(s)", result.pages.len()));
  result.write(&args.results)
}

#[cfg(test)]
mod tests {
  use strata_build::manifest::{PageNodes, RouteParam};

  use super::*;

  fn manifest(routes: Vec<ManifestRoute>) -> RuntimeManifest {
    RuntimeManifest {
      app_dir: "_app".into(),
      app_path: "_app".into(),
      assets: vec![],
      client: Default::default(),
      server_entry: "index.js".into(),
      hooks: None,
      nodes: vec![],
      routes,
      prerendered_routes: vec![],
      service_worker: None,
    }
  }

  fn route(id: &str, dynamic: bool, prerender: Option<bool>) -> ManifestRoute {
    let params = if dynamic {
      vec![RouteParam { name: "slug".into(), matcher: None, optional: false, rest: false }]
    } else {
      vec![]
    };
    let page = Some(PageNodes { layouts: vec![Some(0)], errors: vec![Some(1)], leaf: 2 });
    ManifestRoute { id: id.into(), pattern: String::new(), params, page, endpoint: None, prerender }
  }

  #[test]
  fn wildcard_skips_dynamic_and_opted_out_routes() {
    let manifest = manifest(vec![
      route("/", false, None),
      route("/(app)/about", false, None),
      route("/admin", false, Some(false)),
      route("/blog/[slug]", true, Some(true)),
    ]);
    assert_eq!(wildcard_paths(&manifest), vec!["/", "/about"]);
  }

  #[test]
  fn dynamic_routes_render_only_when_opted_in() {
    assert!(should_render(&route("/a", false, None)));
    assert!(!should_render(&route("/b/[slug]", true, None)));
    assert!(should_render(&route("/b/[slug]", true, Some(true))));
    assert!(!should_render(&route("/c", false, Some(false))));
    let mut endpoint = route("/api/health", false, None);
    endpoint.page = None;
    assert!(!should_render(&endpoint));
  }

  #[test]
  fn static_routes_sort_before_params() {
    let mut slug = route("/blog/[slug]", true, None);
    slug.pattern = "^/blog/([^/]+?)/?$".into();
    let mut archive = route("/blog/archive", false, None);
    archive.pattern = "^/blog/archive/?$".into();
    let mut rest = route("/blog/[...path]", true, None);
    rest.pattern = "^/blog(?:/(.*))?/?$".into();
    let manifest = manifest(vec![rest, slug, archive]);
    let ids: Vec<&str> =
      compile_routes(&manifest).unwrap().iter().map(|r| r.data.id.as_str()).collect();
    assert_eq!(ids, vec!["/blog/archive", "/blog/[slug]", "/blog/[...path]"]);
  }

  #[cfg(unix)]
  #[test]
  fn static_page_beside_dynamic_route_is_rendered() {
    let tmp = tempfile::tempdir().unwrap();
    let mut slug = route("/blog/[slug]", true, None);
    slug.pattern = "^/blog/([^/]+?)/?$".into();
    let mut archive = route("/blog/archive", false, None);
    archive.pattern = "^/blog/archive/?$".into();
    let manifest = manifest(vec![slug, archive]);
    let manifest_path = tmp.path().join("manifest.json");

    let mut prerenderer = Prerenderer {
      root: tmp.path(),
      command: r#"printf '{"status":200,"headers":{"content-type":"text/html"},"body":"ok"}'"#,
      manifest_path: &manifest_path,
      app_dir: &manifest.app_dir,
      out: tmp.path().join("prerendered"),
      crawl: false,
      strict: true,
      verbose: false,
      routes: compile_routes(&manifest).unwrap(),
      queue: VecDeque::new(),
      seen: HashSet::new(),
      result: PrerenderResult::default(),
      failures: Vec::new(),
    };
    for path in wildcard_paths(&manifest) {
      prerenderer.enqueue(path, Origin::Wildcard);
    }
    prerenderer.run();

    assert!(prerenderer.failures.is_empty(), "{:?}", prerenderer.failures);
    assert!(prerenderer.result.pages.contains_key("/blog/archive"));
    assert!(tmp.path().join("prerendered/blog/archive.html").is_file());
  }
}
