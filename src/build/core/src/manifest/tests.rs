/* src/build/core/src/manifest/tests.rs */

use std::collections::{BTreeMap, BTreeSet};

use super::*;
use crate::bundle::{BuildData, ClientBuildResult, ServerBuildResult};
use crate::config::{ResolvedConfig, parse_strata_config};

fn entry(file: &str, imports: &[&str], dynamic: &[&str], css: &[&str]) -> BundlerManifestEntry {
  BundlerManifestEntry {
    file: file.into(),
    imports: imports.iter().map(|s| s.to_string()).collect(),
    dynamic_imports: dynamic.iter().map(|s| s.to_string()).collect(),
    css: css.iter().map(|s| s.to_string()).collect(),
    ..Default::default()
  }
}

fn sample_bundler_manifest() -> BundlerManifest {
  let mut m = BTreeMap::new();
  m.insert(
    ".strata/generated/client/start.js".to_string(),
    BundlerManifestEntry {
      is_entry: true,
      ..entry("_app/immutable/entry/start.js", &["_runtime.js", "_utils.js"], &["src/routes/about/+page.svelte"], &[])
    },
  );
  m.insert("_runtime.js".to_string(), entry("_app/immutable/chunks/runtime.js", &["_utils.js"], &[], &["_app/immutable/assets/base.css"]));
  m.insert("_utils.js".to_string(), entry("_app/immutable/chunks/utils.js", &["_runtime.js"], &[], &[]));
  m.insert(
    "src/routes/about/+page.svelte".to_string(),
    BundlerManifestEntry {
      is_entry: true,
      ..entry("_app/immutable/nodes/2.js", &["_runtime.js"], &[], &["_app/immutable/assets/2.css"])
    },
  );
  m
}

// -- find_deps --

#[test]
fn find_deps_follows_all_edges() {
  let deps = find_deps(&sample_bundler_manifest(), ".strata/generated/client/start.js").unwrap();
  assert_eq!(deps.file, "_app/immutable/entry/start.js");
  assert_eq!(
    deps.imports,
    vec![
      "_app/immutable/chunks/runtime.js",
      "_app/immutable/chunks/utils.js",
      "_app/immutable/nodes/2.js",
    ]
  );
  assert_eq!(deps.stylesheets, vec!["_app/immutable/assets/2.css", "_app/immutable/assets/base.css"]);
}

#[test]
fn find_deps_independent_of_import_order() {
  let mut reordered = sample_bundler_manifest();
  let start = reordered.get_mut(".strata/generated/client/start.js").unwrap();
  start.imports.reverse();
  let a = find_deps(&sample_bundler_manifest(), ".strata/generated/client/start.js").unwrap();
  let b = find_deps(&reordered, ".strata/generated/client/start.js").unwrap();
  assert_eq!(a, b);
}

#[test]
fn find_deps_terminates_on_cycles() {
  // _runtime.js and _utils.js import each other
  let deps = find_deps(&sample_bundler_manifest(), "_utils.js").unwrap();
  assert_eq!(deps.imports, vec!["_app/immutable/chunks/runtime.js"]);
}

#[test]
fn find_deps_missing_entry_errors() {
  let err = find_deps(&sample_bundler_manifest(), "src/nope.js").unwrap_err();
  assert!(err.to_string().contains("src/nope.js"));
}

#[test]
fn find_deps_missing_import_errors() {
  let mut m = sample_bundler_manifest();
  m.insert("x.js".to_string(), entry("x.js", &["_gone.js"], &[], &[]));
  let err = find_deps(&m, "x.js").unwrap_err();
  assert!(err.to_string().contains("_gone.js"));
}

#[test]
fn read_vite_format_manifest() {
  let tmp = tempfile::tempdir().unwrap();
  let path = tmp.path().join("manifest.json");
  std::fs::write(
    &path,
    r#"{
      "src/routes/+page.svelte": {
        "file": "_app/immutable/nodes/2.js",
        "src": "src/routes/+page.svelte",
        "isEntry": true,
        "imports": ["_runtime.js"],
        "dynamicImports": ["src/lib/heavy.js"],
        "css": ["_app/immutable/assets/2.css"]
      }
    }"#,
  )
  .unwrap();
  let m = read_bundler_manifest(&path).unwrap();
  let e = &m["src/routes/+page.svelte"];
  assert!(e.is_entry);
  assert_eq!(e.dynamic_imports, vec!["src/lib/heavy.js"]);
  assert!(e.assets.is_empty());
}

// -- runtime manifest --

fn fixture() -> (tempfile::TempDir, ResolvedConfig, BuildData) {
  let tmp = tempfile::tempdir().unwrap();
  let config = parse_strata_config("[project]\nname = \"t\"\n").unwrap();
  let resolved = ResolvedConfig::from_strata_config(&config, tmp.path()).unwrap();

  let manifest_data = ManifestData {
    assets: vec![StaticAsset { file: "favicon.png".into(), size: 10 }],
    nodes: vec![
      PageNode::default(),
      PageNode::default(),
      PageNode {
        component: Some("src/routes/about/+page.svelte".into()),
        ..Default::default()
      },
    ],
    routes: vec![RouteData {
      id: "/about".into(),
      pattern: "^/about/?$".into(),
      params: vec![],
      page: Some(PageNodes { layouts: vec![Some(0)], errors: vec![Some(1)], leaf: 2 }),
      endpoint: None,
      prerender: None,
    }],
  };
  let mut modules = BTreeMap::new();
  modules.insert("src/routes/about/+page.svelte".to_string(), "nodes/2.js".to_string());

  let build_data = BuildData {
    app_dir: "_app".into(),
    app_path: "_app".into(),
    manifest_data,
    service_worker: None,
    client: ClientBuildResult { raw_manifest: sample_bundler_manifest(), ..Default::default() },
    server: ServerBuildResult { entry: "index.js".into(), modules, hooks: None, chunks: vec![] },
  };
  (tmp, resolved, build_data)
}

#[test]
fn assemble_resolves_nodes_and_routes() {
  let (_tmp, config, data) = fixture();
  let manifest = RuntimeManifest::assemble(&config, &data, &BTreeSet::new()).unwrap();
  assert_eq!(manifest.client.file, "_app/immutable/entry/start.js");
  assert_eq!(manifest.nodes.len(), 3);
  assert!(manifest.nodes[0].server.is_none());
  assert_eq!(manifest.nodes[2].server.as_deref(), Some("nodes/2.js"));
  assert_eq!(manifest.nodes[2].client.as_ref().unwrap().file, "_app/immutable/nodes/2.js");
  assert_eq!(manifest.routes[0].id, "/about");
  assert_eq!(manifest.assets, vec!["favicon.png"]);
}

#[test]
fn assemble_fails_for_missing_endpoint_module() {
  let (_tmp, config, mut data) = fixture();
  data.manifest_data.routes[0].endpoint = Some("src/routes/about/+server.js".into());
  let err = RuntimeManifest::assemble(&config, &data, &BTreeSet::new()).unwrap_err();
  assert!(format!("{err:#}").contains("+server.js"));
}

#[test]
fn assemble_fails_for_missing_node_module() {
  let (_tmp, config, mut data) = fixture();
  data.manifest_data.nodes.push(PageNode {
    component: Some("src/routes/contact/+page.svelte".into()),
    ..Default::default()
  });
  let err = RuntimeManifest::assemble(&config, &data, &BTreeSet::new()).unwrap_err();
  assert!(format!("{err:#}").contains("src/routes/contact/+page.svelte"));
}

#[test]
fn module_output_is_deterministic() {
  let (_tmp, config, data) = fixture();
  let prerendered: BTreeSet<String> = ["/about".to_string()].into();
  let first = render_manifest_module(&RuntimeManifest::assemble(&config, &data, &prerendered).unwrap()).unwrap();
  let second = render_manifest_module(&RuntimeManifest::assemble(&config, &data, &prerendered).unwrap()).unwrap();
  assert_eq!(first, second);
}

#[test]
fn module_output_shape() {
  let (_tmp, config, data) = fixture();
  let prerendered: BTreeSet<String> = ["/about".to_string()].into();
  let manifest = RuntimeManifest::assemble(&config, &data, &prerendered).unwrap();
  let module = render_manifest_module(&manifest).unwrap();
  assert!(module.starts_with("// Generated by strata"));
  assert!(module.contains("export const manifest = {"));
  assert!(module.contains("\tappDir: \"_app\",\n"));
  assert!(module.contains("\tassets: new Set([\"favicon.png\"]),\n"));
  assert!(module.contains("\tentry: () => import(\"./index.js\"),\n"));
  assert!(module.contains("\t\t() => import(\"./nodes/2.js\"),\n"));
  assert!(module.contains("\t\t\tpattern: new RegExp(\"^/about/?$\"),\n"));
  assert!(module.contains("\tprerendered: new Set([\"/about\"]),\n"));
  assert!(module.ends_with("};\n"));
}

#[test]
fn manifest_files_written_and_read_back() {
  let (tmp, config, data) = fixture();
  let manifest = RuntimeManifest::assemble(&config, &data, &BTreeSet::new()).unwrap();
  let out = tmp.path().join("server");
  let json_path = write_manifest_files(&manifest, &out, "manifest").unwrap();
  assert!(out.join("manifest.js").is_file());
  assert_eq!(read_manifest_file(&json_path).unwrap(), manifest);
}
