/* src/cli/core/tests/build_e2e.rs */

// Runs the real `strata build` against a scratch project whose bundler,
// render and adapter commands are small shell scripts.

#![cfg(unix)]

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

const STRATA_TOML: &str = r#"
[project]
name = "e2e"

[bundler]
command = "sh bundle.sh"

[prerender]
command = "sh render.sh"

[adapter]
kind = "command"
command = 'cp "$STRATA_BUILD_DATA" adapter-input.json'
"#;

const BUNDLE_SH: &str = r#"set -e
test -f "$STRATA_BUNDLER_CONFIG"
mkdir -p "$STRATA_OUT_DIR/.vite"
echo "$STRATA_BUILD_TARGET" >> bundler-calls.txt
if [ "$STRATA_BUILD_TARGET" = client ]; then
  cat > "$STRATA_OUT_DIR/.vite/manifest.json" <<'EOF'
{
  ".strata/generated/client/start.js": { "file": "_app/immutable/start.js", "isEntry": true, "imports": ["_shared.js"] },
  "_shared.js": { "file": "_app/immutable/chunks/shared.js", "css": ["_app/immutable/assets/shared.css"] },
  "src/routes/about/+page.svelte": { "file": "_app/immutable/nodes/2.js", "isEntry": true, "imports": ["_shared.js"] },
  "src/routes/blog/[slug]/+page.svelte": { "file": "_app/immutable/nodes/3.js", "isEntry": true }
}
EOF
  cp module-graph.json "$STRATA_OUT_DIR/.vite/module-graph.json"
else
  cat > "$STRATA_OUT_DIR/.vite/manifest.json" <<'EOF'
{
  ".strata/generated/server/index.js": { "file": "index.js", "isEntry": true },
  "src/routes/about/+page.svelte": { "file": "nodes/2.js", "isEntry": true },
  "src/routes/blog/[slug]/+page.svelte": { "file": "nodes/3.js", "isEntry": true }
}
EOF
fi
"#;

const RENDER_SH: &str = r#"printf '{"status":200,"headers":{"content-type":"text/html"},"body":"<h1>%s</h1>"}' "$STRATA_ROUTE"
"#;

fn write(root: &Path, rel: &str, content: &str) {
  let path = root.join(rel);
  std::fs::create_dir_all(path.parent().unwrap()).unwrap();
  std::fs::write(path, content).unwrap();
}

/// Scratch project; `module_graph` is the client module graph the fake bundler reports.
fn project(module_graph: &str) -> tempfile::TempDir {
  let tmp = tempfile::tempdir().unwrap();
  let root = tmp.path();
  write(root, "strata.toml", STRATA_TOML);
  write(root, "bundle.sh", BUNDLE_SH);
  write(root, "render.sh", RENDER_SH);
  write(root, "module-graph.json", module_graph);
  write(root, "src/routes/about/+page.svelte", "<h1>About</h1>\n");
  write(root, "src/routes/blog/[slug]/+page.svelte", "<h1>Post</h1>\n");
  write(root, "src/lib/server/secret.js", "export const key = 'k';\n");
  tmp
}

fn strata_build(root: &Path) -> Output {
  Command::new(env!("CARGO_BIN_EXE_strata"))
    .arg("build")
    .current_dir(root)
    .env_remove("STRATA_CONFIG")
    .output()
    .unwrap()
}

fn read_json(path: &Path) -> Value {
  serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn describe(output: &Output) -> String {
  format!(
    "stdout:\n{}\nstderr:\n{}",
    String::from_utf8_lossy(&output.stdout),
    String::from_utf8_lossy(&output.stderr)
  )
}

#[test]
fn build_prerenders_static_routes_and_runs_adapter() {
  let tmp = project("{}");
  let root = tmp.path();
  let output = strata_build(root);
  assert!(output.status.success(), "{}", describe(&output));

  let input = read_json(&root.join("adapter-input.json"));
  let routes = input["manifest_data"]["routes"].as_array().unwrap();
  let ids: Vec<&str> = routes.iter().map(|r| r["id"].as_str().unwrap()).collect();
  assert_eq!(ids, vec!["/about", "/blog/[slug]"]);
  assert!(!input["client"].is_null());
  assert!(!input["server"].is_null());
  assert_eq!(input["server"]["entry"], "index.js");

  let out = root.join(".strata/output");
  let results = read_json(&out.join("prerender-results.json"));
  let pages: Vec<&str> =
    results["pages"].as_array().unwrap().iter().map(|p| p[0].as_str().unwrap()).collect();
  assert_eq!(pages, vec!["/about"]);
  assert_eq!(
    std::fs::read_to_string(out.join("prerendered/about.html")).unwrap(),
    "<h1>/about</h1>"
  );

  let manifest = read_json(&out.join("server/manifest.json"));
  assert_eq!(manifest["prerendered_routes"], serde_json::json!(["/about"]));
  let module = std::fs::read_to_string(out.join("server/manifest.js")).unwrap();
  assert!(module.contains("prerendered: new Set([\"/about\"])"));
  assert!(out.join("client/_app/version.json").is_file());
}

#[test]
fn server_only_import_fails_before_server_build() {
  let root_placeholder = "__ROOT__";
  let graph = r#"{
    "__ROOT__/src/routes/about/+page.svelte": { "importedIds": ["__ROOT__/src/lib/server/secret.js"] }
  }"#;
  let tmp = project("{}");
  let root = tmp.path().canonicalize().unwrap();
  write(&root, "module-graph.json", &graph.replace(root_placeholder, &root.to_string_lossy()));

  let output = strata_build(&root);
  assert!(!output.status.success(), "{}", describe(&output));
  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("cannot import src/lib/server/secret.js"), "{}", describe(&output));

  let calls = std::fs::read_to_string(root.join("bundler-calls.txt")).unwrap();
  assert_eq!(calls.trim(), "client");
  assert!(!root.join("adapter-input.json").exists());
}
