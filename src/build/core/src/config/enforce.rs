/* src/build/core/src/config/enforce.rs */

// Bundler configuration: framework-controlled keys are merged over the user's
// `[bundler.config]` table, and every user value they replace is reported.

use std::collections::BTreeMap;

use serde_json::{Value, json};

use super::ResolvedConfig;

/// Shape of the framework-controlled part of the bundler config. A `Leaf`
/// means the whole value at that path belongs to the framework.
#[derive(Debug)]
pub enum Enforced {
  Leaf,
  Tree(&'static [(&'static str, Enforced)]),
}

use Enforced::{Leaf, Tree};

pub const ENFORCED_CONFIG: Enforced = Tree(&[
  ("appType", Leaf),
  ("base", Leaf),
  (
    "build",
    Tree(&[
      ("cssCodeSplit", Leaf),
      ("emptyOutDir", Leaf),
      ("lib", Tree(&[("entry", Leaf), ("name", Leaf), ("formats", Leaf)])),
      ("manifest", Leaf),
      ("modulePreload", Tree(&[("polyfill", Leaf)])),
      ("outDir", Leaf),
      (
        "rollupOptions",
        Tree(&[
          ("input", Leaf),
          (
            "output",
            Tree(&[
              ("format", Leaf),
              ("entryFileNames", Leaf),
              ("chunkFileNames", Leaf),
              ("assetFileNames", Leaf),
            ]),
          ),
          ("preserveEntrySignatures", Leaf),
        ]),
      ),
      ("ssr", Leaf),
    ]),
  ),
  ("publicDir", Leaf),
  ("resolve", Tree(&[("alias", Tree(&[("$app", Leaf), ("$lib", Leaf), ("$service-worker", Leaf)]))])),
  ("root", Leaf),
]);

/// Merge framework values over the user's. Enforced leaves replace the user
/// value wholesale; enforced subtrees and keys outside the schema merge key by key.
pub fn merge_config(base: &Value, overrides: &Value) -> Value {
  merge_with_schema(base, overrides, Some(&ENFORCED_CONFIG))
}

fn merge_with_schema(base: &Value, overrides: &Value, schema: Option<&Enforced>) -> Value {
  match (base, overrides, schema) {
    (_, o, Some(Leaf)) => o.clone(),
    (Value::Object(b), Value::Object(o), _) => {
      let mut merged = b.clone();
      for (key, value) in o {
        let child = match schema {
          Some(Tree(children)) => children.iter().find(|(k, _)| *k == key.as_str()).map(|(_, c)| c),
          _ => None,
        };
        let next = match merged.get(key) {
          Some(existing) => merge_with_schema(existing, value, child),
          None => value.clone(),
        };
        merged.insert(key.clone(), next);
      }
      Value::Object(merged)
    }
    (_, o, _) => o.clone(),
  }
}

/// Collect dotted paths where the user set an enforced value that differs from
/// the resolved one. Keys the user did not set are never reported.
pub fn find_overridden_config(
  user: &Value,
  resolved: &Value,
  schema: &Enforced,
  path: &str,
  out: &mut Vec<String>,
) {
  let Tree(children) = schema else { return };
  let Some(user_obj) = user.as_object() else { return };

  for (key, child) in *children {
    let Some(user_value) = user_obj.get(*key) else { continue };
    let resolved_value = resolved.get(*key).unwrap_or(&Value::Null);
    let child_path = if path.is_empty() { (*key).to_string() } else { format!("{path}.{key}") };
    match child {
      Leaf => {
        if user_value != resolved_value {
          out.push(child_path);
        }
      }
      Tree(_) => find_overridden_config(user_value, resolved_value, child, &child_path, out),
    }
  }
}

/// Overrides of the framework schema, in schema order.
pub fn overridden_paths(user: &Value, resolved: &Value) -> Vec<String> {
  let mut out = Vec::new();
  find_overridden_config(user, resolved, &ENFORCED_CONFIG, "", &mut out);
  out
}

fn asset_file_names(app_dir: &str) -> String {
  format!("{app_dir}/immutable/assets/[name].[hash][extname]")
}

fn aliases(config: &ResolvedConfig) -> Value {
  let generated = config.generated_dir.to_string_lossy();
  json!({
    "$app": format!("{generated}/runtime/app"),
    "$lib": config.lib_dir.to_string_lossy(),
    "$service-worker": format!("{generated}/service-worker"),
  })
}

fn base_url(config: &ResolvedConfig) -> String {
  if config.assets_path.is_empty() {
    format!("{}/", config.base)
  } else {
    format!("{}/", config.assets_path)
  }
}

/// Framework-controlled options for the client bundle.
pub fn enforced_client_config(config: &ResolvedConfig, input: &BTreeMap<String, String>) -> Value {
  let app_dir = &config.app_dir;
  json!({
    "appType": "custom",
    "base": base_url(config),
    "build": {
      "cssCodeSplit": true,
      "emptyOutDir": false,
      "lib": null,
      "manifest": config.bundler_manifest,
      "modulePreload": { "polyfill": false },
      "outDir": config.client_out.to_string_lossy(),
      "rollupOptions": {
        "input": input,
        "output": {
          "format": "esm",
          "entryFileNames": format!("{app_dir}/immutable/[name].[hash].js"),
          "chunkFileNames": format!("{app_dir}/immutable/chunks/[name].[hash].js"),
          "assetFileNames": asset_file_names(app_dir),
        },
        "preserveEntrySignatures": "strict",
      },
      "ssr": false,
    },
    "publicDir": false,
    "resolve": { "alias": aliases(config) },
    "root": config.root.to_string_lossy(),
  })
}

/// Framework-controlled options for the server bundle.
pub fn enforced_server_config(config: &ResolvedConfig, input: &BTreeMap<String, String>) -> Value {
  json!({
    "appType": "custom",
    "base": base_url(config),
    "build": {
      "cssCodeSplit": true,
      "emptyOutDir": false,
      "lib": null,
      "manifest": config.bundler_manifest,
      "modulePreload": { "polyfill": false },
      "outDir": config.server_out.to_string_lossy(),
      "rollupOptions": {
        "input": input,
        "output": {
          "format": "esm",
          "entryFileNames": "[name].js",
          "chunkFileNames": "chunks/[name].js",
          "assetFileNames": asset_file_names(&config.app_dir),
        },
        "preserveEntrySignatures": "strict",
      },
      "ssr": true,
    },
    "publicDir": false,
    "resolve": { "alias": aliases(config) },
    "root": config.root.to_string_lossy(),
  })
}
