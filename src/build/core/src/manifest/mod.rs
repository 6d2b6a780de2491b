/* src/build/core/src/manifest/mod.rs */

// Manifest assembly: bundler manifest dependency resolution, the route data
// produced by sync, and the runtime manifest written for the server bundle.

mod bundler;
mod runtime;
mod types;

#[cfg(test)]
mod tests;

pub use bundler::{BundlerManifest, BundlerManifestEntry, EntryDeps, find_deps, read_bundler_manifest};
pub use runtime::{
  ManifestNode, ManifestRoute, RuntimeManifest, read_manifest_file, render_manifest_module,
  write_manifest_files,
};
pub use types::{ManifestData, PageNode, PageNodes, RouteData, RouteParam, StaticAsset};
