/* src/build/core/src/config/mod.rs */

mod enforce;
mod loader;
mod resolved;
mod types;


pub use enforce::{
  ENFORCED_CONFIG, Enforced, enforced_client_config, enforced_server_config,
  find_overridden_config, merge_config, overridden_paths,
};
pub use loader::{CONFIG_FILE, find_strata_config, load_strata_config, parse_strata_config};
pub use resolved::{ResolvedConfig, resolve_entry};
pub use types::{
  AdapterKind, AdapterSection, BundlerSection, KitSection, PrerenderSection, ServiceWorkerSection,
  StrataConfig,
};
