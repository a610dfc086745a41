use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Falls back to defaults (plus `RA__*` environment overrides) when
/// `init_config` has not been called yet, so library users and tests
/// can construct components directly.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::load(None)))
        .load_full()
}

/// Initialize the global configuration from "config.toml" in the current directory
pub fn init_config() {
    init_config_from(None);
}

/// Initialize the global configuration from an explicit file
///
/// Calling it again replaces the active configuration.
pub fn init_config_from(path: Option<&str>) {
    set_config(StaticConfig::load(path));
}

/// Replace the active configuration
pub fn set_config(config: StaticConfig) {
    let config = Arc::new(config);
    let slot = CONFIG.get_or_init(|| ArcSwap::from(config.clone()));
    slot.store(config);
}
