use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks.
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get()
        .expect("Config not initialized. Call init_config() first.")
        .load_full()
}

/// Initialize the global configuration from "config.toml"
pub fn init_config() {
    init_config_from(None);
}

/// Initialize the global configuration from an explicit path
///
/// 文件不存在时使用默认值 + 环境变量
pub fn init_config_from(path: Option<&str>) {
    let path = path.unwrap_or("config.toml");
    CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::load(path)));
}

/// Install a prepared configuration (tests, embedded use)
///
/// Replaces the current value when already initialized.
pub fn init_config_with(config: StaticConfig) {
    match CONFIG.get() {
        Some(current) => current.store(Arc::new(config)),
        None => {
            let config = Arc::new(config);
            if CONFIG.set(ArcSwap::new(config.clone())).is_err()
                && let Some(current) = CONFIG.get()
            {
                current.store(config);
            }
        }
    }
}
