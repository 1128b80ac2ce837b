use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::get_config;
use crate::services::AppServices;
use crate::storage::{SeaOrmStorage, StorageFactory};

pub struct StartupContext {
    pub storage: Arc<SeaOrmStorage>,
    pub services: AppServices,
}

/// 准备服务器启动的上下文：加密提供方、存储与迁移、业务服务
pub async fn prepare_server_startup() -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {:?}", e))?;

    let storage = StorageFactory::create()
        .await
        .context("Failed to create storage backend")?;
    info!("Using storage backend: {}", storage.backend_name());

    let services =
        AppServices::from_config(storage.clone()).context("Failed to initialize services")?;

    check_security_settings();

    info!(
        "Pre-startup processing completed in {:?}",
        start_time.elapsed()
    );
    Ok(StartupContext { storage, services })
}

/// 仅打印提示，不阻止启动
fn check_security_settings() {
    let config = get_config();

    if config.auth.jwt_secret.is_empty() {
        warn!("auth.jwt_secret is not set: using a random secret, sessions will not survive restarts");
    } else if config.auth.jwt_secret.len() < 32 {
        warn!("auth.jwt_secret is shorter than 32 characters. Consider using a stronger secret.");
    }

    if !config.auth.cookie_secure {
        warn!("auth.cookie_secure is disabled; enable it when serving over HTTPS");
    }

    let providers: Vec<&str> = [
        ("google", config.oauth.google.is_some()),
        ("github", config.oauth.github.is_some()),
    ]
    .into_iter()
    .filter_map(|(name, enabled)| enabled.then_some(name))
    .collect();
    if providers.is_empty() {
        info!("OAuth login disabled (no providers configured)");
    } else {
        info!("OAuth providers configured: {}", providers.join(", "));
    }
}
