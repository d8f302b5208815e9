pub mod categories;
pub mod config;
pub mod edit;
pub mod orgunits;
pub mod show;

use anyhow::{Context, Result};
use config_loader::{ConfigError, ConfigManager, ConsoleConfig, TokenError, TokenProviderFactory};
use policy_engine::{ConsoleSession, HttpPolicyBackend, PolicyError};
use std::env;
use std::path::Path;
use std::sync::Arc;

/// Exit code for configuration and credential problems.
const EXIT_CONFIG: i32 = 2;

/// 2 when any error in the chain is a config or auth failure, otherwise 1.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    let config_or_auth = err.chain().any(|cause| {
        cause.is::<ConfigError>()
            || cause.is::<TokenError>()
            || matches!(
                cause.downcast_ref::<PolicyError>(),
                Some(PolicyError::Auth { .. })
            )
    });
    if config_or_auth {
        EXIT_CONFIG
    } else {
        1
    }
}

pub fn load_config(path: Option<&Path>) -> Result<ConsoleConfig> {
    let manager = match path {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    };
    manager
        .load()
        .with_context(|| format!("Failed to load config from {:?}", manager.config_path()))
}

pub fn connect(config: &ConsoleConfig) -> Result<Arc<HttpPolicyBackend>> {
    let tokens = TokenProviderFactory::create(&config.token);
    let backend = HttpPolicyBackend::new(config, tokens).context("Failed to set up policy API client")?;
    Ok(Arc::new(backend))
}

/// Open a session on `ou` and `category` (config default when `None`).
///
/// Catalog and resolve failures are turned into errors here; the session
/// itself keeps running with an empty view.
pub async fn open_session(
    config: &ConsoleConfig,
    ou: &str,
    category: Option<&str>,
) -> Result<ConsoleSession> {
    let category = category.unwrap_or(config.default_category.as_str());
    let backend = connect(config)?;
    let session = ConsoleSession::open_at(backend, ou, category)
        .await
        .context("Failed to open policy console")?;

    if let Some(e) = session.catalog_state().error() {
        return Err(e.clone()).context("Failed to load policy schemas");
    }
    if let Some(e) = session.resolve_state().error() {
        return Err(e.clone()).context("Failed to resolve policies");
    }
    Ok(session)
}

pub fn should_use_color() -> bool {
    if env::var("NO_COLOR").is_ok() {
        return false;
    }
    atty::is(atty::Stream::Stdout)
}
