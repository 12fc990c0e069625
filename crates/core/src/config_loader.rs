use crate::config::AppConfig;
use crate::error::{Result, StrategyError};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

/// Default location of the TOML configuration.
pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

/// Prefix for environment overrides, e.g. `STRADDLE_STRATEGY__LOT_MULTIPLIER=2`.
pub const ENV_PREFIX: &str = "STRADDLE_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration from [`DEFAULT_CONFIG_PATH`] and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be read or parsed.
    pub fn load() -> Result<AppConfig> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Loads configuration by layering built-in defaults, the TOML file at
    /// `path` (if present) and `STRADDLE_` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the sources cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<AppConfig> {
        let config: AppConfig = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(|e| StrategyError::config(e.to_string()))?;
        tracing::debug!(path, strategy = %config.strategy.name, "Configuration loaded");
        Ok(config)
    }
}
