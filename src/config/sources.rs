use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "POLLKIT_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/pollkit.toml";
const ENV_PREFIX: &str = "POLLKIT";
const ENV_SEPARATOR: &str = "__";

/// Load configuration with priority (lowest to highest):
/// defaults embedded in the structs, TOML file, `.env` file via dotenvy,
/// system environment variables.
pub fn load() -> Result<Config, ConfigError> {
    let _ = dotenvy::dotenv();

    let config_path = env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    load_from_sources(config_path)
}

/// Load from a specific path plus environment overrides.
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("loading configuration from {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "no configuration file at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // POLLKIT__CACHE__MAX_ENTRIES -> cache.max_entries
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
