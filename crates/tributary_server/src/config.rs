//! Application configuration.
//!
//! Sources, later overriding earlier:
//! 1. Bundled defaults (`tributary.toml` shipped with the crate)
//! 2. `~/.config/tributary/tributary.toml`
//! 3. `./tributary.toml`
//! 4. An explicit file (`--config`)
//! 5. `TRIBUTARY__<SECTION>__<KEY>` environment variables
//!
//! The provider key falls back to `OPENAI_API_KEY`.

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tributary_core::{PricingTable, RequestLimits, TracingConfig};
use tributary_error::{ConfigError, TributaryResult};
use tributary_models::UpstreamConfig;
use tributary_rate_limit::RateLimitConfig;
use tracing::{debug, instrument};

/// Bundled default configuration.
pub const DEFAULT_CONFIG: &str = include_str!("../../../tributary.toml");

/// Environment variable consulted when `upstream.api_key` is unset.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ServerSettings {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    bind: String,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Top-level Tributary configuration.
///
/// # Example
///
/// ```no_run
/// use tributary_server::AppConfig;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AppConfig::load(None)?;
/// println!("Listening on {}", config.server().bind());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, derive_getters::Getters)]
pub struct AppConfig {
    /// Listener settings
    #[serde(default)]
    server: ServerSettings,
    /// Request validation limits and defaults
    #[serde(default)]
    limits: RequestLimits,
    /// Completion provider settings
    #[serde(default)]
    upstream: UpstreamConfig,
    /// Per-principal rate limits
    #[serde(default)]
    rate_limit: RateLimitConfig,
    /// Per-model price overrides
    #[serde(default)]
    pricing: PricingTable,
    /// Log output
    #[serde(default)]
    logging: TracingConfig,
}

impl AppConfig {
    /// Load configuration from every source.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a source cannot be read, the merged
    /// configuration does not deserialize, or a price is invalid.
    #[instrument]
    pub fn load(explicit: Option<&Path>) -> TributaryResult<Self> {
        debug!("Loading configuration: env > explicit file > current dir > home dir > bundled defaults");

        let mut builder = Self::bundled();

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/tributary/tributary.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }

        builder = builder.add_source(File::with_name("tributary").required(false));

        if let Some(path) = explicit {
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("TRIBUTARY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut config = Self::finish(builder)?;
        if config.upstream.api_key().is_none() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                debug!("Using provider key from {}", API_KEY_ENV);
                config.upstream = config.upstream.with_api_key(key);
            }
        }
        Ok(config)
    }

    /// Bundled defaults overlaid with a TOML document. Reads no files or
    /// environment variables.
    ///
    /// # Errors
    ///
    /// As [`load`](Self::load).
    pub fn from_toml_str(toml: &str) -> TributaryResult<Self> {
        Self::finish(Self::bundled().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    /// Override the listen address.
    pub fn with_bind(mut self, bind: impl Into<String>) -> Self {
        self.server.bind = bind.into();
        self
    }

    /// Override the log settings.
    pub fn with_logging(mut self, logging: TracingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Override the provider settings.
    pub fn with_upstream(mut self, upstream: UpstreamConfig) -> Self {
        self.upstream = upstream;
        self
    }

    fn bundled() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn finish(builder: ConfigBuilder<DefaultState>) -> TributaryResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
            .try_deserialize()
            .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;
        config.pricing.validate()?;
        config.rate_limit.validate()?;
        Ok(config)
    }
}
