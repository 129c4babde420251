use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_CURRENCY: &str = "INR";
const DEFAULT_MINIMUM_CHARGE_MINOR_UNITS: i64 = 100;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 15;
const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;
const DEFAULT_SESSION_TTL_SECS: i64 = 86_400;

fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    if currency.len() == 3 && currency.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("currency");
        err.message = Some("Currency must be a 3-letter ISO code".into());
        Err(err)
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Base URL of the commerce system's REST API (order of record)
    pub commerce_base_url: String,

    /// Commerce API consumer key
    #[validate(length(min = 1))]
    pub commerce_consumer_key: String,

    /// Commerce API consumer secret
    #[validate(length(min = 1))]
    pub commerce_consumer_secret: String,

    /// Base URL of the payment gateway's REST API
    pub gateway_base_url: String,

    /// Payment gateway key id (public; handed to the capture widget)
    #[validate(length(min = 1))]
    pub gateway_key_id: String,

    /// Payment gateway key secret (server-held; signs intent creation and
    /// verifies payment confirmations)
    #[validate(length(min = 16))]
    pub gateway_key_secret: String,

    /// Currency code for gateway payment intents
    #[serde(default = "default_currency")]
    #[validate(custom = "validate_currency")]
    pub currency: String,

    /// Smallest chargeable amount in minor currency units
    #[serde(default = "default_minimum_charge")]
    pub minimum_charge_minor_units: i64,

    /// Per-call timeout for upstream HTTP requests (seconds)
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// Event channel capacity for async event processing
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Carts and checkout attempts idle longer than this are evicted by the
    /// janitor task (seconds)
    #[serde(default = "default_session_ttl_secs")]
    pub session_ttl_secs: i64,

    /// Webhook URL notified after a payment is verified (fire-and-forget)
    #[serde(default)]
    pub notification_webhook_url: Option<String>,

    /// CORS: comma-separated list of allowed origins
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback (development only)
    #[serde(default)]
    pub cors_allow_any_origin: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_minimum_charge() -> i64 {
    DEFAULT_MINIMUM_CHARGE_MINOR_UNITS
}

fn default_upstream_timeout_secs() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_SECS
}

fn default_event_channel_capacity() -> usize {
    DEFAULT_EVENT_CHANNEL_CAPACITY
}

fn default_session_ttl_secs() -> i64 {
    DEFAULT_SESSION_TTL_SECS
}

impl AppConfig {
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Checks constraints that span multiple fields.
    pub fn validate_additional_constraints(&self) -> Result<(), ConfigError> {
        if !self.is_development()
            && self.cors_allowed_origins.is_none()
            && !self.cors_allow_any_origin
        {
            return Err(ConfigError::Message(
                "cors_allowed_origins must be set outside development (or set cors_allow_any_origin)"
                    .into(),
            ));
        }
        if self.minimum_charge_minor_units <= 0 {
            return Err(ConfigError::Message(
                "minimum_charge_minor_units must be positive".into(),
            ));
        }
        if self.session_ttl_secs <= 0 {
            return Err(ConfigError::Message(
                "session_ttl_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("configuration load error: {0}")]
    Load(#[from] ConfigError),
    #[error("configuration validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("veda_checkout={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{env}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    // NOTE: the upstream credentials have no defaults - they MUST be provided
    // via environment variables or config files. This prevents accidentally
    // pointing a deployment at live systems with placeholder keys.
    let config = Config::builder()
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("gateway_key_secret").is_err() {
        error!("Gateway key secret is not configured. Set APP__GATEWAY_KEY_SECRET with the payment gateway's key secret.");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "gateway_key_secret is required but not configured. Set APP__GATEWAY_KEY_SECRET."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {}", e);
        AppConfigError::Load(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
