use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_DATABASE_URL: &str = "sqlite://shop.db?mode=rwc";
const CONFIG_DIR: &str = "config";
const DEFAULT_IMPORT_DIR: &str = "import";
const DEFAULT_PRODUCTS_FILE: &str = "Tovar.csv";
const DEFAULT_DELIVERY_POINTS_FILE: &str = "Пункты выдачи_import.csv";
const DEFAULT_USERS_FILE: &str = "user_import.csv";
const DEFAULT_ORDERS_FILE: &str = "Заказ_import.csv";
const DEFAULT_PHOTO_PREFIX: &str = "products";
const DEFAULT_UNIT: &str = "шт.";

/// Where the importer finds its four source files and how it fills gaps
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ImportConfig {
    /// Directory holding the CSV exports
    #[serde(default = "default_import_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_products_file")]
    #[validate(length(min = 1))]
    pub products_file: String,

    #[serde(default = "default_delivery_points_file")]
    #[validate(length(min = 1))]
    pub delivery_points_file: String,

    #[serde(default = "default_users_file")]
    #[validate(length(min = 1))]
    pub users_file: String,

    #[serde(default = "default_orders_file")]
    #[validate(length(min = 1))]
    pub orders_file: String,

    /// Prefix for stored photo paths (`<prefix>/<filename>`)
    #[serde(default = "default_photo_prefix")]
    pub photo_prefix: String,

    /// Unit written when a product row leaves it blank
    #[serde(default = "default_unit")]
    #[validate(length(min = 1))]
    pub default_unit: String,

    /// Run reset and rebuild inside one transaction
    #[serde(default)]
    pub atomic: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            data_dir: default_import_dir(),
            products_file: default_products_file(),
            delivery_points_file: default_delivery_points_file(),
            users_file: default_users_file(),
            orders_file: default_orders_file(),
            photo_prefix: default_photo_prefix(),
            default_unit: default_unit(),
            atomic: false,
        }
    }
}

impl ImportConfig {
    /// Config reading the default file names from `data_dir`.
    pub fn from_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn products_path(&self) -> PathBuf {
        self.data_dir.join(&self.products_file)
    }

    pub fn delivery_points_path(&self) -> PathBuf {
        self.data_dir.join(&self.delivery_points_file)
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join(&self.users_file)
    }

    pub fn orders_path(&self) -> PathBuf {
        self.data_dir.join(&self.orders_file)
    }

    /// Stored photo path for a product row, `None` when the row has none.
    pub fn photo_path(&self, filename: &str) -> Option<String> {
        let filename = filename.trim();
        if filename.is_empty() {
            return None;
        }
        if self.photo_prefix.is_empty() {
            Some(filename.to_string())
        } else {
            Some(format!(
                "{}/{}",
                self.photo_prefix.trim_end_matches('/'),
                filename
            ))
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    #[validate(length(min = 1))]
    pub database_url: String,

    /// Application environment
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations before any command
    #[serde(default = "default_true_bool")]
    pub auto_migrate: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    #[validate(range(min = 1, max = 100))]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// Importer settings
    #[serde(default)]
    #[validate]
    pub import: ImportConfig,
}

impl AppConfig {
    /// Configuration with defaults for everything except the database URL.
    pub fn new(database_url: String, environment: String) -> Self {
        Self {
            database_url,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: true,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            import: ImportConfig::default(),
        }
    }

    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Checks that cannot be expressed as field attributes.
    pub fn validate_additional_constraints(&self) -> Result<(), ValidationError> {
        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections cannot exceed db_max_connections".into());
            return Err(err);
        }

        // Each in-memory SQLite connection is a separate database.
        if self.database_url.contains(":memory:") && self.db_max_connections != 1 {
            let mut err = ValidationError::new("db_max_connections");
            err.message = Some("in-memory SQLite requires db_max_connections = 1".into());
            return Err(err);
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Configuration constraint failed: {0}")]
    Constraint(#[from] ValidationError),
}

impl From<AppConfigError> for crate::errors::ServiceError {
    fn from(err: AppConfigError) -> Self {
        crate::errors::ServiceError::ConfigError(err.to_string())
    }
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_true_bool() -> bool {
    true
}

fn default_db_max_connections() -> u32 {
    5
}
fn default_db_min_connections() -> u32 {
    1
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}

fn default_import_dir() -> PathBuf {
    PathBuf::from(DEFAULT_IMPORT_DIR)
}
fn default_products_file() -> String {
    DEFAULT_PRODUCTS_FILE.to_string()
}
fn default_delivery_points_file() -> String {
    DEFAULT_DELIVERY_POINTS_FILE.to_string()
}
fn default_users_file() -> String {
    DEFAULT_USERS_FILE.to_string()
}
fn default_orders_file() -> String {
    DEFAULT_ORDERS_FILE.to_string()
}
fn default_photo_prefix() -> String {
    DEFAULT_PHOTO_PREFIX.to_string()
}
fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("shop_import={},sea_orm=warn,sqlx=warn", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    let filter = EnvFilter::new(filter_directive);
    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).with_target(false).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", DEFAULT_DATABASE_URL)?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration constraint failed: {:?}", e);
        AppConfigError::Constraint(e)
    })?;

    Ok(app_config)
}
