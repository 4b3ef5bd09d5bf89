use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Engine configuration. Loaded from layered files plus environment
/// variables prefixed `STOCKLEDGER_` (e.g. `STOCKLEDGER_DATABASE_URL`).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    #[serde(default = "default_max_connections")]
    pub db_max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub db_min_connections: u32,
    /// Run pending migrations on startup. Convenient for tests and small
    /// deployments; production runs the migrate binary instead.
    #[serde(default)]
    pub auto_migrate: bool,
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Minimal constructor used by tests and embedding callers.
    pub fn new(database_url: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            db_max_connections: default_max_connections(),
            db_min_connections: default_min_connections(),
            auto_migrate: false,
            environment: environment.into(),
            log_level: default_log_level(),
        }
    }

    /// Loads configuration from `config/default`, an optional
    /// environment-specific overlay selected by `RUN_ENV`, and finally
    /// environment variables, which win.
    pub fn load() -> Result<Self, ConfigError> {
        let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());

        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_env)).required(false))
            .add_source(Environment::with_prefix("STOCKLEDGER"))
            .set_default("environment", run_env.clone())?
            .build()?
            .try_deserialize()
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
