//! Handles settings for the application. Configuration is read from an
//! optional `settings.toml` and then from `BIKE_RENTAL__*` environment
//! variables, e.g. `BIKE_RENTAL__SERVER__PORT=8080`.
//!
//! See `settings.toml` for the configuration.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
pub struct Policy {
    pub rental_period_days: i64,
    pub late_fee_per_day_minor: i64,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Option<Server>,
    pub policy: Option<Policy>,
}

impl Settings {
    /// Loads `settings.toml`, or the file named by `BIKE_RENTAL_SETTINGS`.
    pub fn new() -> Result<Self, ConfigError> {
        let path =
            std::env::var("BIKE_RENTAL_SETTINGS").unwrap_or_else(|_| "settings".to_string());
        let settings = Config::builder()
            .set_default("app.level", "info")?
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("BIKE_RENTAL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}
