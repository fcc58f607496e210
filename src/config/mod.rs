pub mod database;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Plain,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    /// Apply `migrations/` on startup.
    pub run_migrations: bool,
    pub log_format: LogFormat,
}

impl Config {
    /// Read configuration from the process environment (and `.env`).
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();
        Self::from_source(config::Environment::default().try_parsing(true))
    }

    pub fn from_source<S>(source: S) -> anyhow::Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = config::Config::builder()
            .set_default("port", 8080)?
            .set_default("db_max_connections", 10)?
            .set_default("db_acquire_timeout_secs", 5)?
            .set_default("run_migrations", false)?
            .set_default("log_format", "plain")?
            .add_source(source)
            .build()?;

        settings
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))
    }
}
