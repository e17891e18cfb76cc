use anyhow::Context;
use serde::Deserialize;
use std::env;

/// Server configuration loaded from environment variables (a `.env` file is
/// honoured when present).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Database settings
    pub database_url: String,
    pub db_max_connections: u32,

    // CORS settings
    pub cors_allowed_origins: Vec<String>,

    // Retention sweep: tasks older than the window are removed by a
    // periodic background job.
    pub task_retention_days: i64,
    pub retention_sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Ok(Self {
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .unwrap_or(3000),

            database_url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| {
                    "http://localhost:3000,http://localhost:5173".to_string()
                })
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),

            task_retention_days: env::var("TASK_RETENTION_DAYS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            retention_sweep_interval_secs: env::var(
                "RETENTION_SWEEP_INTERVAL_SECS",
            )
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600),
        })
    }
}
