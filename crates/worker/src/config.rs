//! Worker process settings.

use std::time::Duration;

use anyhow::{bail, Context};

/// Connection and scheduling settings read at start-up.
///
/// | Env Var                         | Default  |
/// |---------------------------------|----------|
/// | `DATABASE_URL`                  | required |
/// | `DB_MAX_CONNECTIONS`            | `20`     |
/// | `EXPIRY_SWEEP_INTERVAL_SECS`    | `300`    |
/// | `RETENTION_SWEEP_INTERVAL_SECS` | `3600`   |
/// | `LOG_FORMAT`                    | `text`   |
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub database_url: String,
    pub max_connections: u32,
    pub expiry_interval: Duration,
    pub retention_interval: Duration,
    pub json_logs: bool,
}

impl WorkerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let max_connections = parse_env("DB_MAX_CONNECTIONS", bazaar_db::DEFAULT_MAX_CONNECTIONS)?;
        let expiry_secs: u64 = parse_env("EXPIRY_SWEEP_INTERVAL_SECS", 300)?;
        let retention_secs: u64 = parse_env("RETENTION_SWEEP_INTERVAL_SECS", 3600)?;
        if expiry_secs == 0 || retention_secs == 0 {
            bail!("Sweep intervals must be at least one second");
        }
        let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

        Ok(Self {
            database_url,
            max_connections,
            expiry_interval: Duration::from_secs(expiry_secs),
            retention_interval: Duration::from_secs(retention_secs),
            json_logs,
        })
    }
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}
