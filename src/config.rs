// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

/// Environment variable naming an optional YAML config file.
pub const CONFIG_PATH_VAR: &str = "EXPORT_CONFIG";

/// Rows requested per page query.
pub const DEFAULT_CHUNK_SIZE: u64 = 10_000;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub port: u16,
    pub log_level: String,
    pub chunk_size: u64,
    pub database: DatabaseConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            log_level: "info".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            database: DatabaseConfig::default(),
        }
    }
}

#[derive(Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3306,
            user: "sensors".to_string(),
            password: String::new(),
            name: "sensors".to_string(),
            max_connections: 25,
            idle_timeout_secs: 300,
            max_lifetime_secs: 300,
            acquire_timeout_secs: 30,
        }
    }
}

impl DatabaseConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

// hand-written so the password never reaches a log line
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("max_connections", &self.max_connections)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

impl AppConfig {
    /// Load from the YAML file named by `EXPORT_CONFIG` (if any), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = env::var(CONFIG_PATH_VAR)
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Self::from_sources(path.as_deref(), |key| env::var(key).ok())
    }

    /// Same as [`Self::load`] with an injectable variable lookup.
    pub fn from_sources<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = match path {
            Some(p) => Self::from_yaml_file(p)?,
            None => Self::default(),
        };
        // empty values count as unset
        let lookup = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(v) = lookup("DB_HOST") {
            cfg.database.host = v;
        }
        if let Some(v) = lookup("DB_USER") {
            cfg.database.user = v;
        }
        if let Some(v) = lookup("DB_PASSWORD") {
            cfg.database.password = v;
        }
        if let Some(v) = lookup("DB_NAME") {
            cfg.database.name = v;
        }
        if let Some(v) = lookup("LOG_LEVEL") {
            cfg.log_level = v;
        }
        override_parsed(&mut cfg.database.port, "DB_PORT", &lookup)?;
        override_parsed(&mut cfg.database.max_connections, "DB_MAX_CONNECTIONS", &lookup)?;
        override_parsed(&mut cfg.port, "PORT", &lookup)?;
        override_parsed(&mut cfg.chunk_size, "CHUNK_SIZE", &lookup)?;

        if cfg.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than zero");
        }
        Ok(cfg)
    }

    fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }
}

fn override_parsed<T, F>(slot: &mut T, key: &str, lookup: &F) -> Result<()>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *slot = raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value {:?} for {}", raw, key))?;
    }
    Ok(())
}
