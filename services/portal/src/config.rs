//! Portal configuration.
//!
//! Values come from `TESSERA_*` environment variables, then an optional YAML
//! file named by `TESSERA_CONFIG` overrides whatever it sets.
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;

pub const DEFAULT_SESSION_TTL_SECS: u64 = 8 * 60 * 60;
pub const DEFAULT_CONTEXT_CACHE_TTL_SECS: u64 = 300;
pub const DEFAULT_CONTEXT_CACHE_MAX_ENTRIES: usize = crate::cache::DEFAULT_MAX_ENTRIES;
pub const DEFAULT_LOGIN_PATH: &str = "/login";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Postgres,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageBackend::Memory),
            "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
            other => bail!("unknown storage backend: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_ms: u64,
    pub acquire_timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub storage: StorageBackend,
    pub postgres: Option<PostgresConfig>,
    /// Hex-encoded 32-byte Ed25519 seed; a random one is generated when absent.
    pub session_seed: Option<String>,
    pub session_ttl_secs: u64,
    pub context_cache_ttl_secs: u64,
    pub context_cache_max_entries: usize,
    pub login_path: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Default, Deserialize)]
struct PortalConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    storage: Option<StorageBackend>,
    postgres: Option<PostgresConfig>,
    session_seed: Option<String>,
    session_ttl_secs: Option<u64>,
    context_cache_ttl_secs: Option<u64>,
    context_cache_max_entries: Option<usize>,
    login_path: Option<String>,
    bootstrap_admin_email: Option<String>,
    bootstrap_admin_password: Option<String>,
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|err| anyhow::anyhow!("parse {key}: {err}")),
        Err(_) => Ok(default),
    }
}

impl PortalConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("TESSERA_BIND")
            .unwrap_or_else(|_| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse TESSERA_BIND")?;
        let metrics_bind = std::env::var("TESSERA_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse TESSERA_METRICS_BIND")?;
        let storage = env_parse("TESSERA_STORAGE", StorageBackend::Memory)?;
        let postgres = match std::env::var("TESSERA_PG_URL") {
            Ok(url) => Some(PostgresConfig {
                url,
                max_connections: env_parse("TESSERA_PG_MAX_CONNECTIONS", 10)?,
                connect_timeout_ms: env_parse("TESSERA_PG_CONNECT_TIMEOUT_MS", 5_000)?,
                acquire_timeout_ms: env_parse("TESSERA_PG_ACQUIRE_TIMEOUT_MS", 5_000)?,
            }),
            Err(_) => None,
        };
        let bootstrap_admin = match (
            std::env::var("TESSERA_BOOTSTRAP_ADMIN_EMAIL"),
            std::env::var("TESSERA_BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };
        Ok(Self {
            bind_addr,
            metrics_bind,
            storage,
            postgres,
            session_seed: std::env::var("TESSERA_SESSION_SEED").ok(),
            session_ttl_secs: env_parse("TESSERA_SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?,
            context_cache_ttl_secs: env_parse(
                "TESSERA_CONTEXT_CACHE_TTL_SECS",
                DEFAULT_CONTEXT_CACHE_TTL_SECS,
            )?,
            context_cache_max_entries: env_parse(
                "TESSERA_CONTEXT_CACHE_MAX_ENTRIES",
                DEFAULT_CONTEXT_CACHE_MAX_ENTRIES,
            )?,
            login_path: std::env::var("TESSERA_LOGIN_PATH")
                .unwrap_or_else(|_| DEFAULT_LOGIN_PATH.to_string()),
            bootstrap_admin,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("TESSERA_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read TESSERA_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: PortalConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse portal config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.storage {
            self.storage = value;
        }
        if let Some(value) = override_cfg.postgres {
            self.postgres = Some(value);
        }
        if let Some(value) = override_cfg.session_seed {
            self.session_seed = Some(value);
        }
        if let Some(value) = override_cfg.session_ttl_secs {
            self.session_ttl_secs = value;
        }
        if let Some(value) = override_cfg.context_cache_ttl_secs {
            self.context_cache_ttl_secs = value;
        }
        if let Some(value) = override_cfg.context_cache_max_entries {
            self.context_cache_max_entries = value;
        }
        if let Some(value) = override_cfg.login_path {
            self.login_path = value;
        }
        if let (Some(email), Some(password)) = (
            override_cfg.bootstrap_admin_email,
            override_cfg.bootstrap_admin_password,
        ) {
            self.bootstrap_admin = Some(BootstrapAdmin { email, password });
        }
        Ok(())
    }
}
