// src/config/mod.rs
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::asset::{parse_asset_list, AssetId};
use crate::channel::{Transport, DEFAULT_TOPIC};
use crate::provider::coingecko::DEFAULT_BASE_URL;

pub const ENV_CONFIG_PATH: &str = "PIPELINE_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PIPELINE_CONFIG_PATH points to non-existent path {}", .0.display())]
    MissingFile(PathBuf),
    #[error("reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Everything the two binaries need, resolved from defaults, an optional TOML
/// file, and environment overrides (in that order of precedence, lowest first).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub transport: Transport,
    pub redis_url: String,
    pub topic: String,
    pub provider_base_url: String,
    pub provider_timeout: Duration,
    pub assets: Vec<AssetId>,
    pub update_interval: Duration,
    /// `Some` selects the SQLite store; otherwise snapshots stay in memory.
    pub database_url: Option<String>,
    pub port: u16,
    pub deviation_window: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            topic: DEFAULT_TOPIC.to_string(),
            provider_base_url: DEFAULT_BASE_URL.to_string(),
            provider_timeout: Duration::from_secs(10),
            assets: AssetId::ALL.to_vec(),
            update_interval: crate::scheduler::DEFAULT_INTERVAL,
            database_url: None,
            port: 3000,
            deviation_window: 100,
        }
    }
}

/// On-disk shape; every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    transport: Option<String>,
    redis_url: Option<String>,
    topic: Option<String>,
    provider_base_url: Option<String>,
    provider_timeout_secs: Option<u64>,
    assets: Option<Vec<String>>,
    update_interval_secs: Option<u64>,
    database_url: Option<String>,
    port: Option<u16>,
    deviation_window: Option<usize>,
}

impl AppConfig {
    /// Resolve using the process environment:
    /// 1) $PIPELINE_CONFIG_PATH (must exist when set)
    /// 2) config/pipeline.toml (if present)
    /// 3) env overrides on top
    pub fn load() -> Result<Self, ConfigError> {
        let env: HashMap<String, String> = std::env::vars().collect();
        let path = match env.get(ENV_CONFIG_PATH) {
            Some(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(ConfigError::MissingFile(pb));
                }
                Some(pb)
            }
            None => Some(PathBuf::from(DEFAULT_CONFIG_PATH)).filter(|p| p.exists()),
        };
        let file = match path {
            Some(p) => Some(read_file(&p)?),
            None => None,
        };
        Self::resolve(file, &env)
    }

    /// Load from an explicit TOML file with no environment overrides.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::resolve(Some(read_file(path)?), &HashMap::new())
    }

    fn resolve(file: Option<FileConfig>, env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut cfg = AppConfig::default();

        if let Some(f) = file {
            if let Some(v) = f.transport {
                cfg.transport = parse_transport("transport", &v)?;
            }
            if let Some(v) = f.redis_url {
                cfg.redis_url = v;
            }
            if let Some(v) = f.topic {
                cfg.topic = v;
            }
            if let Some(v) = f.provider_base_url {
                cfg.provider_base_url = v;
            }
            if let Some(v) = f.provider_timeout_secs {
                cfg.provider_timeout = Duration::from_secs(v);
            }
            if let Some(v) = f.assets {
                cfg.assets = parse_assets("assets", &v.join(","))?;
            }
            if let Some(v) = f.update_interval_secs {
                cfg.update_interval = Duration::from_secs(v);
            }
            if f.database_url.is_some() {
                cfg.database_url = f.database_url;
            }
            if let Some(v) = f.port {
                cfg.port = v;
            }
            if let Some(v) = f.deviation_window {
                cfg.deviation_window = v;
            }
        }

        let get = |k: &str| env.get(k).map(|s| s.trim()).filter(|s| !s.is_empty());
        if let Some(v) = get("CHANNEL_TRANSPORT") {
            cfg.transport = parse_transport("CHANNEL_TRANSPORT", v)?;
        }
        if let Some(v) = get("REDIS_URL") {
            cfg.redis_url = v.to_string();
        }
        if let Some(v) = get("TRIGGER_TOPIC") {
            cfg.topic = v.to_string();
        }
        if let Some(v) = get("PROVIDER_BASE_URL") {
            cfg.provider_base_url = v.to_string();
        }
        if let Some(v) = get("PROVIDER_TIMEOUT_SECS") {
            cfg.provider_timeout = Duration::from_secs(parse_num("PROVIDER_TIMEOUT_SECS", v)?);
        }
        if let Some(v) = get("SUPPORTED_ASSETS") {
            cfg.assets = parse_assets("SUPPORTED_ASSETS", v)?;
        }
        if let Some(v) = get("UPDATE_INTERVAL_SECS") {
            cfg.update_interval = Duration::from_secs(parse_num("UPDATE_INTERVAL_SECS", v)?);
        }
        if let Some(v) = get("DATABASE_URL") {
            cfg.database_url = Some(v.to_string());
        }
        if let Some(v) = get("PORT") {
            cfg.port = parse_num("PORT", v)?;
        }
        if let Some(v) = get("DEVIATION_WINDOW") {
            cfg.deviation_window = parse_num("DEVIATION_WINDOW", v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &'static str, reason: &str| -> Result<(), ConfigError> {
            Err(ConfigError::Invalid {
                key,
                reason: reason.to_string(),
            })
        };
        if self.assets.is_empty() {
            return invalid("assets", "at least one asset is required");
        }
        if self.update_interval.is_zero() {
            return invalid("update_interval", "must be > 0");
        }
        if self.provider_timeout.is_zero() {
            return invalid("provider_timeout", "must be > 0");
        }
        if self.deviation_window == 0 {
            return invalid("deviation_window", "must be > 0");
        }
        if self.topic.trim().is_empty() {
            return invalid("topic", "must not be empty");
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_transport(key: &'static str, v: &str) -> Result<Transport, ConfigError> {
    v.parse()
        .map_err(|reason| ConfigError::Invalid { key, reason })
}

fn parse_assets(key: &'static str, v: &str) -> Result<Vec<AssetId>, ConfigError> {
    parse_asset_list(v).map_err(|e| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}

fn parse_num<T: std::str::FromStr>(key: &'static str, v: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    v.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        reason: e.to_string(),
    })
}
