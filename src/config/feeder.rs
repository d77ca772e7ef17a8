// src/config/feeder.rs
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

pub const ENV_CONFIG_PATH: &str = "AIL_FEEDER_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "etc/ail-feeder-activitypub.toml";

const DEFAULT_UUID: &str = "a4cfd483-86dc-4900-9fb9-5cd6027b5d04";

fn default_uuid() -> String {
    DEFAULT_UUID.to_string()
}
fn default_redis_host() -> String {
    "localhost".to_string()
}
fn default_redis_port() -> u16 {
    6379
}
fn default_expire() -> u64 {
    86_400
}
fn default_fetch_timeout() -> u64 {
    10
}
fn default_resolve() -> bool {
    true
}

fn default_client_name() -> String {
    "ail-feeder-activitypub".to_string()
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("[general] uuid is not a valid UUID: {0}")]
    InvalidUuid(String),

    #[error("[ail] section not found in the config file; add it with `url` and `apikey`")]
    MissingAil,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneralSection {
    #[serde(default = "default_uuid")]
    pub uuid: String,
}

impl Default for GeneralSection {
    fn default() -> Self {
        Self {
            uuid: default_uuid(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisSection {
    #[serde(default = "default_redis_host")]
    pub host: String,
    #[serde(default = "default_redis_port")]
    pub port: u16,
    #[serde(default)]
    pub db: i64,
}

impl Default for RedisSection {
    fn default() -> Self {
        Self {
            host: default_redis_host(),
            port: default_redis_port(),
            db: 0,
        }
    }
}

impl RedisSection {
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.db)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    /// Seconds before a dedup key expires.
    #[serde(default = "default_expire")]
    pub expire: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            expire: default_expire(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AilSection {
    pub url: String,
    pub apikey: String,
    #[serde(default)]
    pub verify_ssl: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeederSection {
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// Name used when registering the OAuth app on each instance.
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Let instances resolve remote accounts and statuses (webfinger) during search.
    #[serde(default = "default_resolve")]
    pub resolve: bool,
}

impl Default for FeederSection {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout(),
            client_name: default_client_name(),
            resolve: default_resolve(),
        }
    }
}

/// Raw file layout; every section optional so a missing `[ail]` can be reported precisely.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    general: GeneralSection,
    #[serde(default)]
    redis: RedisSection,
    #[serde(default)]
    cache: CacheSection,
    ail: Option<AilSection>,
    #[serde(default)]
    feeder: FeederSection,
}

#[derive(Debug, Clone)]
pub struct FeederConfig {
    pub uuid: String,
    pub redis: RedisSection,
    pub cache: CacheSection,
    pub ail: AilSection,
    pub feeder: FeederSection,
}

impl FeederConfig {
    pub fn from_toml_str(s: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(s).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let uuid = raw.general.uuid.trim().to_string();
        if uuid::Uuid::parse_str(&uuid).is_err() {
            return Err(ConfigError::InvalidUuid(uuid));
        }

        let ail = raw.ail.ok_or(ConfigError::MissingAil)?;

        Ok(Self {
            uuid,
            redis: raw.redis,
            cache: raw.cache,
            ail,
            feeder: raw.feeder,
        })
    }

    /// A missing file reads as an empty one, which then fails on the `[ail]` section.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = if path.exists() {
            fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            String::new()
        };
        Self::from_toml_str(&data, path)
    }

    /// Load using env var + fallback:
    /// 1) $AIL_FEEDER_CONFIG
    /// 2) etc/ail-feeder-activitypub.toml
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        Self::load_from_file(path)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.expire)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.feeder.fetch_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<FeederConfig, ConfigError> {
        FeederConfig::from_toml_str(s, Path::new("test.toml"))
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let cfg = parse(
            r#"
[ail]
url = "https://ail.local:7000"
apikey = "secret"
"#,
        )
        .unwrap();
        assert_eq!(cfg.uuid, DEFAULT_UUID);
        assert_eq!(cfg.redis.url(), "redis://localhost:6379/0");
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(86_400));
        assert_eq!(cfg.fetch_timeout(), Duration::from_secs(10));
        assert!(cfg.feeder.resolve, "search resolves remote results by default");
        assert!(!cfg.ail.verify_ssl);
    }

    #[test]
    fn missing_ail_section_is_reported() {
        let err = parse("[cache]\nexpire = 60\n").unwrap_err();
        assert!(matches!(err, ConfigError::MissingAil));
    }

    #[test]
    fn bad_uuid_is_rejected() {
        let err = parse(
            r#"
[general]
uuid = "not-a-uuid"
[ail]
url = "u"
apikey = "k"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUuid(_)));
    }
}
