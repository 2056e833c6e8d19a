use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::common::error::{Result, WorkbenchError};

/// Environment variable prefix, e.g. `WORKBENCH__LISTEN=0.0.0.0:7001`
pub const ENV_PREFIX: &str = "WORKBENCH";

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub listen: String,
    pub settings_path: PathBuf,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    pub neighbor_limit: u32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            listen: "127.0.0.1:7001".to_string(),
            settings_path: PathBuf::from("./graphscope_settings.json"),
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            neighbor_limit: 600,
        }
    }
}

impl ServiceConfig {
    /// Layer defaults, an optional TOML file and `WORKBENCH__*` variables
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let defaults = ServiceConfig::default();
        let mut builder = config::Config::builder()
            .set_default("listen", defaults.listen.clone())?
            .set_default("settings_path", defaults.settings_path.to_string_lossy().to_string())?
            .set_default("connect_timeout_ms", defaults.connect_timeout_ms as i64)?
            .set_default("request_timeout_ms", defaults.request_timeout_ms as i64)?
            .set_default("neighbor_limit", defaults.neighbor_limit as i64)?;

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let cfg = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize::<ServiceConfig>()?;

        cfg.listen_addr()?;
        Ok(cfg)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| WorkbenchError::Config(format!("invalid listen address '{}': {}", self.listen, e)))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Compute engine endpoints chosen by the caller through `connect`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct EngineSettings {
    #[validate(url)]
    #[serde(rename = "engineServerURL")]
    pub engine_server_url: String,
    #[validate(url)]
    #[serde(rename = "httpServerURL")]
    pub http_server_url: String,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl EngineSettings {
    pub fn new(engine_server_url: impl Into<String>, http_server_url: impl Into<String>) -> Self {
        EngineSettings {
            engine_server_url: engine_server_url.into(),
            http_server_url: http_server_url.into(),
            updated_at: None,
        }
    }

    /// Host name of the compute engine, used to rewrite loopback endpoints
    pub fn engine_host(&self) -> Result<String> {
        let parsed = url::Url::parse(&self.engine_server_url)
            .map_err(|e| WorkbenchError::Config(format!("invalid engine url: {}", e)))?;
        parsed
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| WorkbenchError::Config("engine url has no host".to_string()))
    }
}

/// Persisted engine settings. Loaded once at startup and rewritten on every `connect`.
#[derive(Debug)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    current: RwLock<Option<EngineSettings>>,
}

impl SettingsStore {
    /// Open the store at `path`, loading previously saved settings if the file exists
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let current = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let settings: EngineSettings = serde_json::from_str(&content)?;
            tracing::info!("Loaded engine settings from {}", path.display());
            Some(settings)
        } else {
            None
        };

        Ok(SettingsStore {
            path: Some(path),
            current: RwLock::new(current),
        })
    }

    /// Store that never touches the file system
    pub fn in_memory(initial: Option<EngineSettings>) -> Self {
        SettingsStore {
            path: None,
            current: RwLock::new(initial),
        }
    }

    pub fn current(&self) -> Option<EngineSettings> {
        self.current.read().clone()
    }

    /// Current settings or a configuration error when nothing was connected yet
    pub fn require(&self) -> Result<EngineSettings> {
        self.current().ok_or_else(WorkbenchError::settings_missing)
    }

    /// Validate, stamp and persist new settings
    pub async fn save(&self, mut settings: EngineSettings) -> Result<EngineSettings> {
        settings.validate()?;
        settings.updated_at = Some(Utc::now());

        if let Some(path) = &self.path {
            let body = serde_json::to_string_pretty(&settings)?;
            tokio::fs::write(path, body).await?;
            tracing::info!("Saved engine settings to {}", path.display());
        }

        *self.current.write() = Some(settings.clone());
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let cfg = ServiceConfig::default();
        assert_eq!(cfg.connect_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.neighbor_limit, 600);
        assert!(cfg.listen_addr().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("workbench.toml");
        std::fs::write(&file, "listen = \"0.0.0.0:9000\"\nneighbor_limit = 50\n").unwrap();

        let cfg = ServiceConfig::load(Some(&file)).unwrap();
        assert_eq!(cfg.listen, "0.0.0.0:9000");
        assert_eq!(cfg.neighbor_limit, 50);
        assert_eq!(cfg.request_timeout_ms, 30_000);
    }

    #[test]
    fn test_engine_host() {
        let settings = EngineSettings::new("http://10.0.0.5:8080", "http://localhost:7001");
        assert_eq!(settings.engine_host().unwrap(), "10.0.0.5");
    }

    #[tokio::test]
    async fn test_settings_persist_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");

        let store = SettingsStore::open(&path).unwrap();
        assert!(store.current().is_none());
        assert!(store.require().is_err());

        let saved = store
            .save(EngineSettings::new("http://engine:8080", "http://workbench:7001"))
            .await
            .unwrap();
        assert!(saved.updated_at.is_some());

        let reopened = SettingsStore::open(&path).unwrap();
        assert_eq!(reopened.current(), Some(saved));
    }

    #[tokio::test]
    async fn test_invalid_settings_rejected() {
        let store = SettingsStore::in_memory(None);
        let err = store
            .save(EngineSettings::new("not a url", "http://workbench:7001"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkbenchError::Validation(_)));
        assert!(store.current().is_none());
    }
}
