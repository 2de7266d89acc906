//! Persisted user defaults.
//!
//! Stores settings in JSON format at `~/.portwarden/config.json`. Command-line
//! flags override these values; the merged result is handed to each state
//! machine by value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::domain::SortKey;
use crate::error::{Error, Result};

/// Settings data stored in JSON format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Watch mode refresh interval in milliseconds.
    #[serde(default = "default_watch_interval")]
    pub watch_interval_ms: u64,

    /// Default listing order.
    #[serde(default)]
    pub sort_by: SortKey,

    /// How long `wait` polls before giving up.
    #[serde(default = "default_wait_timeout")]
    pub wait_timeout_ms: u64,

    /// Delay between `wait` polls.
    #[serde(default = "default_wait_interval")]
    pub wait_interval_ms: u64,

    /// Grace period `kill` gives a process after the first signal.
    #[serde(default = "default_kill_timeout")]
    pub kill_timeout_ms: u64,

    /// Whether listings include IPv6 listeners.
    #[serde(default = "default_true")]
    pub include_ipv6: bool,
}

fn default_watch_interval() -> u64 {
    1000
}

fn default_wait_timeout() -> u64 {
    30_000
}

fn default_wait_interval() -> u64 {
    100
}

fn default_kill_timeout() -> u64 {
    5000
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            watch_interval_ms: default_watch_interval(),
            sort_by: SortKey::default(),
            wait_timeout_ms: default_wait_timeout(),
            wait_interval_ms: default_wait_interval(),
            kill_timeout_ms: default_kill_timeout(),
            include_ipv6: true,
        }
    }
}

impl Settings {
    /// Keys accepted by [`Settings::set`].
    pub const KEYS: [&'static str; 6] = [
        "watchIntervalMs",
        "sortBy",
        "waitTimeoutMs",
        "waitIntervalMs",
        "killTimeoutMs",
        "includeIpv6",
    ];

    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_millis(self.wait_timeout_ms)
    }

    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }

    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.kill_timeout_ms)
    }

    /// Update one setting from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "watchIntervalMs" => self.watch_interval_ms = parse_millis(key, value)?,
            "waitTimeoutMs" => self.wait_timeout_ms = parse_millis(key, value)?,
            "waitIntervalMs" => self.wait_interval_ms = parse_millis(key, value)?,
            "killTimeoutMs" => self.kill_timeout_ms = parse_millis(key, value)?,
            "sortBy" => {
                self.sort_by = SortKey::parse(value)
                    .ok_or_else(|| Error::Config(format!("Unknown sort key: {}", value)))?;
            }
            "includeIpv6" => {
                self.include_ipv6 = value
                    .parse()
                    .map_err(|_| Error::Config(format!("{} expects true or false", key)))?;
            }
            other => {
                return Err(Error::Config(format!(
                    "Unknown setting '{}' (expected one of: {})",
                    other,
                    Self::KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64> {
    match value.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(ms),
        _ => Err(Error::Config(format!(
            "{} expects a positive number of milliseconds",
            key
        ))),
    }
}

/// Configuration store for reading and writing [`Settings`].
pub struct ConfigStore {
    /// Path to the configuration file.
    config_path: PathBuf,
}

impl ConfigStore {
    /// Create a new config store with the default path.
    ///
    /// Default path: `~/.portwarden/config.json`
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

        Ok(Self {
            config_path: home.join(".portwarden").join("config.json"),
        })
    }

    /// Create a config store with a custom path (for testing).
    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> PathBuf {
        self.config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Load settings from disk.
    ///
    /// Returns defaults if the file doesn't exist.
    pub async fn load(&self) -> Result<Settings> {
        if !fs::try_exists(&self.config_path).await.unwrap_or(false) {
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Save settings to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub async fn save(&self, settings: &Settings) -> Result<()> {
        let config_dir = self.config_dir();
        if !config_dir.as_os_str().is_empty() {
            fs::create_dir_all(&config_dir)
                .await
                .map_err(|e| Error::Config(format!("Failed to create config directory: {}", e)))?;
        }

        let content = serde_json::to_string_pretty(settings)?;

        // Write atomically by writing to temp file then renaming
        let temp_path = self.config_path.with_extension("json.tmp");

        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to create temp config file: {}", e)))?;

        file.write_all(content.as_bytes())
            .await
            .map_err(|e| Error::Config(format!("Failed to write config: {}", e)))?;

        file.sync_all()
            .await
            .map_err(|e| Error::Config(format!("Failed to sync config: {}", e)))?;

        fs::rename(&temp_path, &self.config_path)
            .await
            .map_err(|e| Error::Config(format!("Failed to rename config file: {}", e)))?;

        Ok(())
    }

    /// Load, change one key, save. Returns the updated settings.
    pub async fn update(&self, key: &str, value: &str) -> Result<Settings> {
        let mut settings = self.load().await?;
        settings.set(key, value)?;
        self.save(&settings).await?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_store() -> (ConfigStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        (ConfigStore::with_path(path), dir)
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _dir) = test_store();
        let settings = store.load().await.unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.wait_timeout(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _dir) = test_store();

        let settings = Settings {
            watch_interval_ms: 2500,
            sort_by: SortKey::Conns,
            include_ipv6: false,
            ..Settings::default()
        };
        store.save(&settings).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, settings);
        assert!(!store.path().with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_partial_file_uses_defaults() {
        let (store, _dir) = test_store();
        std::fs::create_dir_all(store.config_dir()).unwrap();
        std::fs::write(store.path(), r#"{ "sortBy": "uptime", "killTimeoutMs": 750 }"#).unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.sort_by, SortKey::Uptime);
        assert_eq!(loaded.kill_timeout(), Duration::from_millis(750));
        assert_eq!(loaded.watch_interval_ms, 1000);
        assert!(loaded.include_ipv6);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_config_error() {
        let (store, _dir) = test_store();
        std::fs::create_dir_all(store.config_dir()).unwrap();
        std::fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.load().await, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_update_single_key() {
        let (store, _dir) = test_store();

        let updated = store.update("waitIntervalMs", "250").await.unwrap();
        assert_eq!(updated.wait_interval(), Duration::from_millis(250));
        assert_eq!(store.load().await.unwrap().wait_interval_ms, 250);
    }

    #[test]
    fn test_set_validation() {
        let mut settings = Settings::default();
        assert!(settings.set("sortBy", "PID").is_ok());
        assert_eq!(settings.sort_by, SortKey::Pid);
        assert!(settings.set("sortBy", "color").is_err());
        assert!(settings.set("watchIntervalMs", "0").is_err());
        assert!(settings.set("includeIpv6", "maybe").is_err());
        assert!(settings.set("theme", "dark").is_err());
        assert!(settings.set("includeIpv6", "false").is_ok());
        assert!(!settings.include_ipv6);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert!(json.contains("\"watchIntervalMs\":1000"));
        assert!(json.contains("\"sortBy\":\"port\""));
        assert!(json.contains("\"includeIpv6\":true"));
    }
}
