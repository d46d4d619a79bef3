/*!
common/src/lib.rs

Shared configuration types for newsfed.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader for a TOML config file, with default/override merging
- Accessors that resolve the documented defaults for every optional setting
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Well-known base of the agency directory service.
pub const DEFAULT_DIRECTORY_URL: &str = "https://newssites.pythonanywhere.com/api";

/// Login alias that always resolves to a development agency, unless overridden.
pub const LOCAL_ALIAS: &str = "local";
pub const LOCAL_AGENCY_URL: &str = "http://localhost:8000";

/// Directory service configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Base URL of the directory service; `/directory/` is appended to it.
    pub url: Option<String>,
}

/// HTTP client configuration section
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
    pub max_redirects: Option<usize>,
}

/// Fan-out behaviour for `news` queries
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Maximum number of agencies queried at the same time (minimum 1)
    pub max_concurrency: Option<usize>,
    /// Deadline for a single agency call; expiry only fails that agency
    pub agency_timeout_seconds: Option<u64>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub fanout: FanoutConfig,
    /// Login aliases, e.g. `local = "http://localhost:8000"`
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        Self::from_toml_str(&data)
    }

    pub fn from_toml_str(data: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(data).context("Failed to parse TOML configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// Missing files are skipped, so with neither present the built-in defaults apply.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if let Some(raw) = &self.directory.url {
            url::Url::parse(raw).with_context(|| format!("Invalid directory url: {}", raw))?;
        }
        for (alias, target) in &self.aliases {
            url::Url::parse(target)
                .with_context(|| format!("Invalid url for login alias '{}': {}", alias, target))?;
        }
        Ok(())
    }

    pub fn directory_url(&self) -> &str {
        self.directory.url.as_deref().unwrap_or(DEFAULT_DIRECTORY_URL)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_seconds.unwrap_or(10))
    }

    pub fn user_agent(&self) -> String {
        self.http
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("newsfed/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn max_redirects(&self) -> usize {
        self.http.max_redirects.unwrap_or(5)
    }

    pub fn max_concurrency(&self) -> usize {
        self.fanout.max_concurrency.unwrap_or(8).max(1)
    }

    pub fn agency_timeout(&self) -> Duration {
        Duration::from_secs(self.fanout.agency_timeout_seconds.unwrap_or(10))
    }

    /// Resolve a login alias. The `local` alias is always available.
    pub fn resolve_alias(&self, name: &str) -> Option<String> {
        match self.aliases.get(name) {
            Some(target) => Some(target.clone()),
            None if name == LOCAL_ALIAS => Some(LOCAL_AGENCY_URL.to_string()),
            None => None,
        }
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = Config::from_toml_str("").expect("parse empty config");
        assert_eq!(cfg.directory_url(), DEFAULT_DIRECTORY_URL);
        assert_eq!(cfg.max_concurrency(), 8);
        assert_eq!(cfg.agency_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.resolve_alias("local").as_deref(), Some(LOCAL_AGENCY_URL));
        assert_eq!(cfg.resolve_alias("staging"), None);
    }

    #[test]
    fn config_from_string() {
        let toml = r#"
            [directory]
            url = "http://directory.test/api"

            [fanout]
            max_concurrency = 0
            agency_timeout_seconds = 3

            [aliases]
            local = "http://127.0.0.1:9000"
            staging = "https://staging.example.org"
        "#;

        let cfg = Config::from_toml_str(toml).expect("parse config");
        assert_eq!(cfg.directory_url(), "http://directory.test/api");
        // zero is clamped so the fan-out can make progress
        assert_eq!(cfg.max_concurrency(), 1);
        assert_eq!(cfg.agency_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.resolve_alias("local").as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(cfg.resolve_alias("staging").as_deref(), Some("https://staging.example.org"));
    }

    #[test]
    fn rejects_invalid_directory_url() {
        let err = Config::from_toml_str("[directory]\nurl = \"not a url\"\n").unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid directory url"));
    }

    #[tokio::test]
    async fn override_file_wins_key_by_key() {
        let mut default_file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(
            default_file,
            "[http]\ntimeout_seconds = 30\nuser_agent = \"default-agent\"\n\n[fanout]\nmax_concurrency = 4"
        )
        .expect("write default");

        let mut override_file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(override_file, "[http]\ntimeout_seconds = 5").expect("write override");

        let cfg = Config::load_with_defaults(Some(default_file.path()), Some(override_file.path()))
            .await
            .expect("load merged config");

        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.user_agent(), "default-agent");
        assert_eq!(cfg.max_concurrency(), 4);
    }

    #[tokio::test]
    async fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("nope.toml");
        let cfg = Config::load_with_defaults(Some(&missing), None)
            .await
            .expect("load defaults");
        assert_eq!(cfg.directory_url(), DEFAULT_DIRECTORY_URL);
    }
}
