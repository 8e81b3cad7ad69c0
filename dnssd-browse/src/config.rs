use std::path::Path;
use std::time::Duration;
use serde::Deserialize;
use anyhow::{Context, Result};
use crate::mdns::lookup::BrowseOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub browse: BrowseConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowseConfig {
    /// Service type to browse for, e.g. "_http._tcp"
    pub service: String,
    #[serde(default)]
    pub continuous: bool,
    /// Interface names; empty means all
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Stop after this many seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_listen")]
    pub listen: String,
}

fn default_listen() -> String {
    "[::]:8054".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen: default_listen(),
        }
    }
}

impl BrowseConfig {
    pub fn options(&self) -> BrowseOptions {
        BrowseOptions {
            service: self.service.clone(),
            continuous: self.continuous,
            interfaces: self.interfaces.clone(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::parse("[browse]\nservice = \"_http._tcp\"\n").unwrap();
        assert_eq!(config.browse.service, "_http._tcp");
        assert!(!config.browse.continuous);
        assert!(config.browse.interfaces.is_empty());
        assert_eq!(config.browse.timeout(), None);
        assert!(!config.api.enabled);
        assert_eq!(config.api.listen, "[::]:8054");
    }

    #[test]
    fn test_full_config() {
        let config = Config::parse(
            r#"
            [browse]
            service = "_ipp._tcp.local."
            continuous = true
            interfaces = ["en0", "en1"]
            timeout_secs = 30

            [api]
            enabled = true
            listen = "127.0.0.1:9000"
            "#,
        )
        .unwrap();

        let options = config.browse.options();
        assert_eq!(options.service, "_ipp._tcp.local.");
        assert!(options.continuous);
        assert_eq!(options.interfaces, vec!["en0", "en1"]);
        assert_eq!(config.browse.timeout(), Some(Duration::from_secs(30)));
        assert!(config.api.enabled);
        assert_eq!(config.api.listen, "127.0.0.1:9000");
    }

    #[test]
    fn test_missing_service_is_rejected() {
        assert!(Config::parse("[browse]\ncontinuous = true\n").is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let err = Config::load("/nonexistent/browse.toml").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/browse.toml"));
    }
}
