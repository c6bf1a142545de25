//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use raydio_core::constants::DEFAULT_PROBE_INTERVAL_MS;
use raydio_core::StreamGroup;
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    /// Port to bind the HTTP server to (0 = OS-assigned).
    /// Override: `RAYDIO_BIND_PORT`
    pub bind_port: u16,

    /// Partner id the SDK session is started with.
    /// Override: `RAYDIO_PARTNER_ID`
    pub partner_id: u32,

    /// Interval between interface scans (milliseconds).
    /// Override: `RAYDIO_PROBE_INTERVAL_MS`
    pub probe_interval_ms: u64,

    /// YAML catalog served by the simulated SDK.
    /// Override: `RAYDIO_CATALOG_FILE`
    pub catalog_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_port: 49500,
            partner_id: 1,
            probe_interval_ms: DEFAULT_PROBE_INTERVAL_MS,
            catalog_file: None,
        }
    }
}

/// On-disk catalog format.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    groups: Vec<StreamGroup>,
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from `lookup`. Unparseable values are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(port) = lookup("RAYDIO_BIND_PORT").and_then(|v| v.parse().ok()) {
            self.bind_port = port;
        }

        if let Some(id) = lookup("RAYDIO_PARTNER_ID").and_then(|v| v.parse().ok()) {
            self.partner_id = id;
        }

        if let Some(interval) = lookup("RAYDIO_PROBE_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.probe_interval_ms = interval;
        }

        if let Some(path) = lookup("RAYDIO_CATALOG_FILE").filter(|v| !v.is_empty()) {
            self.catalog_file = Some(PathBuf::from(path));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.partner_id == 0 {
            bail!("partner_id must be non-zero");
        }
        Ok(())
    }

    /// Converts to raydio-core's Config type.
    pub fn to_core_config(&self) -> raydio_core::Config {
        raydio_core::Config {
            probe_interval_ms: self.probe_interval_ms,
            ..Default::default()
        }
    }

    /// Reads the configured catalog, or an empty one if none is configured.
    pub fn load_catalog(&self) -> Result<Vec<StreamGroup>> {
        let Some(path) = self.catalog_file.as_deref() else {
            log::warn!("No catalog file configured - the session will have no streams");
            return Ok(Vec::new());
        };
        load_catalog_file(path)
    }
}

/// Parses a YAML catalog file.
pub fn load_catalog_file(path: &Path) -> Result<Vec<StreamGroup>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse catalog file: {}", path.display()))?;
    Ok(catalog.groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let file = write_temp("bind_port: 8080\n");
        let mut config: ServerConfig =
            serde_yaml::from_str(&std::fs::read_to_string(file.path()).unwrap()).unwrap();
        config.apply_overrides(|_| None);

        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.partner_id, 1);
        assert_eq!(config.probe_interval_ms, DEFAULT_PROBE_INTERVAL_MS);
        assert!(config.catalog_file.is_none());
    }

    #[test]
    fn env_overrides_take_precedence() {
        let env: HashMap<&str, &str> = [
            ("RAYDIO_BIND_PORT", "9000"),
            ("RAYDIO_PARTNER_ID", "42"),
            ("RAYDIO_PROBE_INTERVAL_MS", "not-a-number"),
            ("RAYDIO_CATALOG_FILE", "/tmp/catalog.yaml"),
        ]
        .into_iter()
        .collect();

        let mut config = ServerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.bind_port, 9000);
        assert_eq!(config.partner_id, 42);
        assert_eq!(config.probe_interval_ms, DEFAULT_PROBE_INTERVAL_MS);
        assert_eq!(
            config.catalog_file.as_deref(),
            Some(Path::new("/tmp/catalog.yaml"))
        );
    }

    #[test]
    fn load_reports_missing_file() {
        let err = ServerConfig::load(Some(Path::new("/nonexistent/raydio.yaml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn load_defers_validation_to_caller() {
        let file = write_temp("partner_id: 0\n");
        let mut config = ServerConfig::load(Some(file.path())).unwrap();
        assert!(config.validate().is_err());

        config.partner_id = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_partner_id_is_rejected() {
        let config = ServerConfig {
            partner_id: 0,
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn catalog_file_parses_groups_in_order() {
        let file = write_temp(
            r#"
groups:
  - title: News
    entries:
      - streamId: a
        language: EN
  - title: Sports
    entries:
      - streamId: b
        language: DE
        isMuted: true
"#,
        );

        let groups = load_catalog_file(file.path()).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].title, "News");
        assert_eq!(groups[0].entries[0].stream_id, "a");
        assert!(!groups[0].entries[0].is_muted);
        assert!(groups[1].entries[0].is_muted);
    }

    #[test]
    fn missing_catalog_file_setting_yields_empty_catalog() {
        let config = ServerConfig::default();
        assert!(config.load_catalog().unwrap().is_empty());
    }

    #[test]
    fn core_config_carries_probe_interval() {
        let config = ServerConfig {
            probe_interval_ms: 750,
            ..ServerConfig::default()
        };
        assert_eq!(config.to_core_config().probe_interval_ms, 750);
    }
}
