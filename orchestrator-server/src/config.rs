//! Server configuration loading (`SPEC_FULL.md` §6.5/§6.6), grounded on the
//! teacher's `memory-cli::config::loader` TOML-file + environment-override
//! pattern.

use std::path::Path;

use orchestrator_core::config::ConfigSnapshot;
use orchestrator_core::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// `server.bind_addr`/`server.request_timeout_s` (§6.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
    pub request_timeout_s: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0:8080".to_string(), request_timeout_s: 30 }
    }
}

/// `logging.level`/`logging.json` (§6.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), json: false }
    }
}

/// Full process configuration: the HTTP/logging surface this crate owns,
/// plus the `ConfigSnapshot` the decision engine and its components are
/// built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: HttpConfig,
    pub logging: LoggingConfig,
    pub core: ConfigSnapshot,
}

const DEFAULT_CONFIG_PATHS: &[&str] = &["orchestrator.toml", ".orchestrator.toml"];
const CONFIG_PATH_ENV_VAR: &str = "ORCHESTRATOR_CONFIG";

impl AppConfig {
    /// Load from `ORCHESTRATOR_CONFIG`, then the default search paths, then
    /// built-in defaults if nothing is found — never panics on a missing
    /// file, only on a malformed one.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV_VAR) {
            return Self::from_path(Path::new(&path));
        }
        for candidate in DEFAULT_CONFIG_PATHS {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::from_path(path);
            }
        }
        tracing::warn!("no configuration file found, using built-in defaults");
        Ok(Self::default())
    }

    fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("failed to read {}: {e}", path.display())))?;
        toml::from_str(&text).map_err(|e| Error::ConfigError(format!("invalid config toml in {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(cfg.core.intelligence.max_tasks_per_sprint, 20);
    }

    #[test]
    fn parses_partial_toml_overriding_only_named_sections() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [server]
            bind_addr = "127.0.0.1:9000"

            [core.intelligence]
            confidence_threshold = 0.8
            "#,
        )
        .unwrap();
        assert_eq!(cfg.server.bind_addr, "127.0.0.1:9000");
        assert!((cfg.core.intelligence.confidence_threshold - 0.8).abs() < f64::EPSILON);
        assert_eq!(cfg.logging.level, "info");
    }
}
