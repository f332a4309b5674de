//! # Terminal Configuration
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`SCANPOS_*`)
//! 2. Config file (`scanpos.toml`)
//! 3. Defaults
//!
//! ## Example Config File
//! ```toml
//! [api]
//! base_url = "https://pos.example.com"
//! timeout_secs = 10
//!
//! [scanner.confirm]
//! required_matches = 2
//! min_length = 3
//!
//! [scanner.decode]
//! try_harder = true
//!
//! [terminal]
//! employee_code = "E001"
//! currency_symbol = "¥"
//! ```
//!
//! Read-only after startup.

use std::path::{Path, PathBuf};

use scanpos_api::ApiSettings;
use scanpos_core::validation::normalize_employee_code;
use scanpos_core::Yen;
use scanpos_scan::ScannerConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while loading or saving the config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read or write config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("No config path available on this platform")]
    NoConfigDir,
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Terminal Settings
// =============================================================================

/// Register-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSettings {
    /// Employee code sent with purchases when none is typed.
    #[serde(default)]
    pub employee_code: String,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_currency_symbol() -> String {
    "¥".to_string()
}

impl Default for TerminalSettings {
    fn default() -> Self {
        TerminalSettings {
            employee_code: String::new(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

/// Complete terminal configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub scanner: ScannerConfig,

    #[serde(default)]
    pub terminal: TerminalSettings,
}

impl AppConfig {
    /// Loads configuration from file and environment.
    ///
    /// A missing file is not an error; defaults are used.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading terminal config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load terminal config: {}. Using defaults.", e);
            let mut config = Self::default();
            config.apply_env_overrides();
            if let Err(e) = config.validate() {
                warn!("Environment overrides rejected: {}. Using plain defaults.", e);
                return Self::default();
            }
            config
        })
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, config_path: Option<&Path>) -> ConfigResult<PathBuf> {
        let path = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path().ok_or(ConfigError::NoConfigDir)?,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Terminal config saved");
        Ok(path)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.api
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[api] {}", e)))?;
        self.scanner
            .validate()
            .map_err(|e| ConfigError::Invalid(format!("[scanner] {}", e)))?;
        normalize_employee_code(&self.terminal.employee_code)
            .map_err(|e| ConfigError::Invalid(format!("[terminal] {}", e)))?;
        Ok(())
    }

    /// Applies `SCANPOS_*` environment variable overrides to every section.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.api.apply_overrides(&lookup);
        self.scanner.apply_overrides(&lookup);
        if let Some(code) = lookup("SCANPOS_EMPLOYEE_CODE") {
            debug!("Overriding employee code from environment");
            self.terminal.employee_code = code;
        }
    }

    /// `{config_dir}/scanpos.toml` for this platform.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "scanpos", "pos")
            .map(|dirs| dirs.config_dir().join("scanpos.toml"))
    }

    pub fn format_amount(&self, amount: Yen) -> String {
        amount.format_with(&self.terminal.currency_symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.terminal.currency_symbol, "¥");
        assert_eq!(config.format_amount(Yen::new(12800)), "¥12,800");
    }

    #[test]
    fn test_partial_file() {
        let config: AppConfig = toml::from_str(
            r#"
            [api]
            base_url = "https://pos.example.com"

            [scanner.confirm]
            required_matches = 3

            [terminal]
            employee_code = "E001"
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://pos.example.com");
        assert_eq!(config.api.timeout_secs, 10);
        assert_eq!(config.scanner.confirm.required_matches, 3);
        assert_eq!(config.terminal.employee_code, "E001");
        assert_eq!(config.terminal.currency_symbol, "¥");
    }

    #[test]
    fn test_overrides_reach_every_section() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "SCANPOS_API_URL" => Some("http://10.0.0.5:8000".into()),
            "SCANPOS_REQUIRED_MATCHES" => Some("4".into()),
            "SCANPOS_EMPLOYEE_CODE" => Some("E042".into()),
            _ => None,
        });
        assert_eq!(config.api.base_url, "http://10.0.0.5:8000");
        assert_eq!(config.scanner.confirm.required_matches, 4);
        assert_eq!(config.terminal.employee_code, "E042");
    }

    #[test]
    fn test_validate_rejects_long_employee_code() {
        let mut config = AppConfig::default();
        config.terminal.employee_code = "EMPLOYEE-00001".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scanpos.toml");

        let mut config = AppConfig::default();
        config.api.base_url = "https://pos.example.com".into();
        config.terminal.employee_code = "E001".into();
        config.save(Some(&path)).unwrap();

        let loaded = AppConfig::load(Some(path)).unwrap();
        assert_eq!(loaded.api.base_url, "https://pos.example.com");
        assert_eq!(loaded.terminal.employee_code, "E001");
        assert_eq!(loaded.scanner, config.scanner);
    }

    #[test]
    fn test_load_or_default_on_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanpos.toml");
        std::fs::write(&path, "[api\nbase_url = ").unwrap();

        assert!(AppConfig::load(Some(path.clone())).is_err());
        let config = AppConfig::load_or_default(Some(path));
        assert!(config.validate().is_ok());
    }
}
