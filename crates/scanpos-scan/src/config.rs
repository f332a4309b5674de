//! # Scanner Configuration
//!
//! The `[scanner]` section of the terminal's config file.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SCANPOS_REQUIRED_MATCHES=3                                         │
//! │     SCANPOS_TRY_HARDER=false                                           │
//! │                                                                         │
//! │  2. TOML Config File ([scanner] table of scanpos.toml)                 │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     four-rung ladder, 2 matches / 3 chars, 100..300ms cadence          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [scanner.camera]
//! reconnect_on_track_end = true
//! ready_poll_interval_ms = 100
//! rear_index = 0
//!
//! [[scanner.camera.ladder]]
//! facing = "environment"
//! ideal_width = 1280
//! ideal_height = 720
//!
//! [[scanner.camera.ladder]]
//! facing = "any"
//! min_width = 320
//! min_height = 240
//!
//! [scanner.decode]
//! symbologies = ["qr", "ean13", "code128"]
//! try_harder = true
//!
//! [scanner.decode.cadence]
//! floor_ms = 100
//! idle_ceiling_ms = 250
//! error_ceiling_ms = 300
//!
//! [scanner.confirm]
//! required_matches = 2
//! min_length = 3
//! ```

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use scanpos_core::{CadencePolicy, ConfirmPolicy, Symbology};

use crate::device::{default_ladder, VideoConstraints};
use crate::error::{ScanError, ScanResult};

// =============================================================================
// Camera Settings
// =============================================================================

/// Camera acquisition settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Constraint sets tried in order until one is accepted.
    #[serde(default = "default_ladder")]
    pub ladder: Vec<VideoConstraints>,

    /// Attempt one silent reacquisition when the track ends unexpectedly.
    #[serde(default = "default_true")]
    pub reconnect_on_track_end: bool,

    /// How often the sink re-checks the surface for a first frame.
    #[serde(default = "default_ready_poll_interval")]
    pub ready_poll_interval_ms: u64,

    /// Native device index used for rear-facing and unconstrained requests.
    #[serde(default)]
    pub rear_index: u32,

    /// Native device index used for front-facing requests, if one exists.
    #[serde(default)]
    pub front_index: Option<u32>,
}

fn default_true() -> bool {
    true
}

fn default_ready_poll_interval() -> u64 {
    100
}

impl Default for CameraSettings {
    fn default() -> Self {
        CameraSettings {
            ladder: default_ladder(),
            reconnect_on_track_end: true,
            ready_poll_interval_ms: default_ready_poll_interval(),
            rear_index: 0,
            front_index: None,
        }
    }
}

impl CameraSettings {
    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }
}

// =============================================================================
// Decode Settings
// =============================================================================

/// Decoder hints and loop cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeSettings {
    /// Symbologies the decoder should look for; fixed for a session.
    #[serde(default = "default_symbologies")]
    pub symbologies: BTreeSet<Symbology>,

    /// Spend more time per frame for better recognition.
    #[serde(default = "default_true")]
    pub try_harder: bool,

    #[serde(default)]
    pub cadence: CadencePolicy,
}

fn default_symbologies() -> BTreeSet<Symbology> {
    Symbology::ALL.into_iter().collect()
}

impl Default for DecodeSettings {
    fn default() -> Self {
        DecodeSettings {
            symbologies: default_symbologies(),
            try_harder: true,
            cadence: CadencePolicy::default(),
        }
    }
}

// =============================================================================
// Main Scanner Configuration
// =============================================================================

/// Complete scanner configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub camera: CameraSettings,

    #[serde(default)]
    pub decode: DecodeSettings,

    #[serde(default)]
    pub confirm: ConfirmPolicy,
}

impl ScannerConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> ScanResult<()> {
        if self.camera.ladder.is_empty() {
            return Err(ScanError::InvalidConfig(
                "camera.ladder must contain at least one constraint set".into(),
            ));
        }

        for (i, rung) in self.camera.ladder.iter().enumerate() {
            rung.check().map_err(|reason| {
                ScanError::InvalidConfig(format!("camera.ladder[{}]: {}", i, reason))
            })?;
        }

        if self.camera.ready_poll_interval_ms == 0 {
            return Err(ScanError::InvalidConfig(
                "camera.ready_poll_interval_ms must be greater than 0".into(),
            ));
        }

        if self.decode.symbologies.is_empty() {
            return Err(ScanError::InvalidConfig(
                "decode.symbologies must not be empty".into(),
            ));
        }

        self.decode
            .cadence
            .validate()
            .map_err(|e| ScanError::InvalidConfig(format!("decode.cadence: {}", e)))?;

        if self.confirm.required_matches == 0 {
            return Err(ScanError::InvalidConfig(
                "confirm.required_matches must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies `SCANPOS_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary key lookup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("SCANPOS_REQUIRED_MATCHES") {
            match value.parse::<u32>() {
                Ok(n) => {
                    debug!(required_matches = n, "Overriding confirmation threshold from environment");
                    self.confirm.required_matches = n;
                }
                Err(_) => warn!(value = %value, "Ignoring invalid SCANPOS_REQUIRED_MATCHES"),
            }
        }

        if let Some(value) = lookup("SCANPOS_MIN_CODE_LENGTH") {
            match value.parse::<usize>() {
                Ok(n) => self.confirm.min_length = n,
                Err(_) => warn!(value = %value, "Ignoring invalid SCANPOS_MIN_CODE_LENGTH"),
            }
        }

        if let Some(value) = lookup("SCANPOS_TRY_HARDER") {
            match parse_bool(&value) {
                Some(b) => self.decode.try_harder = b,
                None => warn!(value = %value, "Ignoring invalid SCANPOS_TRY_HARDER"),
            }
        }

        if let Some(value) = lookup("SCANPOS_RECONNECT_ON_TRACK_END") {
            match parse_bool(&value) {
                Some(b) => self.camera.reconnect_on_track_end = b,
                None => warn!(value = %value, "Ignoring invalid SCANPOS_RECONNECT_ON_TRACK_END"),
            }
        }

        if let Some(value) = lookup("SCANPOS_CAMERA_INDEX") {
            match value.parse::<u32>() {
                Ok(index) => {
                    debug!(index, "Overriding camera index from environment");
                    self.camera.rear_index = index;
                }
                Err(_) => warn!(value = %value, "Ignoring invalid SCANPOS_CAMERA_INDEX"),
            }
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = ScannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.camera.ladder.len(), 4);
        assert_eq!(config.confirm.required_matches, 2);
        assert_eq!(config.confirm.min_length, 3);
        assert!(config.decode.try_harder);
        assert_eq!(config.decode.symbologies.len(), Symbology::ALL.len());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ScannerConfig = toml::from_str(
            r#"
            [confirm]
            required_matches = 3

            [decode]
            symbologies = ["qr", "ean13"]
            "#,
        )
        .unwrap();

        assert_eq!(config.confirm.required_matches, 3);
        assert_eq!(config.confirm.min_length, 3);
        assert_eq!(config.decode.symbologies.len(), 2);
        assert!(config.decode.symbologies.contains(&Symbology::Qr));
        assert_eq!(config.camera.ladder.len(), 4);
        assert_eq!(config.decode.cadence.floor_ms, 100);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = ScannerConfig::default();
        config.camera.ladder.clear();
        assert!(matches!(config.validate(), Err(ScanError::InvalidConfig(_))));

        let mut config = ScannerConfig::default();
        config.confirm.required_matches = 0;
        assert!(config.validate().is_err());

        let mut config = ScannerConfig::default();
        config.decode.symbologies.clear();
        assert!(config.validate().is_err());

        let mut config = ScannerConfig::default();
        config.decode.cadence.error_ceiling_ms = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("SCANPOS_REQUIRED_MATCHES", "3"),
            ("SCANPOS_TRY_HARDER", "off"),
            ("SCANPOS_CAMERA_INDEX", "2"),
            ("SCANPOS_MIN_CODE_LENGTH", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = ScannerConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.confirm.required_matches, 3);
        assert!(!config.decode.try_harder);
        assert_eq!(config.camera.rear_index, 2);
        assert_eq!(config.confirm.min_length, 3, "invalid value ignored");
    }
}
