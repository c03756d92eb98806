use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::candidate::CandidateLimits;
use crate::error::ConfigError;

pub const DEFAULT_PLATE_SERVICE_URL: &str = "https://api.platerecognizer.com/v1/plate-reader/";
pub const DEFAULT_PLATE_SERVICE_TIMEOUT_SECS: u64 = 10;

fn default_endpoint() -> String { DEFAULT_PLATE_SERVICE_URL.to_string() }
fn default_timeout_secs() -> u64 { DEFAULT_PLATE_SERVICE_TIMEOUT_SECS }
fn default_languages() -> Vec<String> { vec!["eng".to_string()] }
fn default_true() -> bool { true }

/// Remote plate-recognition service settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlateServiceConfig {
    /// Empty means "not configured"; the service is then never called.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Region hints forwarded to the service, e.g. `["us-ca"]`.
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PlateServiceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_endpoint(),
            regions: Vec::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OcrConfig {
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    /// Directory that contains `tessdata/`.
    pub tessdata_dir: Option<String>,
    /// Run the segmentation passes concurrently.
    #[serde(default = "default_true")]
    pub parallel_passes: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            tessdata_dir: None,
            parallel_passes: true,
        }
    }
}

/// Engine configuration. Handed to the extractor at construction and not
/// mutated afterwards. Absent fields take their defaults, so `{}` is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    #[serde(default)]
    pub plate_service: Option<PlateServiceConfig>,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub limits: CandidateLimits,
}

impl EngineConfig {
    /// Overlay an API key supplied by the host (CLI flag, environment).
    /// `None` and empty keys leave the config untouched.
    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.plate_service.get_or_insert_with(PlateServiceConfig::default).api_key = key;
        }
        self
    }

    /// The service key, only if one is actually set.
    pub fn plate_service_key(&self) -> Option<&str> {
        self.plate_service
            .as_ref()
            .map(|s| s.api_key.trim())
            .filter(|k| !k.is_empty())
    }
}

pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io { path: display.clone(), source })?;
    serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path: display, source })
}

/// Write `config` as pretty JSON, creating parent directories if needed.
pub fn save_config(path: impl AsRef<Path>, config: &EngineConfig) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ConfigError::Io { path: display.clone(), source })?;
    }
    let text = serde_json::to_string_pretty(config)?;
    fs::write(path, text).map_err(|source| ConfigError::Io { path: display, source })
}
