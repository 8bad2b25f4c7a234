//! The YAML configuration model (`spec.md` §6): top-level `devices[]`,
//! `include_path`, `capture_playback[]`, and `discovery_protocols`.

use std::path::{Path, PathBuf};

use niac_types::{Device, Error};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CapturePlaybackEntry {
    pub path: PathBuf,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub loop_ms: Option<u64>,
}

fn default_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryProtocolsConfig {
    #[serde(default)]
    pub lldp_enabled: bool,
    #[serde(default)]
    pub cdp_enabled: bool,
    #[serde(default)]
    pub edp_enabled: bool,
    #[serde(default)]
    pub fdp_enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub include_path: Option<String>,
    #[serde(default)]
    pub capture_playback: Vec<CapturePlaybackEntry>,
    #[serde(default)]
    pub discovery_protocols: DiscoveryProtocolsConfig,
}

impl SimConfig {
    /// Parses a YAML document and resolves `include_path` relative to
    /// `base_dir`, merging the included devices after the inline ones.
    pub fn load_yaml(contents: &str, base_dir: &Path) -> Result<Self, Error> {
        let mut config: SimConfig = serde_yaml::from_str(contents).map_err(|e| Error::ConfigInvalid {
            field: "<root>".into(),
            expected: "valid YAML matching the niac config schema".into(),
            got: e.to_string(),
            suggestion: "check indentation and key names against the schema".into(),
        })?;

        if let Some(include) = config.include_path.take() {
            let include_path = base_dir.join(&include);
            let included = std::fs::read_to_string(&include_path).map_err(|e| Error::ConfigInvalid {
                field: "include_path".into(),
                expected: "a readable YAML file".into(),
                got: include_path.display().to_string(),
                suggestion: e.to_string(),
            })?;
            let extra: Vec<Device> = serde_yaml::from_str(&included).map_err(|e| Error::ConfigInvalid {
                field: "include_path".into(),
                expected: "a YAML list of devices".into(),
                got: e.to_string(),
                suggestion: String::new(),
            })?;
            config.devices.extend(extra);
        }

        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, Error> {
        serde_yaml::to_string(self).map_err(|e| Error::Internal(format!("config serialize failed: {e}")))
    }
}
