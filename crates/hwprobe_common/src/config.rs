//! Configuration management for hwprobe.
//!
//! Loads settings from /etc/hwprobe/config.toml or uses defaults.

use crate::evidence::{SysEvidence, DEFAULT_VIRT_HELPER};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Config file path
pub const CONFIG_PATH: &str = "/etc/hwprobe/config.toml";

/// Fallback config file path
pub const DEFAULT_CONFIG_PATH: &str = "/var/lib/hwprobe/config.toml";

/// Sampling pass configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SamplingConfig {
    /// Pause between the baseline and the final pass
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

fn default_interval_ms() -> u64 {
    1_000
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
        }
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Where evidence is read from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvidenceConfig {
    /// Prefix for every evidence path (a mounted image, a chroot)
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Virtualization detection helper; empty disables the helper tier.
    /// Unset means the default helper for root "/" and none otherwise,
    /// since the helper inspects the running host, not the root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect_virt_helper: Option<String>,
}

fn default_root() -> PathBuf {
    PathBuf::from("/")
}

impl Default for EvidenceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            detect_virt_helper: None,
        }
    }
}

impl EvidenceConfig {
    /// Helper command the first detection tier runs, if any
    pub fn helper(&self) -> Option<String> {
        match &self.detect_virt_helper {
            Some(helper) => Some(helper.clone()),
            None if self.root == Path::new("/") => Some(DEFAULT_VIRT_HELPER.to_string()),
            None => None,
        }
    }

    pub fn reader(&self) -> SysEvidence {
        SysEvidence::new(self.root.clone(), self.helper())
    }
}

/// Document rendering
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputConfig {
    #[serde(default = "default_pretty")]
    pub pretty: bool,
}

fn default_pretty() -> bool {
    true
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            pretty: default_pretty(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub sampling: SamplingConfig,

    #[serde(default)]
    pub evidence: EvidenceConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load config from the standard locations, falling back to defaults
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_PATH)
            .or_else(|_| Self::load_from_path(DEFAULT_CONFIG_PATH))
            .unwrap_or_else(|e| {
                warn!("Config not found, using defaults: {}", e);
                Config::default()
            })
    }

    /// Load config from specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save default config to path
    pub fn save_default(path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(&Config::default())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved default config to {}", path.display());
        Ok(())
    }
}
