//! # Configuration File
//!
//! YAML configuration for the comparison run: the ordered list of
//! management hosts, TLS and timeout settings, the per-group comparison
//! toggles, and the debug switch. Every key has a default so a minimal
//! file only needs to list the HMCs.

use std::fs;
use std::path::Path;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration file {path} could not be read: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration file {path} is not valid YAML: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no HMCs have been configured")]
    NoHosts,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Management hosts, tried strictly in this order.
    #[serde(default)]
    pub hmcs: Vec<String>,

    /// Verify HMC TLS certificates. Off for appliances without a trusted CA.
    #[serde(default = "default_true")]
    pub ssl_verify: bool,

    /// Debug logging plus raw-response capture to the debug directory.
    #[serde(default)]
    pub debug: bool,

    /// Per-request timeout for all HMC calls.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_true")]
    pub compare_general: bool,
    #[serde(default = "default_true")]
    pub compare_processors: bool,
    #[serde(default = "default_true")]
    pub compare_memory: bool,
    #[serde(default = "default_true")]
    pub compare_networking: bool,
    #[serde(default = "default_true")]
    pub compare_virtual_fc: bool,
    #[serde(default = "default_true")]
    pub compare_virtual_scsi: bool,
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    fn parse(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Replaces the configured HMC list with a colon-separated override
    /// from the command line.
    pub fn override_hmcs(&mut self, spec: &str) {
        self.hmcs = spec
            .split(':')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .collect();
    }

    /// There must be at least one host to try after any override.
    pub fn ensure_hosts(&self) -> Result<(), ConfigError> {
        if self.hmcs.is_empty() {
            return Err(ConfigError::NoHosts);
        }
        Ok(())
    }
}
