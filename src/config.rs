//! Configuration discovery and parsing for `.sweep` files.
//!
//! Config files may be JSON (`.sweep`) or YAML (`.sweep.yaml`, `.sweep.yml`).
//! The nearest file walking up from the working directory wins; otherwise the
//! user-level `branch-sweep/config.yaml` is used, otherwise defaults.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_TRUNK: &str = "main";
pub const DEFAULT_REMOTE: &str = "origin";

/// Settings that steer a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_trunk")]
    pub trunk: String,
    #[serde(default = "default_remote")]
    pub remote: String,
    /// Branches never enumerated, in addition to the trunk.
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_trunk() -> String {
    DEFAULT_TRUNK.to_string()
}

fn default_remote() -> String {
    DEFAULT_REMOTE.to_string()
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            trunk: default_trunk(),
            remote: default_remote(),
            ignore: Vec::new(),
        }
    }
}

/// Determines the format of a config file based on extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

impl ConfigFormat {
    fn from_path(path: &Path) -> Self {
        let name = path.to_string_lossy();
        if name.ends_with(".yaml") || name.ends_with(".yml") {
            ConfigFormat::Yaml
        } else {
            ConfigFormat::Json
        }
    }
}

/// Find the sweep config file, checking for .sweep, .sweep.yaml, and .sweep.yml
///
/// Walks up from `start_dir` to the filesystem root.
pub fn find_config(start_dir: &Path) -> Option<(PathBuf, ConfigFormat)> {
    let candidates = [
        (".sweep", ConfigFormat::Json),
        (".sweep.yaml", ConfigFormat::Yaml),
        (".sweep.yml", ConfigFormat::Yaml),
    ];

    let mut current_dir = start_dir.to_path_buf();
    loop {
        for (name, format) in &candidates {
            let candidate = current_dir.join(name);
            if candidate.is_file() {
                return Some((candidate, *format));
            }
        }
        if !current_dir.pop() {
            return None;
        }
    }
}

/// Path of the user-level config file, if the platform has a config dir.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("branch-sweep").join("config.yaml"))
}

/// Parse a config file, choosing JSON or YAML from its extension.
pub fn parse_config(path: &Path) -> anyhow::Result<SweepConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: '{}'", path.display()))?;

    let config: SweepConfig = match ConfigFormat::from_path(path) {
        ConfigFormat::Yaml => serde_yaml::from_str(&text)
            .with_context(|| format!("Failed to parse YAML config file: {}", path.display()))?,
        ConfigFormat::Json => serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse JSON config file: {}", path.display()))?,
    };

    if config.trunk.trim().is_empty() {
        anyhow::bail!("{}: trunk must not be empty", path.display());
    }
    if config.remote.trim().is_empty() {
        anyhow::bail!("{}: remote must not be empty", path.display());
    }

    Ok(config)
}

/// Resolve the effective config for `start_dir`.
///
/// An explicit path must exist. Without one, the nearest project file is
/// used, then the user-level file, then defaults.
pub fn load_config(start_dir: &Path, explicit: Option<&Path>) -> anyhow::Result<SweepConfig> {
    if let Some(path) = explicit {
        return parse_config(path);
    }
    if let Some((path, _format)) = find_config(start_dir) {
        log::debug!("using config {}", path.display());
        return parse_config(&path);
    }
    if let Some(path) = user_config_path().filter(|p| p.is_file()) {
        log::debug!("using user config {}", path.display());
        return parse_config(&path);
    }
    Ok(SweepConfig::default())
}
