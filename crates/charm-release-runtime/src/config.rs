use crate::RuntimeError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which tool binaries to run and which channel to release to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolConfig {
    #[serde(default = "default_charmcraft")]
    pub charmcraft: String,
    #[serde(default = "default_docker")]
    pub docker: String,
    #[serde(default = "default_channel")]
    pub channel: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            charmcraft: default_charmcraft(),
            docker: default_docker(),
            channel: default_channel(),
        }
    }
}

fn default_charmcraft() -> String {
    "charmcraft".to_owned()
}

fn default_docker() -> String {
    "docker".to_owned()
}

fn default_channel() -> String {
    "beta".to_owned()
}

impl ToolConfig {
    #[must_use]
    pub fn with_channel(mut self, channel: &str) -> Self {
        self.channel = channel.to_owned();
        self
    }

    /// Load `~/.config/charm-release/config.json`, or defaults when it does not exist.
    pub fn load_default() -> Result<Self, RuntimeError> {
        match default_config_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, RuntimeError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| RuntimeError::Config(format!("invalid config {}: {e}", path.display())))?;
        if config.channel.trim().is_empty() {
            return Err(RuntimeError::Config("channel must not be empty".to_owned()));
        }
        Ok(config)
    }
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".config/charm-release/config.json"))
}
