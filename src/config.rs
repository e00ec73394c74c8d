//! Configuration handling for the labels integration

use crate::state::AvatarSize;
use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default host address
const DEFAULT_BASE_URL: &str = "http://localhost:7990";
/// Default REST prefix of the labels endpoints
const DEFAULT_REST_PATH: &str = "/rest/labels/1.0";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding `base_url`
pub const BASE_URL_ENV: &str = "PR_LABELS_BASE_URL";
/// Environment variable overriding `token`
pub const TOKEN_ENV: &str = "PR_LABELS_TOKEN";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LabelsConfig {
    /// Host address
    pub base_url: Option<String>,
    /// REST prefix of the labels endpoints
    pub rest_path: Option<String>,
    /// Bearer token sent with every request
    pub token: Option<String>,
    /// Avatar size requested by the filtered pull-request list
    pub avatar_size: Option<String>,
    /// Per-request timeout
    pub request_timeout_secs: Option<u64>,
}

impl LabelsConfig {
    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("io", "pr-labels", "pr-labels")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from file, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Read a config file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(path) = Self::config_path() {
            self.save_to(&path)?;
        }
        Ok(())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(BASE_URL_ENV) {
            self.base_url = Some(url);
        }
        if let Some(token) = lookup(TOKEN_ENV) {
            self.token = Some(token);
        }
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn rest_path(&self) -> &str {
        self.rest_path.as_deref().unwrap_or(DEFAULT_REST_PATH)
    }

    pub fn token(&self) -> Option<String> {
        self.token.clone().filter(|token| !token.is_empty())
    }

    /// Unknown size names fall back to the default size
    pub fn avatar_size(&self) -> AvatarSize {
        match self.avatar_size.as_deref() {
            Some(name) => AvatarSize::from_name(name).unwrap_or_else(|| {
                tracing::warn!("unknown avatar size {name:?}, using default");
                AvatarSize::default()
            }),
            None => AvatarSize::default(),
        }
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }
}
