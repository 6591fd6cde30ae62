use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Config file read when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "auto-abandon.yml";

/// Changes whose unaddressed negative feedback is older than this are abandoned
pub const ABANDON_DAYS: i64 = 31;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Username for connecting to Gerrit
    pub gerrit_user: String,
    /// SSH key used for the Gerrit query interface
    pub ssh_key_file: Option<PathBuf>,
    /// HTTP password for `gerrit_user`, used for REST calls
    pub http_password: Option<String>,
    /// Project file listing the projects to clean up
    pub project_file: Option<PathBuf>,
    /// When set, nothing is actually abandoned
    pub dryrun: bool,
    /// Base URL of the Gerrit REST API
    pub gerrit_url: String,
    /// Port of Gerrit's SSH daemon
    pub ssh_port: u16,
    pub abandon_after_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gerrit_user: String::new(),
            ssh_key_file: None,
            http_password: None,
            project_file: None,
            dryrun: true,
            gerrit_url: "https://review.openstack.org".to_string(),
            ssh_port: 29418,
            abandon_after_days: ABANDON_DAYS,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        info!(path = %path.display(), dryrun = config.dryrun, "Loaded configuration");

        Ok(config)
    }

    /// Check that everything a run needs is present
    pub fn validate(&self) -> Result<()> {
        if self.gerrit_user.is_empty() {
            anyhow::bail!("gerrit_user must be set");
        }
        if self.project_file.is_none() {
            anyhow::bail!("project_file must be set");
        }
        if !self.dryrun && self.http_password.is_none() {
            anyhow::bail!("http_password is required when dryrun is disabled");
        }
        if self.abandon_after_days < 0 {
            anyhow::bail!(
                "abandon_after_days must not be negative, got {}",
                self.abandon_after_days
            );
        }
        Ok(())
    }

    /// Host name part of `gerrit_url`, used for SSH queries
    pub fn gerrit_host(&self) -> Result<String> {
        let url = reqwest::Url::parse(&self.gerrit_url)
            .with_context(|| format!("Invalid gerrit_url: {}", self.gerrit_url))?;
        url.host_str()
            .map(str::to_string)
            .with_context(|| format!("gerrit_url has no host: {}", self.gerrit_url))
    }
}
