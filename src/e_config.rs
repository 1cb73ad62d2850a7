//! Configuration for the compilation check service.
//!
//! Values come from built-in defaults, then an optional TOML file, then
//! environment variables. The CLI applies its own flags last.

use crate::e_error::{CheckError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PRIMARY_URL: &str = "http://127.0.0.1:3030";
pub const DEFAULT_PLAYGROUND_URL: &str = "https://play.rust-lang.org/execute";

pub const ENV_CONFIG: &str = "BLOCKLY_CHECK_CONFIG";
pub const ENV_PRIMARY_URL: &str = "BLOCKLY_CHECK_URL";
pub const ENV_FALLBACK: &str = "BLOCKLY_CHECK_FALLBACK";
pub const ENV_QUICK: &str = "BLOCKLY_CHECK_QUICK";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Base URL of the local compiler service; `/health` and `/check` are appended.
    pub primary_url: String,
    /// Whether the public playground is tried when the primary fails.
    pub fallback_enabled: bool,
    /// Default for checks that don't say otherwise.
    pub quick_check: bool,
    pub request_timeout_secs: u64,
    pub health_timeout_secs: u64,
    pub playground_url: String,
    pub channel: String,
    pub edition: String,
    /// Discard compiler totals (`error: aborting due to ...`) when parsing text output.
    pub drop_summary_lines: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        CheckConfig {
            primary_url: DEFAULT_PRIMARY_URL.to_string(),
            fallback_enabled: true,
            quick_check: false,
            request_timeout_secs: 30,
            health_timeout_secs: 2,
            playground_url: DEFAULT_PLAYGROUND_URL.to_string(),
            channel: "stable".to_string(),
            edition: "2021".to_string(),
            drop_summary_lines: false,
        }
    }
}

impl CheckConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(self.health_timeout_secs)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CheckError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CheckError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }

    /// Defaults, then `path` (or `$BLOCKLY_CHECK_CONFIG`) if given, then env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(ENV_CONFIG).ok();
        let path = path.or(env_path.as_deref().map(Path::new));
        let mut config = match path {
            Some(p) => {
                log::debug!("loading config from {}", p.display());
                Self::from_file(p)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applies overrides from a key lookup (the process environment in [`CheckConfig::load`]).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_PRIMARY_URL) {
            self.primary_url = url;
        }
        if let Some(raw) = lookup(ENV_FALLBACK) {
            self.fallback_enabled = parse_flag(ENV_FALLBACK, &raw)?;
        }
        if let Some(raw) = lookup(ENV_QUICK) {
            self.quick_check = parse_flag(ENV_QUICK, &raw)?;
        }
        Ok(())
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CheckError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}
