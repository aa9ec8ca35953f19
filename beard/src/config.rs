//! Runtime configuration.
//!
//! Every field has a default, so an empty document is a valid configuration.
//!
//! ```toml
//! default_timeout_secs = 30
//! apology = "Oops."
//! forward_logs = true
//! key = "123456:ABC"
//!
//! [timeouts]
//! Search = 120
//! ```

use beard_core::ParseMode;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

/// Text sent to a chat when one of its handlers fails.
pub const DEFAULT_APOLOGY: &str = "Sorry, something went wrong";

/// Errors raised while loading a [`Config`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration")]
    Parse(#[from] toml::de::Error),
}

/// Delegator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Idle timeout for instances whose beard does not set its own.
    pub default_timeout_secs: u64,
    /// Text sent when a handler fails.
    pub apology: String,
    /// Parse mode for paginated messages.
    pub parse_mode: ParseMode,
    /// Also send instance log lines to the chat.
    pub forward_logs: bool,
    /// How often the reaper looks for idle instances.
    pub reap_interval_ms: u64,
    /// Bot key made available to beards.
    pub key: Option<String>,
    /// Per-beard idle timeouts in seconds, overriding everything else.
    pub timeouts: HashMap<String, u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_timeout_secs: 10,
            apology: DEFAULT_APOLOGY.to_owned(),
            parse_mode: ParseMode::Html,
            forward_logs: false,
            reap_interval_ms: 1000,
            key: None,
            timeouts: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Idle timeout for `beard`.
    ///
    /// A configured override wins over the beard's own timeout, which wins
    /// over [`default_timeout_secs`](Self::default_timeout_secs).
    pub fn timeout_for(&self, beard: &str, declared: Option<Duration>) -> Duration {
        if let Some(secs) = self.timeouts.get(beard) {
            return Duration::from_secs(*secs);
        }
        declared.unwrap_or(Duration::from_secs(self.default_timeout_secs))
    }

    pub fn reap_interval(&self) -> Duration {
        Duration::from_millis(self.reap_interval_ms.max(1))
    }
}
