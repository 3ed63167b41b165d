//! Service configuration.
//!
//! # Invariants
//! - Configuration is an explicit value owned by each service; nothing here
//!   is process-global.
//! - Missing keys fall back to defaults (`error_mode = handle`).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// What a CRUD call does when the store fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Answer the request with a generic internal error; no `Err` reaches the caller.
    #[default]
    Handle,
    /// Return the original store error to the caller.
    Propagate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrudConfig {
    #[serde(default)]
    pub error_mode: ErrorMode,
}

impl CrudConfig {
    /// Boolean form: `true` handles errors, `false` propagates them.
    pub fn handle_errors(handle: bool) -> Self {
        Self {
            error_mode: if handle {
                ErrorMode::Handle
            } else {
                ErrorMode::Propagate
            },
        }
    }

    pub fn handles_errors(&self) -> bool {
        self.error_mode == ErrorMode::Handle
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(ConfigError::Parse)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path.as_ref()).map_err(|err| ConfigError::Read {
            path: path.as_ref().display().to_string(),
            source: err,
        })?;
        Self::from_json_str(&raw)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Read {
        path: String,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => write!(f, "cannot read config `{path}`: {source}"),
            Self::Parse(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
        }
    }
}
