// Operating mode, resolved once at startup

use crate::inference::InferenceError;
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors detected before a session is started
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Expected mode 'prod' or 'dataset', received '{0}'")]
    InvalidMode(String),

    #[error("Too many mode arguments ({0}); pass a single mode (prod/dataset) or none for prod")]
    TooManyModes(usize),

    #[error("Invalid transport setting: {0}")]
    Transport(String),

    #[error("Model error: {0}")]
    Model(#[from] InferenceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Run the model on every normalized record and publish predictions
    #[default]
    Prod,
    /// Subscribe to the debug characteristic and assemble dataset examples
    Dataset,
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PROD" => Ok(Mode::Prod),
            "DATASET" => Ok(Mode::Dataset),
            _ => Err(ConfigError::InvalidMode(s.to_string())),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Prod => write!(f, "PROD"),
            Mode::Dataset => write!(f, "DATASET"),
        }
    }
}

/// Behaviors enabled for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModeConfig {
    pub mode: Mode,
    pub inference_enabled: bool,
    pub dataset_enabled: bool,
}

impl ModeConfig {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            inference_enabled: mode == Mode::Prod,
            dataset_enabled: mode == Mode::Dataset,
        }
    }

    /// Resolve the mode from the positional command-line tokens.
    ///
    /// No token selects PROD; more than one token is rejected.
    pub fn resolve<S: AsRef<str>>(tokens: &[S]) -> ConfigResult<Self> {
        match tokens {
            [] => Ok(Self::new(Mode::Prod)),
            [token] => Ok(Self::new(token.as_ref().parse()?)),
            _ => Err(ConfigError::TooManyModes(tokens.len())),
        }
    }
}

impl Default for ModeConfig {
    fn default() -> Self {
        Self::new(Mode::default())
    }
}
