//! Error type shared by the engine's algorithms.

use std::path::PathBuf;
use tensor::TensorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CcError {
    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error("no integral block matches labels \"{labels}\"")]
    UnknownBlock { labels: String },

    #[error("amplitude set has no excitation level {level}")]
    MissingLevel { level: usize },

    #[error("data \"{name}\" is not available")]
    MissingData { name: String },

    #[error("data \"{name}\" is {found}, expected {expected}")]
    WrongDataType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid option {key}: {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("unknown algorithm \"{name}\"; available: {available}")]
    UnknownAlgorithm { name: String, available: String },

    #[error("{path}:{line}: {reason}")]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("i/o error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CcError>;

impl CcError {
    pub(crate) fn invalid_option(key: &str, reason: impl Into<String>) -> Self {
        CcError::InvalidOption {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}
