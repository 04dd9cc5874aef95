//! Error types for spin-net.

use thiserror::Error;
use validator::ValidationErrors;

#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// Invalid topology shape, parameters or run settings.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Attempt to store a spin value other than +1 or -1.
    #[error("invalid spin value {value}, expected +1 or -1")]
    InvalidSpin { value: i8 },

    /// Malformed edge list (dangling vertex reference, non-finite weight).
    #[error("topology error: {0}")]
    Topology(String),
}

impl From<ValidationErrors> for Error {
    fn from(e: ValidationErrors) -> Self {
        Self::Configuration(format!("{e}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
