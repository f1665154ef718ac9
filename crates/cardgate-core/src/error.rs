use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Identity errors
    #[error("Invalid identity length: {length} (expected {min}-{max} bytes)")]
    InvalidIdentityLength { length: usize, min: usize, max: usize },

    #[error("Invalid hex identity: {0}")]
    InvalidHex(String),

    // State errors
    #[error("Invalid state transition from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
