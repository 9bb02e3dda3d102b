use thiserror::Error;

use crate::ScalarId;

/// Errors raised around the autograd core.
///
/// Arithmetic itself never fails: NaN and infinities flow through values and gradients.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Input arity mismatch: expected {expected} inputs, got {actual}")]
    InputArity { expected: usize, actual: usize },

    #[error("Node {node} still holds gradient {grad}; reset gradients before a fresh backward pass")]
    StaleGradient { node: ScalarId, grad: f64 },

    #[error("Invalid weight initialization: {0}")]
    Init(String),

    #[error("env var {key}: {message}")]
    EnvVar { key: String, message: String },

    #[error("env var {key}={value:?}: {message}")]
    Parse {
        key: String,
        value: String,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
