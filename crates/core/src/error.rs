use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConductorError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Unauthorized {operation} by {caller}")]
    Unauthorized { operation: String, caller: String },
}

impl ConductorError {
    /// Create an invalid-argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create a missing-dependency error.
    pub fn missing_dependency(what: impl Into<String>) -> Self {
        Self::MissingDependency(what.into())
    }

    /// Create an unauthorized error for the given operation and caller.
    pub fn unauthorized(operation: impl Into<String>, caller: impl Into<String>) -> Self {
        Self::Unauthorized {
            operation: operation.into(),
            caller: caller.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConductorError>;
