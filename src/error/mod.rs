//! Error types for kubesre

use thiserror::Error;

/// Main error type for kubesre
#[derive(Debug, Error)]
pub enum SreError {
    #[error("Command `{command}` failed: {message}")]
    Command { command: String, message: String },

    #[error("Timeout waiting for `{0}`")]
    Timeout(String),

    #[error("Failed to parse resource JSON: {0}")]
    Parse(String),

    #[error("Resource not found: {kind}/{name}")]
    NotFound { kind: String, name: String },

    #[error("Unsupported resource kind: {0}")]
    UnsupportedKind(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No context specified and no current context in kubeconfig")]
    NoContext,

    #[error("Context not found: {0}")]
    ContextNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SreError {
    /// Wrap a collaborator failure with the command line that produced it
    pub fn command(args: &[&str], message: impl Into<String>) -> Self {
        SreError::Command {
            command: args.join(" "),
            message: message.into(),
        }
    }

    /// Whether the error came from the external collaborator rather than from
    /// decoding or validation
    pub fn is_collaborator_failure(&self) -> bool {
        matches!(self, SreError::Command { .. } | SreError::Timeout(_) | SreError::Io(_))
    }
}

impl From<serde_json::Error> for SreError {
    fn from(e: serde_json::Error) -> Self {
        SreError::Parse(e.to_string())
    }
}

impl From<serde_yaml::Error> for SreError {
    fn from(e: serde_yaml::Error) -> Self {
        SreError::Serialization(e.to_string())
    }
}

/// Result type alias for kubesre
pub type Result<T> = std::result::Result<T, SreError>;
