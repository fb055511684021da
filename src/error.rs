//! Error types shared by the step sequence, the cache stores and the wizard.
//!
//! Absent data is never an error here: lookups return `Option`/`bool` and
//! callers branch on them. Errors are reserved for misconfiguration,
//! missing required steps and storage failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WizardError {
    /// Developer-facing misconfiguration (empty step list, bad step index,
    /// missing save handler, missing cache collaborator, bad table name).
    #[error("{0}")]
    InvalidArgument(String),

    #[error("step '{0}' not found")]
    StepNotFound(String),

    #[error("malformed wizard payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("wizard payload is not an object: {0}")]
    CorruptDocument(String),

    #[error("wizard database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("wizard session error: {0}")]
    Session(String),

    #[error("failed to save step '{slug}': {source}")]
    Save {
        slug: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to complete wizard '{wizard}': {source}")]
    Complete {
        wizard: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("temporary file transfer failed: {0}")]
    Io(#[from] std::io::Error),
}

impl WizardError {
    pub fn invalid(message: impl Into<String>) -> Self {
        WizardError::InvalidArgument(message.into())
    }

    /// True for errors that mean the requested step does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, WizardError::StepNotFound(_))
    }
}

pub type Result<T, E = WizardError> = std::result::Result<T, E>;
