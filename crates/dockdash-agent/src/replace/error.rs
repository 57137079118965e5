//! Replacement failures

use crate::docker::EngineError;
use dockdash_core::ContainerStatus;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyKind {
    /// The container reached `exited` or `dead`
    Crashed,
    /// The container never reached `running` within the timeout
    TimedOut,
}

/// Why a started replacement was judged not alive
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyFailure {
    pub kind: VerifyKind,
    /// Last status observed, `Unknown` if the container could not be read
    pub status: ContainerStatus,
    pub exit_code: Option<i64>,
    pub error: Option<String>,
    pub timeout: Duration,
    /// Tail of the container output
    pub logs: Vec<String>,
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            VerifyKind::Crashed => {
                write!(f, "Replacement container {} right after start", self.status)?;
                if let Some(code) = self.exit_code {
                    write!(f, " with exit code {}", code)?;
                }
            }
            VerifyKind::TimedOut => write!(
                f,
                "Replacement container did not stay running within {}ms (last status: {})",
                self.timeout.as_millis(),
                self.status
            )?,
        }

        if let Some(error) = &self.error {
            write!(f, ": {}", error)?;
        }

        if !self.logs.is_empty() {
            write!(f, "\nLast log lines:\n{}", self.logs.join("\n"))?;
        }

        Ok(())
    }
}

/// Replacement failure taxonomy
///
/// Only [`ReplaceError::RollbackPartialFailure`] leaves the host in a state
/// that needs a human; every other failure after the rename was rolled back.
#[derive(Debug, Error)]
pub enum ReplaceError {
    #[error("Container not found: {0}")]
    NotFound(String),

    #[error("Container engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Cannot determine image for container {0}")]
    MissingImage(String),

    #[error("Cannot resolve network mode container:{reference}: {source}")]
    NetworkModeUnresolved {
        reference: String,
        source: EngineError,
    },

    #[error("Failed to rename container out of the way: {0}")]
    RenameFailed(EngineError),

    #[error("Failed to stop container: {0}")]
    StopFailed(EngineError),

    #[error("Failed to create replacement container: {0}")]
    CreateFailed(EngineError),

    #[error("Failed to start replacement container: {0}")]
    StartFailed(EngineError),

    #[error("{0}")]
    VerifyFailed(VerifyFailure),

    #[error("{cause}; rollback incomplete: {}", .rollback_errors.join("; "))]
    RollbackPartialFailure {
        cause: Box<ReplaceError>,
        rollback_errors: Vec<String>,
    },
}

impl ReplaceError {
    pub fn requires_manual_intervention(&self) -> bool {
        matches!(self, Self::RollbackPartialFailure { .. })
    }

    /// The failure that triggered a rollback, or the error itself
    pub fn root_cause(&self) -> &ReplaceError {
        match self {
            Self::RollbackPartialFailure { cause, .. } => cause.root_cause(),
            other => other,
        }
    }

    /// Classify a failed read of the container being replaced
    pub(crate) fn from_lookup(container: &str, err: EngineError) -> Self {
        match err {
            EngineError::NotFound(_) => Self::NotFound(container.to_string()),
            other => Self::EngineUnavailable(other.to_string()),
        }
    }
}
