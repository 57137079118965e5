//! State of one replacement run and its compensating actions

use super::error::ReplaceError;
use crate::docker::{ContainerEngine, EngineError};
use dockdash_core::{short_id, ContainerDescriptor};
use tracing::{info, warn};

/// Temporary name the original container holds while its replacement is built
pub fn rollback_name(name: &str, timestamp: i64) -> String {
    format!("{}__rollback_{}", name, timestamp)
}

/// Name a rollback-named container held before its replacement began
pub fn original_name(name: &str) -> Option<&str> {
    let (original, timestamp) = name.rsplit_once("__rollback_")?;
    if original.is_empty() || timestamp.is_empty() {
        return None;
    }
    timestamp
        .bytes()
        .all(|b| b.is_ascii_digit())
        .then_some(original)
}

/// Ephemeral bookkeeping for a single replacement
///
/// The flags record which side effects have happened, so a rollback undoes
/// exactly those and nothing else.
#[derive(Debug, Clone)]
pub struct ReplacementAttempt {
    pub old_id: String,
    pub original_name: String,
    pub rollback_name: String,
    pub was_running: bool,
    pub renamed_old: bool,
    pub new_id: Option<String>,
    pub started: bool,
}

impl ReplacementAttempt {
    pub fn new(old: &ContainerDescriptor) -> Self {
        Self {
            old_id: old.id.clone(),
            original_name: old.name.clone(),
            rollback_name: rollback_name(&old.name, chrono::Utc::now().timestamp()),
            was_running: old.is_running(),
            renamed_old: false,
            new_id: None,
            started: false,
        }
    }

    /// Move the original container out of the way of its replacement
    pub async fn rename_old(&mut self, engine: &dyn ContainerEngine) -> Result<(), ReplaceError> {
        engine
            .rename_container(&self.old_id, &self.rollback_name)
            .await
            .map_err(ReplaceError::RenameFailed)?;
        self.renamed_old = true;

        info!(
            "Renamed {} to {}",
            self.original_name, self.rollback_name
        );
        Ok(())
    }

    /// Undo every recorded side effect and return the error to report
    ///
    /// Each step runs even if an earlier one failed. Errors are collected
    /// rather than retried.
    pub async fn rollback(self, engine: &dyn ContainerEngine, cause: ReplaceError) -> ReplaceError {
        warn!("Rolling back replacement of {}: {}", self.original_name, cause);
        let mut rollback_errors = Vec::new();

        if let Some(new_id) = &self.new_id {
            match engine.remove_container(new_id, true).await {
                Ok(()) | Err(EngineError::NotFound(_)) => {}
                Err(e) => rollback_errors.push(format!(
                    "failed to remove replacement container {}: {}",
                    short_id(new_id),
                    e
                )),
            }
        }

        if self.renamed_old {
            if let Err(e) = engine
                .rename_container(&self.old_id, &self.original_name)
                .await
            {
                rollback_errors.push(format!(
                    "failed to rename {} back to {}: {}",
                    self.rollback_name, self.original_name, e
                ));
            }
        }

        if self.was_running {
            if let Err(e) = engine.start_container(&self.old_id).await {
                rollback_errors.push(format!(
                    "failed to restart original container {}: {}",
                    short_id(&self.old_id),
                    e
                ));
            }
        }

        if rollback_errors.is_empty() {
            info!("Rolled back replacement of {}", self.original_name);
            cause
        } else {
            ReplaceError::RollbackPartialFailure {
                cause: Box::new(cause),
                rollback_errors,
            }
        }
    }
}
