//! Post-replacement hooks
//!
//! Hooks run in the background after a successful replacement. Their result
//! is only logged; a failing hook never changes the replacement outcome.

use super::ReplaceReport;
use anyhow::{bail, Context};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

#[async_trait]
pub trait ReplacementHook: Send + Sync {
    fn name(&self) -> &str;

    async fn after_replace(&self, report: &ReplaceReport) -> anyhow::Result<()>;
}

/// Spawn every hook for `report` without waiting for them
pub fn dispatch(hooks: &[Arc<dyn ReplacementHook>], report: &ReplaceReport) {
    for hook in hooks {
        let hook = hook.clone();
        let report = report.clone();
        tokio::spawn(async move {
            match hook.after_replace(&report).await {
                Ok(()) => debug!("Hook {} finished for {}", hook.name(), report.name),
                Err(e) => warn!("Hook {} failed for {}: {:#}", hook.name(), report.name, e),
            }
        });
    }
}

/// Runs an external command with the image reference as its last argument
///
/// Typically a vulnerability scanner, e.g. `trivy image --quiet`.
#[derive(Debug, Clone)]
pub struct CommandHook {
    program: String,
    args: Vec<String>,
}

impl CommandHook {
    /// Parse a whitespace separated command line; `None` if it is empty
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl ReplacementHook for CommandHook {
    fn name(&self) -> &str {
        &self.program
    }

    async fn after_replace(&self, report: &ReplaceReport) -> anyhow::Result<()> {
        info!("Running {} for image {}", self.program, report.image);

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(&report.image)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to spawn {}", self.program))?;

        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        debug!(
            "{} output for {}: {}",
            self.program,
            report.image,
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }
}
