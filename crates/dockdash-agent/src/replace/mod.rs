//! In-place container replacement
//!
//! A replacement swaps a live container for a freshly created copy of it:
//!
//! 1. rename the original to its rollback name
//! 2. stop it if it was running
//! 3. create the copy under the original name, attach its networks
//! 4. start the copy and verify it stays up (only if the original ran)
//! 5. remove the original
//!
//! Any failure after step 1 rolls the host back to the original container,
//! under its original name and in its original run state.

mod attempt;
mod error;
mod guard;
mod hooks;
mod liveness;

pub use attempt::{original_name, rollback_name, ReplacementAttempt};
pub use error::{ReplaceError, VerifyFailure, VerifyKind};
pub use guard::{ReplaceGuard, ReplaceGuards};
pub use hooks::{CommandHook, ReplacementHook};
pub use liveness::verify_running;

use crate::docker::image::refresh_image;
use crate::docker::network::{connect_secondaries, find_dependents, resolve_container_mode};
use crate::docker::ContainerEngine;
use dockdash_core::{short_id, ContainerDescriptor, CreationSpec, NetworkPlan, ReplaceConfig};
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// What a successful replacement did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceReport {
    pub container_id: String,
    pub name: String,
    pub image: String,
    pub pulled_new_image: bool,
    pub started: bool,
    pub warnings: Vec<String>,
    /// Containers sharing its network stack that were recreated with it
    pub dependents: Vec<String>,
}

/// Caller-facing result of a replacement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Short ID of the replacement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub pulled_new_image: bool,
    pub started: bool,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub recreated_dependents: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The rollback did not complete; the host needs a look
    pub manual_intervention_required: bool,
}

impl ReplaceOutcome {
    /// A replacement that never got to run
    pub fn failed(error: String) -> Self {
        ReplaceOutcome {
            success: false,
            message: None,
            container_id: None,
            image: None,
            pulled_new_image: false,
            started: false,
            warnings: Vec::new(),
            recreated_dependents: Vec::new(),
            error: Some(error),
            manual_intervention_required: false,
        }
    }
}

impl From<&Result<ReplaceReport, ReplaceError>> for ReplaceOutcome {
    fn from(result: &Result<ReplaceReport, ReplaceError>) -> Self {
        match result {
            Ok(report) => ReplaceOutcome {
                success: true,
                message: Some(format!("Container {} recreated successfully", report.name)),
                container_id: Some(short_id(&report.container_id).to_string()),
                image: Some(report.image.clone()),
                pulled_new_image: report.pulled_new_image,
                started: report.started,
                warnings: report.warnings.clone(),
                recreated_dependents: report.dependents.clone(),
                error: None,
                manual_intervention_required: false,
            },
            Err(e) => ReplaceOutcome {
                manual_intervention_required: e.requires_manual_intervention(),
                ..ReplaceOutcome::failed(e.to_string())
            },
        }
    }
}

/// Replacement orchestrator
#[derive(Clone)]
pub struct Replacer {
    engine: Arc<dyn ContainerEngine>,
    config: ReplaceConfig,
    hooks: Vec<Arc<dyn ReplacementHook>>,
    /// Claimed for dependents recreated alongside a replacement
    guards: Option<ReplaceGuards>,
}

impl Replacer {
    pub fn new(engine: Arc<dyn ContainerEngine>, config: ReplaceConfig) -> Self {
        Self {
            engine,
            config,
            hooks: Vec::new(),
            guards: None,
        }
    }

    pub fn with_guards(mut self, guards: ReplaceGuards) -> Self {
        self.guards = Some(guards);
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn ReplacementHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn config(&self) -> &ReplaceConfig {
        &self.config
    }

    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Replace `container` (name or ID) and report the outcome
    ///
    /// Same-name calls must be serialized by the caller, see [`ReplaceGuards`].
    pub async fn replace(&self, container: &str, pull_latest: bool) -> ReplaceOutcome {
        ReplaceOutcome::from(&self.run(container, pull_latest).await)
    }

    /// Like [`Replacer::replace`], keeping the typed error
    pub async fn run(
        &self,
        container: &str,
        pull_latest: bool,
    ) -> Result<ReplaceReport, ReplaceError> {
        let result = self.try_replace(container, pull_latest).await;

        match &result {
            Ok(report) => hooks::dispatch(&self.hooks, report),
            Err(e) if e.requires_manual_intervention() => {
                error!("Replacement of {} left the host inconsistent: {}", container, e)
            }
            Err(e) => error!("Replacement of {} failed: {}", container, e),
        }

        result
    }

    /// Replace `container`, then recreate every container that shares its
    /// network stack so none is left pointing at the removed original
    pub async fn try_replace(
        &self,
        container: &str,
        pull_latest: bool,
    ) -> Result<ReplaceReport, ReplaceError> {
        let old = self.read(container).await?;

        let mut scan_warnings = Vec::new();
        let dependents = match find_dependents(self.engine.as_ref(), &old).await {
            Ok(dependents) => dependents,
            Err(e) => {
                let message = format!(
                    "Could not look for containers sharing the network of {}: {}",
                    old.name, e
                );
                warn!("{}", message);
                scan_warnings.push(message);
                Vec::new()
            }
        };

        let mut report = self.replace_one(old, pull_latest, None).await?;
        scan_warnings.append(&mut report.warnings);
        report.warnings = scan_warnings;

        for dependent in dependents {
            self.replace_dependent(dependent, &mut report).await;
        }

        Ok(report)
    }

    /// Recreate a container whose `container:` mode pointed at the one just
    /// replaced; failures only add warnings
    async fn replace_dependent(&self, dependent: ContainerDescriptor, report: &mut ReplaceReport) {
        let name = dependent.name.clone();

        let _guard = match &self.guards {
            Some(guards) => match guards.try_acquire(&name) {
                Some(guard) => Some(guard),
                None => {
                    report.warnings.push(format!(
                        "Container {} shares the network of {} but is being replaced already",
                        name, report.name
                    ));
                    return;
                }
            },
            None => None,
        };

        info!("Recreating {} to follow {}", name, report.name);
        match self.replace_one(dependent, false, Some(&report.name)).await {
            Ok(recreated) => {
                report.warnings.extend(recreated.warnings);
                report.dependents.push(name);
            }
            Err(e) => {
                let message = format!(
                    "Container {} shares the network of {} and could not be recreated: {}",
                    name, report.name, e
                );
                warn!("{}", message);
                report.warnings.push(message);
            }
        }
    }

    /// One replacement; `follow` names the container a `container:` mode
    /// must point at instead of resolving the current reference
    async fn replace_one(
        &self,
        mut old: ContainerDescriptor,
        pull_latest: bool,
        follow: Option<&str>,
    ) -> Result<ReplaceReport, ReplaceError> {
        let engine = self.engine.as_ref();

        let image = old
            .image_reference()
            .ok_or_else(|| ReplaceError::MissingImage(old.name.clone()))?
            .to_string();
        let mut warnings = Vec::new();

        // Pulled before the rename so a slow registry does not extend downtime
        let pulled_new_image = if pull_latest {
            let current_id = Some(old.image_id.as_str()).filter(|id| !id.is_empty());
            let refresh = refresh_image(engine, &image, current_id).await;
            warnings.extend(refresh.warning);

            // The pull may have taken a while
            old = self.read(&old.id).await?;
            refresh.pulled_new
        } else {
            false
        };

        // Resolved before anything is touched; an unresolvable reference
        // could never be recreated
        let mut plan = NetworkPlan::from_descriptor(&old);
        match follow {
            Some(target) => plan.rewrite_container_mode(target),
            None => {
                if let Err(source) = resolve_container_mode(engine, &mut plan).await {
                    return Err(ReplaceError::NetworkModeUnresolved {
                        reference: plan.container_reference().unwrap_or_default().to_string(),
                        source,
                    });
                }
            }
        }

        info!(
            "Replacing container {} ({}) from {}",
            old.name,
            old.short_id(),
            image
        );

        let mut attempt = ReplacementAttempt::new(&old);
        attempt.rename_old(engine).await?;

        if let Err(cause) = self.swap(&mut attempt, &old, &plan, &mut warnings).await {
            return Err(attempt.rollback(engine, cause).await);
        }

        let new_id = attempt.new_id.clone().unwrap_or_default();

        if let Err(e) = engine.remove_container(&attempt.old_id, true).await {
            let message = format!(
                "Failed to remove original container {}: {}",
                attempt.rollback_name, e
            );
            warn!("{}", message);
            warnings.push(message);
        }

        info!(
            "Replaced container {} ({} -> {})",
            attempt.original_name,
            short_id(&attempt.old_id),
            short_id(&new_id)
        );

        Ok(ReplaceReport {
            container_id: new_id,
            name: attempt.original_name,
            image,
            pulled_new_image,
            started: attempt.started,
            warnings,
            dependents: Vec::new(),
        })
    }

    async fn read(&self, container: &str) -> Result<ContainerDescriptor, ReplaceError> {
        self.engine
            .inspect_container(container)
            .await
            .map_err(|e| ReplaceError::from_lookup(container, e))
    }

    /// Steps after the rename; any error here is rolled back by the caller
    async fn swap(
        &self,
        attempt: &mut ReplacementAttempt,
        old: &ContainerDescriptor,
        plan: &NetworkPlan,
        warnings: &mut Vec<String>,
    ) -> Result<(), ReplaceError> {
        let engine = self.engine.as_ref();

        if attempt.was_running {
            engine
                .stop_container(&old.id, self.config.stop_timeout_secs())
                .await
                .map_err(ReplaceError::StopFailed)?;
            info!("Stopped {}", attempt.rollback_name);
        }

        let spec = CreationSpec::from_descriptor(old, plan)
            .ok_or_else(|| ReplaceError::MissingImage(old.name.clone()))?;

        let new_id = engine
            .create_container(&spec)
            .await
            .map_err(ReplaceError::CreateFailed)?;
        attempt.new_id = Some(new_id.clone());
        info!("Created {} ({})", spec.name, short_id(&new_id));

        warnings.extend(connect_secondaries(engine, &new_id, plan).await);

        if attempt.was_running {
            engine
                .start_container(&new_id)
                .await
                .map_err(ReplaceError::StartFailed)?;
            attempt.started = true;

            verify_running(engine, &new_id, &self.config)
                .await
                .map_err(ReplaceError::VerifyFailed)?;
            info!("Verified {} is running", spec.name);
        }

        Ok(())
    }
}

impl std::fmt::Debug for Replacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replacer")
            .field("config", &self.config)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}
