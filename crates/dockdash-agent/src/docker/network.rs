//! Network resolution against the live engine

use super::engine::{ContainerEngine, EngineError};
use dockdash_core::network::container_reference;
use dockdash_core::{ContainerDescriptor, NetworkPlan};
use tracing::{debug, warn};

/// Point a `container:<ref>` network mode at the referenced container's
/// current name, so the reference survives that container being replaced
///
/// On error the mode is left as it was.
pub async fn resolve_container_mode(
    engine: &dyn ContainerEngine,
    plan: &mut NetworkPlan,
) -> Result<(), EngineError> {
    let Some(reference) = plan.container_reference().map(str::to_string) else {
        return Ok(());
    };

    let target = engine.inspect_container(&reference).await?;
    debug!(
        "Resolved network mode container:{} to container:{}",
        reference, target.name
    );
    plan.rewrite_container_mode(&target.name);
    Ok(())
}

/// Whether a `container:` reference points at `target`
fn references(reference: &str, target: &ContainerDescriptor) -> bool {
    reference.trim_start_matches('/') == target.name || target.id.starts_with(reference)
}

/// Containers that share the network stack of `target` through a
/// `container:<id or name>` mode
pub async fn find_dependents(
    engine: &dyn ContainerEngine,
    target: &ContainerDescriptor,
) -> Result<Vec<ContainerDescriptor>, EngineError> {
    let mut dependents = Vec::new();

    for summary in engine.list_containers(true).await? {
        if summary.id == target.id {
            continue;
        }
        let candidate = match engine.inspect_container(&summary.id).await {
            Ok(candidate) => candidate,
            // Removed since the listing
            Err(EngineError::NotFound(_)) => continue,
            Err(e) => return Err(e),
        };
        let shares_stack = candidate
            .host
            .network_mode
            .as_deref()
            .and_then(container_reference)
            .is_some_and(|reference| references(reference, target));
        if shares_stack {
            debug!(
                "Container {} shares the network stack of {}",
                candidate.name, target.name
            );
            dependents.push(candidate);
        }
    }

    Ok(dependents)
}

/// Connect `container` to every secondary network of the plan (best-effort)
///
/// Returns one warning per network that could not be attached.
pub async fn connect_secondaries(
    engine: &dyn ContainerEngine,
    container: &str,
    plan: &NetworkPlan,
) -> Vec<String> {
    let mut warnings = Vec::new();

    for attachment in &plan.secondaries {
        debug!(
            "Connecting container {} to network {}",
            container, attachment.network
        );
        if let Err(e) = engine
            .connect_network(&attachment.network, container, &attachment.endpoint)
            .await
        {
            let message = format!(
                "Failed to connect to network {}: {}",
                attachment.network, e
            );
            warn!("Container {}: {}", container, message);
            warnings.push(message);
        }
    }

    warnings
}
