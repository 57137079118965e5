//! Liveness verification of a freshly started container

use super::error::{VerifyFailure, VerifyKind};
use crate::docker::ContainerEngine;
use dockdash_core::{ContainerDescriptor, ContainerStatus, ReplaceConfig};
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Poll `container` until it is running, has stopped, or the timeout passes
///
/// The first read happens one interval after the call so a process that
/// dies during startup is not mistaken for a running one. Read errors are
/// treated as transient and retried until the deadline.
pub async fn verify_running(
    engine: &dyn ContainerEngine,
    container: &str,
    config: &ReplaceConfig,
) -> Result<(), VerifyFailure> {
    let deadline = Instant::now() + config.verify_timeout;
    let mut last_seen: Option<ContainerDescriptor> = None;

    loop {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep(config.verify_interval.min(deadline - now)).await;

        match engine.inspect_container(container).await {
            Ok(descriptor) if descriptor.is_running() => {
                debug!("Container {} is running", container);
                return Ok(());
            }
            Ok(descriptor) if descriptor.status().is_terminal() => {
                let kind = VerifyKind::Crashed;
                return Err(failure(engine, container, kind, Some(descriptor), config).await);
            }
            Ok(descriptor) => {
                debug!(
                    "Container {} is {}, waiting",
                    container,
                    descriptor.status()
                );
                last_seen = Some(descriptor);
            }
            Err(e) => {
                debug!("Transient error reading container {}: {}", container, e);
            }
        }
    }

    Err(failure(engine, container, VerifyKind::TimedOut, last_seen, config).await)
}

async fn failure(
    engine: &dyn ContainerEngine,
    container: &str,
    kind: VerifyKind,
    descriptor: Option<ContainerDescriptor>,
    config: &ReplaceConfig,
) -> VerifyFailure {
    let logs = match engine.logs(container, config.log_tail_lines).await {
        Ok(lines) => lines,
        Err(e) => {
            warn!("Could not read logs of container {}: {}", container, e);
            Vec::new()
        }
    };

    let (status, exit_code, error) = match descriptor {
        Some(d) => (d.state.status, d.state.exit_code, d.state.error),
        None => (ContainerStatus::Unknown, None, None),
    };

    VerifyFailure {
        kind,
        status,
        exit_code,
        error,
        timeout: config.verify_timeout,
        logs,
    }
}
