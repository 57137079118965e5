//! Bollard-backed container engine

#![allow(deprecated)]

use super::container::{clean_name, ContainerSummary, PortSummary};
use super::engine::{ContainerEngine, EngineError, Result};
use super::stats::{ContainerStats, PruneReport};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, ListContainersOptions, LogOutput,
    LogsOptions, PruneContainersOptions, RemoveContainerOptions, RenameContainerOptions,
    RestartContainerOptions, StartContainerOptions, StatsOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::EndpointSettings;
use bollard::network::ConnectNetworkOptions;
use bollard::Docker;
use dockdash_core::network::EndpointRequest;
use dockdash_core::{ContainerDescriptor, ContainerStatus, CreationSpec};
use futures_util::StreamExt;
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

impl From<bollard::errors::Error> for EngineError {
    fn from(err: bollard::errors::Error) -> Self {
        use bollard::errors::Error as Bollard;

        match &err {
            Bollard::DockerResponseServerError {
                status_code: 404,
                message,
            } => EngineError::NotFound(message.clone()),
            Bollard::DockerResponseServerError {
                status_code: 409,
                message,
            } => EngineError::Conflict(message.clone()),
            Bollard::DockerResponseServerError {
                status_code,
                message,
            } => EngineError::Api(format!("{} (status {})", message, status_code)),
            Bollard::IOError { .. }
            | Bollard::HyperLegacyError { .. }
            | Bollard::RequestTimeoutError => EngineError::Unavailable(err.to_string()),
            _ => EngineError::Api(err.to_string()),
        }
    }
}

/// 304 Not Modified: already in the requested state
fn is_not_modified(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 304,
            ..
        }
    )
}

/// Docker Engine API client
#[derive(Clone)]
pub struct BollardEngine {
    docker: Docker,
}

impl BollardEngine {
    /// Connect using `DOCKER_HOST`, falling back to the local socket
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_defaults()
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        Ok(Self { docker })
    }

    pub fn from_docker(docker: Docker) -> Self {
        Self { docker }
    }
}

impl std::fmt::Debug for BollardEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BollardEngine").finish_non_exhaustive()
    }
}

#[async_trait]
impl ContainerEngine for BollardEngine {
    async fn ping(&self) -> Result<()> {
        self.docker.ping().await?;
        Ok(())
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };

        let containers = self.docker.list_containers(Some(options)).await?;

        containers
            .iter()
            .map(|c| {
                let raw: RawSummary = serde_json::from_value(serde_json::to_value(c)?)?;
                Ok(raw.into())
            })
            .collect()
    }

    async fn inspect_container(&self, container: &str) -> Result<ContainerDescriptor> {
        debug!("Inspecting container: {}", container);

        let info = self
            .docker
            .inspect_container(container, None::<InspectContainerOptions>)
            .await?;

        Ok(ContainerDescriptor::from_inspect(serde_json::to_value(&info)?)?)
    }

    async fn rename_container(&self, container: &str, new_name: &str) -> Result<()> {
        debug!("Renaming container {} to {}", container, new_name);

        self.docker
            .rename_container(
                container,
                RenameContainerOptions {
                    name: new_name.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    async fn start_container(&self, container: &str) -> Result<()> {
        debug!("Starting container: {}", container);

        match self
            .docker
            .start_container(container, None::<StartContainerOptions<String>>)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_not_modified(&e) => {
                debug!("Container {} already running", container);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn stop_container(&self, container: &str, timeout_secs: i64) -> Result<()> {
        debug!("Stopping container: {}", container);

        let options = StopContainerOptions { t: timeout_secs };

        match self.docker.stop_container(container, Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_modified(&e) => {
                debug!("Container {} already stopped", container);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn restart_container(&self, container: &str, timeout_secs: i64) -> Result<()> {
        debug!("Restarting container: {}", container);

        let options = RestartContainerOptions {
            t: timeout_secs as isize,
        };
        self.docker
            .restart_container(container, Some(options))
            .await?;
        Ok(())
    }

    async fn remove_container(&self, container: &str, force: bool) -> Result<()> {
        debug!("Removing container: {} (force={})", container, force);

        // Volumes stay: the replacement may still be using them
        let options = RemoveContainerOptions {
            force,
            v: false,
            ..Default::default()
        };

        self.docker
            .remove_container(container, Some(options))
            .await?;
        Ok(())
    }

    async fn create_container(&self, spec: &CreationSpec) -> Result<String> {
        debug!("Creating container: {} from {}", spec.name, spec.image);

        let config: Config<String> = serde_json::from_value(spec.to_body()?)?;
        let options = CreateContainerOptions {
            name: spec.name.clone(),
            platform: None,
        };

        let response = self.docker.create_container(Some(options), config).await?;

        for warning in &response.warnings {
            warn!("Engine warning creating {}: {}", spec.name, warning);
        }
        debug!("Created container {} with id {}", spec.name, response.id);

        Ok(response.id)
    }

    async fn connect_network(
        &self,
        network: &str,
        container: &str,
        endpoint: &EndpointRequest,
    ) -> Result<()> {
        debug!("Connecting container {} to network {}", container, network);

        let endpoint_config: EndpointSettings =
            serde_json::from_value(serde_json::to_value(endpoint)?)?;
        let options = ConnectNetworkOptions {
            container: container.to_string(),
            endpoint_config,
        };

        self.docker.connect_network(network, options).await?;
        Ok(())
    }

    async fn image_id(&self, image: &str) -> Result<Option<String>> {
        match self.docker.inspect_image(image).await {
            Ok(inspect) => Ok(inspect.id.filter(|id| !id.is_empty())),
            Err(e) => match EngineError::from(e) {
                EngineError::NotFound(_) => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        info!("Pulling image: {}", image);

        let options = CreateImageOptions {
            from_image: image,
            ..Default::default()
        };

        let mut stream = self.docker.create_image(Some(options), None, None);

        while let Some(result) = stream.next().await {
            let progress = result?;
            if let Some(status) = progress.status {
                debug!("Pull {}: {}", image, status);
            }
        }

        info!("Pulled image: {}", image);
        Ok(())
    }

    async fn logs(&self, container: &str, tail: usize) -> Result<Vec<String>> {
        let options = LogsOptions::<String> {
            follow: false,
            stdout: true,
            stderr: true,
            tail: tail.to_string(),
            timestamps: false,
            ..Default::default()
        };

        let mut stream = self.docker.logs(container, Some(options));
        let mut lines = Vec::new();

        while let Some(chunk) = stream.next().await {
            let message = match chunk? {
                LogOutput::StdOut { message }
                | LogOutput::StdErr { message }
                | LogOutput::Console { message } => message,
                LogOutput::StdIn { .. } => continue,
            };
            lines.extend(
                String::from_utf8_lossy(&message)
                    .lines()
                    .map(|line| line.to_string()),
            );
        }

        let skip = lines.len().saturating_sub(tail);
        Ok(lines.split_off(skip))
    }

    async fn container_stats(&self, container: &str) -> Result<ContainerStats> {
        debug!("Getting stats for container: {}", container);

        let options = StatsOptions {
            stream: false,
            one_shot: false,
        };

        let mut stream = self.docker.stats(container, Some(options));

        match stream.next().await {
            Some(result) => ContainerStats::from_wire(serde_json::to_value(result?)?),
            None => Err(EngineError::InvalidResponse(format!(
                "No stats returned for {}",
                container
            ))),
        }
    }

    async fn prune_containers(&self) -> Result<PruneReport> {
        info!("Pruning stopped containers");

        let response = self
            .docker
            .prune_containers(None::<PruneContainersOptions<String>>)
            .await?;

        PruneReport::from_wire(serde_json::to_value(response)?)
    }
}

// The listing model changes shape across API versions, so it is read back
// from its wire form like the inspect document.

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawSummary {
    id: Option<String>,
    names: Option<Vec<String>>,
    image: Option<String>,
    created: Option<i64>,
    state: Option<String>,
    status: Option<String>,
    ports: Option<Vec<RawPort>>,
    labels: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawPort {
    private_port: Option<u16>,
    public_port: Option<u16>,
    #[serde(rename = "Type")]
    kind: Option<String>,
}

impl From<RawSummary> for ContainerSummary {
    fn from(raw: RawSummary) -> Self {
        ContainerSummary {
            id: raw.id.unwrap_or_default(),
            name: raw
                .names
                .and_then(|n| n.into_iter().next())
                .map(|n| clean_name(&n))
                .unwrap_or_default(),
            image: raw.image.unwrap_or_default(),
            status: raw
                .state
                .as_deref()
                .map(ContainerStatus::parse)
                .unwrap_or(ContainerStatus::Unknown),
            state_text: raw.status.unwrap_or_default(),
            created: raw.created.unwrap_or(0),
            ports: raw
                .ports
                .unwrap_or_default()
                .into_iter()
                .filter_map(|p| {
                    Some(PortSummary {
                        private_port: p.private_port?,
                        public_port: p.public_port,
                        protocol: p.kind.unwrap_or_else(|| "tcp".to_string()),
                    })
                })
                .collect(),
            labels: raw.labels.unwrap_or_default(),
        }
    }
}
