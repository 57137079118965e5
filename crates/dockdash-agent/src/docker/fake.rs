//! In-memory container engine for tests
//!
//! Containers are kept as inspect documents. Create turns the create body
//! back into an inspect document the way the engine does, so a replacement
//! can be read back and compared with the original.

use super::container::{ContainerSummary, PortSummary};
use super::engine::{ContainerEngine, EngineError, Result};
use super::stats::{ContainerStats, PruneReport};
use async_trait::async_trait;
use dockdash_core::network::{container_reference, EndpointRequest};
use dockdash_core::{short_id, ContainerDescriptor, ContainerStatus, CreationSpec};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Ping,
    Inspect,
    Rename,
    Start,
    Stop,
    Restart,
    Remove,
    Create,
    Connect,
    ImageId,
    Pull,
    Logs,
    Stats,
    Prune,
}

/// What happens when a container created from now on is started
#[derive(Debug, Clone)]
pub enum StartBehavior {
    Run,
    Crash { exit_code: i64, logs: Vec<String> },
    /// Never settles into running or exited
    Hang,
}

#[derive(Debug)]
struct Failure {
    op: Op,
    /// 1-based call number to fail on; `None` fails the next call
    call: Option<usize>,
    error: EngineError,
    sticky: bool,
}

#[derive(Debug)]
struct FakeContainer {
    inspect: Value,
    behavior: StartBehavior,
    logs: Vec<String>,
}

impl FakeContainer {
    fn id(&self) -> &str {
        self.inspect["Id"].as_str().unwrap_or_default()
    }

    fn name(&self) -> &str {
        self.inspect["Name"]
            .as_str()
            .unwrap_or_default()
            .trim_start_matches('/')
    }

    fn status(&self) -> ContainerStatus {
        ContainerStatus::parse(self.inspect["State"]["Status"].as_str().unwrap_or_default())
    }

    fn set_state(&mut self, status: &str, exit_code: i64) {
        self.inspect["State"] = json!({
            "Status": status,
            "Running": status == "running",
            "ExitCode": exit_code,
            "Error": "",
            "StartedAt": "2026-10-16T12:00:00Z",
        });
    }
}

#[derive(Debug, Default)]
struct FakeState {
    containers: Vec<FakeContainer>,
    images: BTreeMap<String, String>,
    pull_updates: BTreeMap<String, String>,
    failures: Vec<Failure>,
    calls: HashMap<Op, usize>,
    next_behavior: Option<StartBehavior>,
    next_id: u64,
}

impl FakeState {
    fn position(&self, reference: &str) -> Option<usize> {
        let reference = reference.trim_start_matches('/');
        self.containers
            .iter()
            .position(|c| c.id() == reference || c.name() == reference)
            .or_else(|| {
                self.containers
                    .iter()
                    .position(|c| reference.len() >= 4 && c.id().starts_with(reference))
            })
    }

    fn container(&mut self, reference: &str) -> Result<&mut FakeContainer> {
        let index = self
            .position(reference)
            .ok_or_else(|| EngineError::NotFound(format!("No such container: {}", reference)))?;
        Ok(&mut self.containers[index])
    }

    fn name_in_use(&self, name: &str) -> bool {
        self.containers.iter().any(|c| c.name() == name)
    }

    /// Count the call and return an injected failure, if one matches
    fn record(&mut self, op: Op) -> Result<()> {
        let count = {
            let entry = self.calls.entry(op).or_insert(0);
            *entry += 1;
            *entry
        };

        let matched = self
            .failures
            .iter()
            .position(|f| f.op == op && f.call.map_or(true, |n| n == count));

        match matched {
            Some(index) if self.failures[index].sticky => Err(self.failures[index].error.clone()),
            Some(index) => Err(self.failures.remove(index).error),
            None => Ok(()),
        }
    }

    fn generate_id(&mut self) -> String {
        self.next_id += 1;
        format!("{:012x}{:052x}", 0xc0ffee000000u64 + self.next_id, self.next_id)
    }
}

#[derive(Debug, Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Add a container from an inspect document, returning its ID
    pub fn insert(&self, mut inspect: Value) -> String {
        let mut state = self.lock();
        if inspect["Id"].as_str().is_none() {
            inspect["Id"] = json!(state.generate_id());
        }
        if let (Some(reference), Some(id)) = (inspect["Config"]["Image"].as_str(), inspect["Image"].as_str()) {
            state.images.insert(reference.to_string(), id.to_string());
        }
        let id = inspect["Id"].as_str().unwrap().to_string();
        state.containers.push(FakeContainer {
            inspect,
            behavior: StartBehavior::Run,
            logs: Vec::new(),
        });
        id
    }

    pub fn fail_next(&self, op: Op, error: EngineError) {
        self.lock().failures.push(Failure {
            op,
            call: None,
            error,
            sticky: false,
        });
    }

    /// Fail the `call`-th invocation of `op`, counted from engine creation
    pub fn fail_on_call(&self, op: Op, call: usize, error: EngineError) {
        self.lock().failures.push(Failure {
            op,
            call: Some(call),
            error,
            sticky: false,
        });
    }

    pub fn fail_always(&self, op: Op, error: EngineError) {
        self.lock().failures.push(Failure {
            op,
            call: None,
            error,
            sticky: true,
        });
    }

    /// Applies to every container created after this call
    pub fn on_start(&self, behavior: StartBehavior) {
        self.lock().next_behavior = Some(behavior);
    }

    /// Make a pull of `image` move its tag to `new_id`
    pub fn publish_image(&self, image: &str, new_id: &str) {
        self.lock()
            .pull_updates
            .insert(image.to_string(), new_id.to_string());
    }

    pub fn push_logs(&self, reference: &str, lines: &[&str]) {
        let mut state = self.lock();
        if let Ok(container) = state.container(reference) {
            container.logs.extend(lines.iter().map(|l| l.to_string()));
        }
    }

    pub fn calls(&self, op: Op) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .lock()
            .containers
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Current descriptor, bypassing failure injection
    pub fn descriptor(&self, reference: &str) -> Option<ContainerDescriptor> {
        let state = self.lock();
        let index = state.position(reference)?;
        ContainerDescriptor::from_inspect(state.containers[index].inspect.clone()).ok()
    }
}

/// Inspect document for a freshly created container
fn inspect_from_body(id: &str, name: &str, image_id: &str, mut body: Value) -> Value {
    let config = body.as_object_mut().expect("create body is an object");
    let host_config = config.remove("HostConfig").unwrap_or_else(|| json!({}));
    let networking = config.remove("NetworkingConfig");

    if !config.contains_key("Hostname") {
        config.insert("Hostname".to_string(), json!(short_id(id)));
    }

    let endpoint = |network: &str, request: &Value| {
        let ip = request["IPAMConfig"]["IPv4Address"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("172.18.0.{}", id.len() % 200 + 2));
        let mut aliases: Vec<Value> = request["Aliases"].as_array().cloned().unwrap_or_default();
        if network != "bridge" {
            aliases.push(json!(short_id(id)));
        }
        json!({
            "IPAMConfig": request.get("IPAMConfig").cloned().unwrap_or(Value::Null),
            "Aliases": aliases,
            "Links": request.get("Links").cloned().unwrap_or(Value::Null),
            "NetworkID": format!("{}-id", network),
            "IPAddress": ip,
        })
    };

    let mut networks = Map::new();
    if let Some(endpoints) = networking
        .as_ref()
        .and_then(|n| n["EndpointsConfig"].as_object())
    {
        for (network, request) in endpoints {
            networks.insert(network.clone(), endpoint(network, request));
        }
    } else {
        match host_config["NetworkMode"].as_str() {
            Some(mode) if container_reference(mode).is_some() => {}
            Some(mode) if mode != "default" => {
                networks.insert(mode.to_string(), endpoint(mode, &json!({})));
            }
            _ => {
                networks.insert("bridge".to_string(), endpoint("bridge", &json!({})));
            }
        }
    }

    json!({
        "Id": id,
        "Name": format!("/{}", name),
        "Image": image_id,
        "RestartCount": 0,
        "State": {"Status": "created", "Running": false, "ExitCode": 0, "Error": ""},
        "Config": body,
        "HostConfig": host_config,
        "NetworkSettings": {"Networks": networks},
    })
}

#[async_trait]
impl ContainerEngine for FakeEngine {
    async fn ping(&self) -> Result<()> {
        self.lock().record(Op::Ping)
    }

    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>> {
        let state = self.lock();
        Ok(state
            .containers
            .iter()
            .filter(|c| all || c.status() == ContainerStatus::Running)
            .map(|c| ContainerSummary {
                id: c.id().to_string(),
                name: c.name().to_string(),
                image: c.inspect["Config"]["Image"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string(),
                status: c.status(),
                state_text: c.status().to_string(),
                created: 0,
                ports: c.inspect["HostConfig"]["PortBindings"]
                    .as_object()
                    .map(|bindings| {
                        bindings
                            .keys()
                            .filter_map(|port| {
                                let (number, protocol) = port.split_once('/')?;
                                Some(PortSummary {
                                    private_port: number.parse().ok()?,
                                    public_port: None,
                                    protocol: protocol.to_string(),
                                })
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
                labels: BTreeMap::new(),
            })
            .collect())
    }

    async fn inspect_container(&self, container: &str) -> Result<ContainerDescriptor> {
        let mut state = self.lock();
        state.record(Op::Inspect)?;
        let inspect = state.container(container)?.inspect.clone();
        Ok(ContainerDescriptor::from_inspect(inspect)?)
    }

    async fn rename_container(&self, container: &str, new_name: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(Op::Rename)?;
        let index = state
            .position(container)
            .ok_or_else(|| EngineError::NotFound(format!("No such container: {}", container)))?;
        if state.name_in_use(new_name) {
            return Err(EngineError::Conflict(format!(
                "The container name \"/{}\" is already in use",
                new_name
            )));
        }
        state.containers[index].inspect["Name"] = json!(format!("/{}", new_name));
        Ok(())
    }

    async fn start_container(&self, container: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(Op::Start)?;
        let target = state.container(container)?;
        if target.status() == ContainerStatus::Running {
            return Ok(());
        }
        match target.behavior.clone() {
            StartBehavior::Run => target.set_state("running", 0),
            StartBehavior::Crash { exit_code, logs } => {
                target.set_state("exited", exit_code);
                target.logs = logs;
            }
            StartBehavior::Hang => target.set_state("restarting", 0),
        }
        Ok(())
    }

    async fn stop_container(&self, container: &str, _timeout_secs: i64) -> Result<()> {
        let mut state = self.lock();
        state.record(Op::Stop)?;
        let target = state.container(container)?;
        if matches!(
            target.status(),
            ContainerStatus::Running | ContainerStatus::Restarting | ContainerStatus::Paused
        ) {
            target.set_state("exited", 0);
        }
        Ok(())
    }

    async fn restart_container(&self, container: &str, _timeout_secs: i64) -> Result<()> {
        let mut state = self.lock();
        state.record(Op::Restart)?;
        state.container(container)?.set_state("running", 0);
        Ok(())
    }

    async fn remove_container(&self, container: &str, force: bool) -> Result<()> {
        let mut state = self.lock();
        state.record(Op::Remove)?;
        let index = state
            .position(container)
            .ok_or_else(|| EngineError::NotFound(format!("No such container: {}", container)))?;
        if !force && state.containers[index].status() == ContainerStatus::Running {
            return Err(EngineError::Conflict(
                "You cannot remove a running container".to_string(),
            ));
        }
        state.containers.remove(index);
        Ok(())
    }

    async fn create_container(&self, spec: &CreationSpec) -> Result<String> {
        let mut state = self.lock();
        state.record(Op::Create)?;

        if state.name_in_use(&spec.name) {
            return Err(EngineError::Conflict(format!(
                "The container name \"/{}\" is already in use",
                spec.name
            )));
        }
        if let Some(reference) = spec
            .host_config
            .network_mode
            .as_deref()
            .and_then(container_reference)
        {
            state.container(reference)?;
        }

        let id = state.generate_id();
        let image_id = match state.images.get(&spec.image) {
            Some(image_id) => image_id.clone(),
            None => {
                let image_id = format!("sha256:{}", id);
                state.images.insert(spec.image.clone(), image_id.clone());
                image_id
            }
        };

        let inspect = inspect_from_body(&id, &spec.name, &image_id, spec.to_body()?);
        let behavior = state.next_behavior.clone().unwrap_or(StartBehavior::Run);
        state.containers.push(FakeContainer {
            inspect,
            behavior,
            logs: Vec::new(),
        });
        Ok(id)
    }

    async fn connect_network(
        &self,
        network: &str,
        container: &str,
        endpoint: &EndpointRequest,
    ) -> Result<()> {
        let mut state = self.lock();
        state.record(Op::Connect)?;
        let target = state.container(container)?;
        let networks = &mut target.inspect["NetworkSettings"]["Networks"];
        if !networks[network].is_null() {
            return Err(EngineError::Conflict(format!(
                "endpoint with name {} already exists in network {}",
                container, network
            )));
        }
        networks[network] = json!({
            "IPAMConfig": serde_json::to_value(&endpoint.ipam)?,
            "Aliases": endpoint.aliases,
            "Links": endpoint.links,
            "NetworkID": format!("{}-id", network),
        });
        Ok(())
    }

    async fn image_id(&self, image: &str) -> Result<Option<String>> {
        let mut state = self.lock();
        state.record(Op::ImageId)?;
        Ok(state.images.get(image).cloned())
    }

    async fn pull_image(&self, image: &str) -> Result<()> {
        let mut state = self.lock();
        state.record(Op::Pull)?;
        if let Some(new_id) = state.pull_updates.get(image).cloned() {
            state.images.insert(image.to_string(), new_id);
        }
        Ok(())
    }

    async fn logs(&self, container: &str, tail: usize) -> Result<Vec<String>> {
        let mut state = self.lock();
        state.record(Op::Logs)?;
        let logs = &state.container(container)?.logs;
        Ok(logs[logs.len().saturating_sub(tail)..].to_vec())
    }

    /// Running containers use 64 MiB of a 512 MiB limit and 2.5% CPU
    async fn container_stats(&self, container: &str) -> Result<ContainerStats> {
        let mut state = self.lock();
        state.record(Op::Stats)?;
        if state.container(container)?.status() != ContainerStatus::Running {
            return Ok(ContainerStats::default());
        }
        Ok(ContainerStats {
            cpu_percent: 2.5,
            memory_usage: 64 << 20,
            memory_limit: 512 << 20,
            memory_percent: 12.5,
            ..ContainerStats::default()
        })
    }

    async fn prune_containers(&self) -> Result<PruneReport> {
        let mut state = self.lock();
        state.record(Op::Prune)?;
        let (stopped, kept): (Vec<_>, Vec<_>) = state.containers.drain(..).partition(|c| {
            matches!(
                c.status(),
                ContainerStatus::Created | ContainerStatus::Exited | ContainerStatus::Dead
            )
        });
        state.containers = kept;
        Ok(PruneReport {
            containers_deleted: stopped.iter().map(|c| c.id().to_string()).collect(),
            space_reclaimed: 0,
        })
    }
}

/// The running `web` container: 8080->80, `FOO=bar`, `appnet` at 10.0.0.5
pub fn web_inspect() -> Value {
    json!({
        "Id": "4f66ad9a0b2e8f1c3d5e7a9b0c1d2e3f4a5b6c7d8e9f0a1b2c3d4e5f6a7b8c9d",
        "Name": "/web",
        "Image": "sha256:1111aaaa2222bbbb",
        "State": {"Status": "running", "Running": true, "ExitCode": 0},
        "Config": {
            "Hostname": "4f66ad9a0b2e",
            "Env": ["FOO=bar"],
            "Cmd": ["nginx", "-g", "daemon off;"],
            "Image": "nginx:1.27",
            "ExposedPorts": {"80/tcp": {}},
            "Labels": {"tier": "frontend"}
        },
        "HostConfig": {
            "Binds": ["/srv/www:/usr/share/nginx/html:ro"],
            "NetworkMode": "appnet",
            "PortBindings": {"80/tcp": [{"HostIp": "", "HostPort": "8080"}]},
            "RestartPolicy": {"Name": "unless-stopped", "MaximumRetryCount": 0}
        },
        "NetworkSettings": {
            "Networks": {
                "appnet": {
                    "IPAMConfig": {"IPv4Address": "10.0.0.5"},
                    "Aliases": ["web", "4f66ad9a0b2e"],
                    "NetworkID": "appnet-id",
                    "IPAddress": "10.0.0.5"
                }
            }
        }
    })
}
