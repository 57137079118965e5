//! Container descriptors
//!
//! A [`ContainerDescriptor`] is a point-in-time, strongly typed read of one
//! container, parsed from the inspect JSON the engine reports. Engines emit
//! `null` for most unset fields, so every wire field is optional and the
//! conversion decides what "present" means.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Length of the short container ID engines display
pub const SHORT_ID_LEN: usize = 12;

/// Short form of an engine-assigned container or image ID
pub fn short_id(id: &str) -> &str {
    let id = id.strip_prefix("sha256:").unwrap_or(id);
    id.get(..SHORT_ID_LEN).unwrap_or(id)
}

/// Lifecycle status reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Created,
    Running,
    Paused,
    Restarting,
    Removing,
    Exited,
    Dead,
    Unknown,
}

impl ContainerStatus {
    pub fn parse(status: &str) -> Self {
        match status.to_ascii_lowercase().as_str() {
            "created" => Self::Created,
            "running" => Self::Running,
            "paused" => Self::Paused,
            "restarting" => Self::Restarting,
            "removing" => Self::Removing,
            "exited" => Self::Exited,
            "dead" => Self::Dead,
            _ => Self::Unknown,
        }
    }

    /// The container stopped and will not come back without intervention
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Exited | Self::Dead)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Restarting => "restarting",
            Self::Removing => "removing",
            Self::Exited => "exited",
            Self::Dead => "dead",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortBinding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RestartPolicy {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub maximum_retry_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceMapping {
    #[serde(default)]
    pub path_on_host: String,
    #[serde(default)]
    pub path_in_container: String,
    #[serde(default)]
    pub cgroup_permissions: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Ulimit {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub soft: i64,
    #[serde(default)]
    pub hard: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LogConfig {
    #[serde(rename = "Type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
}

/// A `--mount` style mount from the host config (binds are kept separately)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Mount {
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub target: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub read_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consistency: Option<String>,
    // Option shapes vary by mount type and engine version; passed through as is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_options: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmpfs_options: Option<Value>,
}

/// A `--gpus` style request for host devices
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    /// `-1` requests every device
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<i64>,
    #[serde(rename = "DeviceIDs", default, skip_serializing_if = "Option::is_none")]
    pub device_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Vec<Vec<String>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
}

/// Healthcheck durations are nanoseconds, as on the wire
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Healthcheck {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub test: Vec<String>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub interval: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub timeout: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub retries: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub start_period: i64,
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

/// A host bind parsed from a `source:target[:mode]` spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindMount {
    pub source: String,
    pub target: String,
    pub mode: Option<String>,
}

impl BindMount {
    /// Parse a bind spec
    ///
    /// The last segment is a mode only if every comma-separated option in it
    /// is a known bind option, so Windows drive letters in the source
    /// (`C:\data:/data`) still resolve the right target.
    pub fn parse(spec: &str) -> Option<Self> {
        let parts: Vec<&str> = spec.split(':').collect();
        if parts.len() < 2 {
            return None;
        }

        let last = parts[parts.len() - 1];
        let (source, target, mode) = if parts.len() >= 3 && is_bind_mode(last) {
            (
                parts[..parts.len() - 2].join(":"),
                parts[parts.len() - 2],
                Some(last.to_string()),
            )
        } else {
            (parts[..parts.len() - 1].join(":"), last, None)
        };

        if source.is_empty() || target.is_empty() {
            return None;
        }

        Some(Self {
            source,
            target: target.to_string(),
            mode,
        })
    }
}

fn is_bind_mode(segment: &str) -> bool {
    const OPTIONS: &[&str] = &[
        "ro", "rw", "z", "Z", "shared", "rshared", "slave", "rslave", "private", "rprivate",
        "nocopy", "consistent", "cached", "delegated",
    ];
    !segment.is_empty() && segment.split(',').all(|opt| OPTIONS.contains(&opt))
}

/// Runtime state details, mainly used for failure diagnostics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerState {
    pub status: ContainerStatus,
    pub exit_code: Option<i64>,
    pub error: Option<String>,
    pub oom_killed: bool,
    pub restart_count: i64,
    pub started_at: Option<String>,
    pub health: Option<String>,
}

/// Per-network endpoint settings of an attached network
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EndpointConfig {
    pub network_id: Option<String>,
    pub ip_address: Option<String>,
    pub ipv6_address: Option<String>,
    /// Statically requested addresses (IPAM config), as opposed to assigned ones
    pub static_ipv4: Option<String>,
    pub static_ipv6: Option<String>,
    pub aliases: Vec<String>,
    pub links: Vec<String>,
}

/// Host-level settings of a container
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HostSettings {
    pub binds: Vec<String>,
    pub bind_mounts: Vec<BindMount>,
    pub mounts: Vec<Mount>,
    /// Containers whose volumes are mounted too (`name[:ro|rw]`)
    pub volumes_from: Vec<String>,
    pub network_mode: Option<String>,
    pub port_bindings: BTreeMap<String, Vec<PortBinding>>,
    pub restart_policy: Option<RestartPolicy>,
    pub auto_remove: bool,
    pub privileged: bool,
    pub readonly_rootfs: bool,
    pub init: Option<bool>,
    pub cap_add: Vec<String>,
    pub cap_drop: Vec<String>,
    pub devices: Vec<DeviceMapping>,
    pub dns: Vec<String>,
    pub dns_options: Vec<String>,
    pub dns_search: Vec<String>,
    pub extra_hosts: Vec<String>,
    pub links: Vec<String>,
    pub security_opt: Vec<String>,
    pub tmpfs: BTreeMap<String, String>,
    pub sysctls: BTreeMap<String, String>,
    pub group_add: Vec<String>,
    pub device_requests: Vec<DeviceRequest>,
    pub runtime: Option<String>,
    pub cgroup_parent: Option<String>,
    pub ipc_mode: Option<String>,
    pub pid_mode: Option<String>,
    pub userns_mode: Option<String>,
    pub log_config: Option<LogConfig>,
    pub shm_size: Option<i64>,
    pub ulimits: Vec<Ulimit>,
    pub memory: Option<i64>,
    pub memory_reservation: Option<i64>,
    /// `-1` is unlimited swap
    pub memory_swap: Option<i64>,
    pub cpu_shares: Option<i64>,
    pub nano_cpus: Option<i64>,
    pub cpu_quota: Option<i64>,
    pub cpu_period: Option<i64>,
    pub cpuset_cpus: Option<String>,
    pub cpuset_mems: Option<String>,
    pub pids_limit: Option<i64>,
}

/// Immutable snapshot of a container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerDescriptor {
    pub id: String,
    pub name: String,
    pub state: ContainerState,
    /// Image reference the container was created from (`nginx:1.27`)
    pub image: String,
    /// Resolved image ID (`sha256:...`)
    pub image_id: String,
    pub command: Vec<String>,
    pub entrypoint: Vec<String>,
    /// `KEY=VALUE` entries keyed by name; a bare `KEY` has no value
    pub env: BTreeMap<String, Option<String>>,
    pub working_dir: Option<String>,
    pub user: Option<String>,
    pub hostname: Option<String>,
    pub domainname: Option<String>,
    pub tty: bool,
    pub open_stdin: bool,
    pub stop_signal: Option<String>,
    pub healthcheck: Option<Healthcheck>,
    pub labels: BTreeMap<String, String>,
    pub exposed_ports: BTreeSet<String>,
    pub volumes: BTreeSet<String>,
    pub host: HostSettings,
    pub networks: BTreeMap<String, EndpointConfig>,
}

impl ContainerDescriptor {
    /// Parse the engine's container inspect JSON
    pub fn from_inspect(value: Value) -> Result<Self> {
        let raw: RawInspect = serde_json::from_value(value)?;
        Self::try_from(raw)
    }

    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }

    pub fn status(&self) -> ContainerStatus {
        self.state.status
    }

    pub fn is_running(&self) -> bool {
        self.state.status == ContainerStatus::Running
    }

    /// Reference to create a replacement from: the configured image, or the
    /// image ID when the engine lost the reference (e.g. the tag moved)
    pub fn image_reference(&self) -> Option<&str> {
        [self.image.as_str(), self.image_id.as_str()]
            .into_iter()
            .find(|r| !r.is_empty())
    }

    /// Environment rendered back to the engine's `KEY=VALUE` list form
    pub fn env_list(&self) -> Vec<String> {
        render_env(&self.env)
    }
}

pub(crate) fn render_env(env: &BTreeMap<String, Option<String>>) -> Vec<String> {
    env.iter()
        .map(|(key, value)| match value {
            Some(value) => format!("{}={}", key, value),
            None => key.clone(),
        })
        .collect()
}

fn parse_env(entries: Vec<String>) -> BTreeMap<String, Option<String>> {
    entries
        .into_iter()
        .filter(|e| !e.is_empty())
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => (key.to_string(), Some(value.to_string())),
            None => (entry, None),
        })
        .collect()
}

/// Empty strings are "unset" on the wire
fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn positive(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v > 0)
}

fn nonzero(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v != 0)
}

impl TryFrom<RawInspect> for ContainerDescriptor {
    type Error = Error;

    fn try_from(raw: RawInspect) -> Result<Self> {
        let id = present(raw.id)
            .ok_or_else(|| Error::InvalidDescriptor("missing container id".to_string()))?;
        let name = raw
            .name
            .unwrap_or_default()
            .trim_start_matches('/')
            .to_string();

        let state = raw.state.unwrap_or_default();
        let config = raw.config.unwrap_or_default();
        let host = raw.host_config.unwrap_or_default();
        let settings = raw.network_settings.unwrap_or_default();

        let status = state
            .status
            .as_deref()
            .map(ContainerStatus::parse)
            .or_else(|| match state.running {
                Some(true) => Some(ContainerStatus::Running),
                _ => None,
            })
            .unwrap_or(ContainerStatus::Unknown);

        let binds = host.binds.unwrap_or_default();
        let bind_mounts = binds.iter().filter_map(|b| BindMount::parse(b)).collect();

        let port_bindings = host
            .port_bindings
            .unwrap_or_default()
            .into_iter()
            .map(|(port, bindings)| (port, bindings.unwrap_or_default()))
            .collect();

        let restart_policy = host.restart_policy.filter(|p| !p.name.is_empty());

        let networks = settings
            .networks
            .unwrap_or_default()
            .into_iter()
            .map(|(name, endpoint)| {
                let ipam = endpoint.ipam_config.unwrap_or_default();
                (
                    name,
                    EndpointConfig {
                        network_id: present(endpoint.network_id),
                        ip_address: present(endpoint.ip_address),
                        ipv6_address: present(endpoint.global_ipv6_address),
                        static_ipv4: present(ipam.ipv4_address),
                        static_ipv6: present(ipam.ipv6_address),
                        aliases: endpoint.aliases.unwrap_or_default(),
                        links: endpoint.links.unwrap_or_default(),
                    },
                )
            })
            .collect();

        Ok(Self {
            id,
            name,
            state: ContainerState {
                status,
                exit_code: state.exit_code,
                error: present(state.error),
                oom_killed: state.oom_killed.unwrap_or(false),
                restart_count: raw.restart_count.unwrap_or(0),
                started_at: present(state.started_at),
                health: state.health.and_then(|h| present(h.status)),
            },
            image: config.image.unwrap_or_default(),
            image_id: raw.image.unwrap_or_default(),
            command: config.cmd.unwrap_or_default(),
            entrypoint: config.entrypoint.unwrap_or_default(),
            env: parse_env(config.env.unwrap_or_default()),
            working_dir: present(config.working_dir),
            user: present(config.user),
            hostname: present(config.hostname),
            domainname: present(config.domainname),
            tty: config.tty.unwrap_or(false),
            open_stdin: config.open_stdin.unwrap_or(false),
            stop_signal: present(config.stop_signal),
            healthcheck: config.healthcheck.filter(|h| !h.test.is_empty()),
            labels: config.labels.unwrap_or_default(),
            exposed_ports: config.exposed_ports.map(KeySet::into_set).unwrap_or_default(),
            volumes: config.volumes.map(KeySet::into_set).unwrap_or_default(),
            host: HostSettings {
                binds,
                bind_mounts,
                mounts: host.mounts.unwrap_or_default(),
                volumes_from: host.volumes_from.unwrap_or_default(),
                network_mode: present(host.network_mode),
                port_bindings,
                restart_policy,
                auto_remove: host.auto_remove.unwrap_or(false),
                privileged: host.privileged.unwrap_or(false),
                readonly_rootfs: host.readonly_rootfs.unwrap_or(false),
                init: host.init,
                cap_add: host.cap_add.unwrap_or_default(),
                cap_drop: host.cap_drop.unwrap_or_default(),
                devices: host.devices.unwrap_or_default(),
                dns: host.dns.unwrap_or_default(),
                dns_options: host.dns_options.unwrap_or_default(),
                dns_search: host.dns_search.unwrap_or_default(),
                extra_hosts: host.extra_hosts.unwrap_or_default(),
                links: host.links.unwrap_or_default(),
                security_opt: host.security_opt.unwrap_or_default(),
                tmpfs: host.tmpfs.unwrap_or_default(),
                sysctls: host.sysctls.unwrap_or_default(),
                group_add: host.group_add.unwrap_or_default(),
                device_requests: host.device_requests.unwrap_or_default(),
                runtime: present(host.runtime),
                cgroup_parent: present(host.cgroup_parent),
                ipc_mode: present(host.ipc_mode),
                pid_mode: present(host.pid_mode),
                userns_mode: present(host.userns_mode),
                log_config: host.log_config.filter(|l| !l.kind.is_empty()),
                shm_size: positive(host.shm_size),
                ulimits: host.ulimits.unwrap_or_default(),
                memory: positive(host.memory),
                memory_reservation: positive(host.memory_reservation),
                memory_swap: nonzero(host.memory_swap),
                cpu_shares: positive(host.cpu_shares),
                nano_cpus: positive(host.nano_cpus),
                cpu_quota: nonzero(host.cpu_quota),
                cpu_period: positive(host.cpu_period),
                cpuset_cpus: present(host.cpuset_cpus),
                cpuset_mems: present(host.cpuset_mems),
                pids_limit: positive(host.pids_limit),
            },
            networks,
        })
    }
}

// Wire shapes of the inspect document. Field names follow the engine API.

/// `ExposedPorts`/`Volumes` are objects with empty values on the wire, but
/// some client libraries re-serialize them as plain lists
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeySet {
    Map(BTreeMap<String, Value>),
    List(Vec<String>),
}

impl KeySet {
    fn into_set(self) -> BTreeSet<String> {
        match self {
            Self::Map(map) => map.into_keys().collect(),
            Self::List(list) => list.into_iter().collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawInspect {
    id: Option<String>,
    name: Option<String>,
    image: Option<String>,
    restart_count: Option<i64>,
    state: Option<RawState>,
    config: Option<RawConfig>,
    host_config: Option<RawHostConfig>,
    network_settings: Option<RawNetworkSettings>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawState {
    status: Option<String>,
    running: Option<bool>,
    exit_code: Option<i64>,
    error: Option<String>,
    #[serde(rename = "OOMKilled")]
    oom_killed: Option<bool>,
    started_at: Option<String>,
    health: Option<RawHealth>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawHealth {
    status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawConfig {
    hostname: Option<String>,
    domainname: Option<String>,
    user: Option<String>,
    tty: Option<bool>,
    open_stdin: Option<bool>,
    env: Option<Vec<String>>,
    cmd: Option<Vec<String>>,
    entrypoint: Option<Vec<String>>,
    image: Option<String>,
    working_dir: Option<String>,
    labels: Option<BTreeMap<String, String>>,
    exposed_ports: Option<KeySet>,
    volumes: Option<KeySet>,
    stop_signal: Option<String>,
    healthcheck: Option<Healthcheck>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawHostConfig {
    binds: Option<Vec<String>>,
    mounts: Option<Vec<Mount>>,
    volumes_from: Option<Vec<String>>,
    network_mode: Option<String>,
    port_bindings: Option<BTreeMap<String, Option<Vec<PortBinding>>>>,
    restart_policy: Option<RestartPolicy>,
    auto_remove: Option<bool>,
    privileged: Option<bool>,
    readonly_rootfs: Option<bool>,
    init: Option<bool>,
    cap_add: Option<Vec<String>>,
    cap_drop: Option<Vec<String>>,
    devices: Option<Vec<DeviceMapping>>,
    dns: Option<Vec<String>>,
    dns_options: Option<Vec<String>>,
    dns_search: Option<Vec<String>>,
    extra_hosts: Option<Vec<String>>,
    links: Option<Vec<String>>,
    security_opt: Option<Vec<String>>,
    tmpfs: Option<BTreeMap<String, String>>,
    sysctls: Option<BTreeMap<String, String>>,
    group_add: Option<Vec<String>>,
    device_requests: Option<Vec<DeviceRequest>>,
    runtime: Option<String>,
    cgroup_parent: Option<String>,
    ipc_mode: Option<String>,
    pid_mode: Option<String>,
    userns_mode: Option<String>,
    log_config: Option<LogConfig>,
    shm_size: Option<i64>,
    ulimits: Option<Vec<Ulimit>>,
    memory: Option<i64>,
    memory_reservation: Option<i64>,
    memory_swap: Option<i64>,
    cpu_shares: Option<i64>,
    nano_cpus: Option<i64>,
    cpu_quota: Option<i64>,
    cpu_period: Option<i64>,
    cpuset_cpus: Option<String>,
    cpuset_mems: Option<String>,
    pids_limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawNetworkSettings {
    networks: Option<BTreeMap<String, RawEndpoint>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawEndpoint {
    #[serde(rename = "IPAMConfig")]
    ipam_config: Option<RawIpam>,
    links: Option<Vec<String>>,
    aliases: Option<Vec<String>>,
    #[serde(rename = "NetworkID")]
    network_id: Option<String>,
    #[serde(rename = "IPAddress")]
    ip_address: Option<String>,
    #[serde(rename = "GlobalIPv6Address")]
    global_ipv6_address: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawIpam {
    #[serde(rename = "IPv4Address")]
    ipv4_address: Option<String>,
    #[serde(rename = "IPv6Address")]
    ipv6_address: Option<String>,
}
