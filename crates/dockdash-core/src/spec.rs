//! Creation specs
//!
//! A [`CreationSpec`] is everything needed to create an equivalent container,
//! reconstructed from a descriptor. It serializes straight into the engine's
//! create body; a field is present only when the source container set it.

use crate::descriptor::{
    is_false, render_env, ContainerDescriptor, DeviceMapping, DeviceRequest, Healthcheck,
    LogConfig, Mount, PortBinding, RestartPolicy, Ulimit,
};
use crate::network::{EndpointRequest, NetworkPlan};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreationSpec {
    /// Name to create under; sent as a query parameter, not in the body
    #[serde(skip)]
    pub name: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domainname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub tty: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub open_stdin: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cmd: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(
        skip_serializing_if = "BTreeSet::is_empty",
        serialize_with = "serialize_key_set"
    )]
    pub exposed_ports: BTreeSet<String>,
    #[serde(
        skip_serializing_if = "BTreeSet::is_empty",
        serialize_with = "serialize_key_set"
    )]
    pub volumes: BTreeSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_signal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<Healthcheck>,
    pub host_config: CreationHostConfig,
    #[serde(skip_serializing_if = "NetworkingConfig::is_empty")]
    pub networking_config: NetworkingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreationHostConfig {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub binds: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<Mount>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes_from: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_mode: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub port_bindings: BTreeMap<String, Vec<PortBinding>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,
    #[serde(skip_serializing_if = "is_false")]
    pub auto_remove: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub privileged: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub readonly_rootfs: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub init: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cap_add: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cap_drop: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceMapping>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_options: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_search: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_hosts: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_opt: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub tmpfs: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sysctls: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub group_add: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub device_requests: Vec<DeviceRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cgroup_parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ipc_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userns_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_config: Option<LogConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shm_size: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ulimits: Vec<Ulimit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_reservation: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_swap: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_shares: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nano_cpus: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_quota: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_period: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpuset_cpus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpuset_mems: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pids_limit: Option<i64>,
}

/// Networks supplied at creation; the engine accepts at most one
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct NetworkingConfig {
    pub endpoints_config: BTreeMap<String, EndpointRequest>,
}

impl NetworkingConfig {
    pub fn is_empty(&self) -> bool {
        self.endpoints_config.is_empty()
    }
}

/// `{"80/tcp": {}}`, the engine's set encoding
fn serialize_key_set<S: Serializer>(set: &BTreeSet<String>, serializer: S) -> Result<S::Ok, S::Error> {
    let empty = serde_json::Map::new();
    let mut map = serializer.serialize_map(Some(set.len()))?;
    for key in set {
        map.serialize_entry(key, &empty)?;
    }
    map.end()
}

impl CreationSpec {
    /// Reconstruct a spec from a live descriptor and its network plan
    ///
    /// Returns `None` when no image reference can be determined.
    pub fn from_descriptor(descriptor: &ContainerDescriptor, plan: &NetworkPlan) -> Option<Self> {
        let image = descriptor.image_reference()?.to_string();
        let host = &descriptor.host;
        let shares_stack = plan.shares_container_stack();

        let hostname = descriptor
            .hostname
            .clone()
            .filter(|h| h.as_str() != descriptor.short_id() && !plan.shares_hostname());

        let port_bindings = if shares_stack {
            BTreeMap::new()
        } else {
            host.port_bindings.clone()
        };

        let exposed_ports = if shares_stack {
            BTreeSet::new()
        } else if !descriptor.exposed_ports.is_empty() {
            descriptor.exposed_ports.clone()
        } else {
            port_bindings.keys().cloned().collect()
        };

        let mut volumes = descriptor.volumes.clone();
        volumes.extend(host.bind_mounts.iter().map(|b| b.target.clone()));

        // Settings owned by the container whose stack we join
        let stack_owned = |values: &Vec<String>| {
            if shares_stack {
                Vec::new()
            } else {
                values.clone()
            }
        };

        let endpoints_config = plan
            .primary
            .iter()
            .map(|a| (a.network.clone(), a.endpoint.clone()))
            .collect();

        Some(Self {
            name: descriptor.name.clone(),
            image,
            hostname,
            domainname: descriptor.domainname.clone(),
            user: descriptor.user.clone(),
            tty: descriptor.tty,
            open_stdin: descriptor.open_stdin,
            env: render_env(&descriptor.env),
            cmd: descriptor.command.clone(),
            entrypoint: descriptor.entrypoint.clone(),
            working_dir: descriptor.working_dir.clone(),
            labels: descriptor.labels.clone(),
            exposed_ports,
            volumes,
            stop_signal: descriptor.stop_signal.clone(),
            healthcheck: descriptor.healthcheck.clone(),
            host_config: CreationHostConfig {
                binds: host.binds.clone(),
                mounts: host.mounts.clone(),
                volumes_from: host.volumes_from.clone(),
                network_mode: plan.mode.clone(),
                port_bindings,
                restart_policy: host.restart_policy.clone(),
                auto_remove: host.auto_remove,
                privileged: host.privileged,
                readonly_rootfs: host.readonly_rootfs,
                init: host.init,
                cap_add: host.cap_add.clone(),
                cap_drop: host.cap_drop.clone(),
                devices: host.devices.clone(),
                dns: stack_owned(&host.dns),
                dns_options: stack_owned(&host.dns_options),
                dns_search: stack_owned(&host.dns_search),
                extra_hosts: stack_owned(&host.extra_hosts),
                links: stack_owned(&host.links),
                security_opt: host.security_opt.clone(),
                tmpfs: host.tmpfs.clone(),
                // Network sysctls belong to the stack owner
                sysctls: if shares_stack {
                    host.sysctls
                        .iter()
                        .filter(|(key, _)| !key.starts_with("net."))
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect()
                } else {
                    host.sysctls.clone()
                },
                group_add: host.group_add.clone(),
                device_requests: host.device_requests.clone(),
                runtime: host.runtime.clone(),
                cgroup_parent: host.cgroup_parent.clone(),
                ipc_mode: host.ipc_mode.clone(),
                pid_mode: host.pid_mode.clone(),
                userns_mode: host.userns_mode.clone(),
                log_config: host.log_config.clone(),
                shm_size: host.shm_size,
                ulimits: host.ulimits.clone(),
                memory: host.memory,
                memory_reservation: host.memory_reservation,
                memory_swap: host.memory_swap,
                cpu_shares: host.cpu_shares,
                nano_cpus: host.nano_cpus,
                cpu_quota: host.cpu_quota,
                cpu_period: host.cpu_period,
                cpuset_cpus: host.cpuset_cpus.clone(),
                cpuset_mems: host.cpuset_mems.clone(),
                pids_limit: host.pids_limit,
            },
            networking_config: NetworkingConfig { endpoints_config },
        })
    }

    /// Create body as JSON
    pub fn to_body(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
