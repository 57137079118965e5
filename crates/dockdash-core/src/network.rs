//! Network planning for a replacement
//!
//! The engine accepts a single network in the create call. The plan picks
//! that primary network and lists every other attachment to connect after
//! creation.

use crate::descriptor::{short_id, ContainerDescriptor, EndpointConfig};
use serde::{Deserialize, Serialize};

/// Engine default network, which rejects user-supplied aliases
pub const DEFAULT_BRIDGE: &str = "bridge";

const CONTAINER_MODE_PREFIX: &str = "container:";

/// Container referenced by a `container:<ref>` network mode
pub fn container_reference(mode: &str) -> Option<&str> {
    mode.strip_prefix(CONTAINER_MODE_PREFIX)
        .filter(|reference| !reference.is_empty())
}

/// Modes where the container shares someone else's stack or has none
fn is_exclusive_mode(mode: &str) -> bool {
    mode == "host" || mode == "none" || container_reference(mode).is_some()
}

/// Endpoint settings requested for one network, in the engine's wire shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EndpointRequest {
    #[serde(
        rename = "IPAMConfig",
        default,
        skip_serializing_if = "IpamRequest::is_empty"
    )]
    pub ipam: IpamRequest,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpamRequest {
    #[serde(rename = "IPv4Address", default, skip_serializing_if = "Option::is_none")]
    pub ipv4_address: Option<String>,
    #[serde(rename = "IPv6Address", default, skip_serializing_if = "Option::is_none")]
    pub ipv6_address: Option<String>,
}

impl IpamRequest {
    pub fn is_empty(&self) -> bool {
        self.ipv4_address.is_none() && self.ipv6_address.is_none()
    }
}

impl EndpointRequest {
    /// Endpoint request reproducing `config` on `network` for a container
    /// whose previous short ID was `old_short_id`
    pub fn from_endpoint(network: &str, config: &EndpointConfig, old_short_id: &str) -> Self {
        let aliases = if network == DEFAULT_BRIDGE {
            Vec::new()
        } else {
            config
                .aliases
                .iter()
                .filter(|alias| alias.as_str() != old_short_id)
                .cloned()
                .collect()
        };

        Self {
            ipam: IpamRequest {
                ipv4_address: config.static_ipv4.clone(),
                ipv6_address: config.static_ipv6.clone(),
            },
            aliases,
            links: config.links.clone(),
        }
    }
}

/// One network the replacement is attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkAttachment {
    pub network: String,
    pub endpoint: EndpointRequest,
}

/// Network mode and attachments for the replacement container
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NetworkPlan {
    /// Mode passed to create; `None` leaves the engine default
    pub mode: Option<String>,
    pub primary: Option<NetworkAttachment>,
    pub secondaries: Vec<NetworkAttachment>,
}

impl NetworkPlan {
    pub fn from_descriptor(descriptor: &ContainerDescriptor) -> Self {
        let mode = descriptor
            .host
            .network_mode
            .clone()
            .filter(|m| !m.is_empty() && m != "default");
        let old_short_id = short_id(&descriptor.id);

        let attachment = |name: &str, config: &EndpointConfig| NetworkAttachment {
            network: name.to_string(),
            endpoint: EndpointRequest::from_endpoint(name, config, old_short_id),
        };

        let networks = &descriptor.networks;

        if let Some(mode) = mode.as_deref().filter(|m| is_exclusive_mode(m)) {
            // A shared stack carries no endpoints; host/none keep their
            // pseudo-network so the engine sees the same attachment
            let primary = networks
                .get_key_value(mode)
                .filter(|_| container_reference(mode).is_none())
                .map(|(name, config)| attachment(name, config));
            return Self {
                mode: Some(mode.to_string()),
                primary,
                secondaries: Vec::new(),
            };
        }

        let primary_name = mode
            .as_deref()
            .filter(|m| networks.contains_key(*m))
            .or_else(|| networks.keys().next().map(String::as_str));

        let primary = primary_name
            .and_then(|name| networks.get_key_value(name))
            .map(|(name, config)| attachment(name, config));

        let secondaries = networks
            .iter()
            .filter(|(name, _)| Some(name.as_str()) != primary_name)
            .map(|(name, config)| attachment(name, config))
            .collect();

        Self {
            mode,
            primary,
            secondaries,
        }
    }

    /// Container referenced by the network mode, if any
    pub fn container_reference(&self) -> Option<&str> {
        self.mode.as_deref().and_then(container_reference)
    }

    /// Point a `container:` mode at the referenced container's current name
    pub fn rewrite_container_mode(&mut self, current_name: &str) {
        if self.container_reference().is_some() {
            self.mode = Some(format!("{}{}", CONTAINER_MODE_PREFIX, current_name));
        }
    }

    pub fn shares_container_stack(&self) -> bool {
        self.container_reference().is_some()
    }

    /// `host` or `container:` mode, where the UTS namespace is not ours
    pub fn shares_hostname(&self) -> bool {
        self.mode.as_deref() == Some("host") || self.shares_container_stack()
    }
}
