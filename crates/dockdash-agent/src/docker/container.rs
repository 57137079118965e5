//! Container listing types

use dockdash_core::{short_id, ContainerStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// One row of a container listing
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: ContainerStatus,
    /// Human readable state line (`Up 3 hours`)
    pub state_text: String,
    pub created: i64,
    pub ports: Vec<PortSummary>,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortSummary {
    pub private_port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_port: Option<u16>,
    pub protocol: String,
}

impl ContainerSummary {
    pub fn short_id(&self) -> &str {
        short_id(&self.id)
    }
}

/// Engine names carry a leading slash
pub(crate) fn clean_name(name: &str) -> String {
    name.trim_start_matches('/').to_string()
}
