//! Resource usage of a single container and prune results

use super::engine::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One sample of a container's resource usage
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStats {
    pub cpu_percent: f64,
    pub memory_usage: u64,
    pub memory_limit: u64,
    pub memory_percent: f64,
    pub network_rx: u64,
    pub network_tx: u64,
    pub block_read: u64,
    pub block_write: u64,
}

impl ContainerStats {
    /// Parse a one-shot stats document as the engine reports it
    ///
    /// CPU usage is the delta between the sample and the engine's previous
    /// reading, scaled to the number of online CPUs.
    pub fn from_wire(value: Value) -> Result<Self> {
        let raw: RawStats = serde_json::from_value(value)?;

        let cpu = raw.cpu_stats.unwrap_or_default();
        let precpu = raw.precpu_stats.unwrap_or_default();
        let cpu_delta = cpu.total_usage() as f64 - precpu.total_usage() as f64;
        let system_delta =
            cpu.system_cpu_usage.unwrap_or(0) as f64 - precpu.system_cpu_usage.unwrap_or(0) as f64;
        let online_cpus = cpu.online_cpus.filter(|n| *n > 0).unwrap_or(1) as f64;

        let cpu_percent = if system_delta > 0.0 && cpu_delta > 0.0 {
            round2(cpu_delta / system_delta * online_cpus * 100.0)
        } else {
            0.0
        };

        let memory = raw.memory_stats.unwrap_or_default();
        let memory_usage = memory.usage.unwrap_or(0);
        let memory_limit = memory.limit.unwrap_or(0);
        let memory_percent = if memory_limit > 0 {
            round2(memory_usage as f64 / memory_limit as f64 * 100.0)
        } else {
            0.0
        };

        let networks = raw.networks.unwrap_or_default();
        let network_rx = networks.values().filter_map(|n| n.rx_bytes).sum();
        let network_tx = networks.values().filter_map(|n| n.tx_bytes).sum();

        let io = raw
            .blkio_stats
            .and_then(|b| b.io_service_bytes_recursive)
            .unwrap_or_default();
        let block_bytes = |op: &str| -> u64 {
            io.iter()
                .filter(|e| e.op.as_deref().is_some_and(|o| o.eq_ignore_ascii_case(op)))
                .filter_map(|e| e.value)
                .sum()
        };

        Ok(Self {
            cpu_percent,
            memory_usage,
            memory_limit,
            memory_percent,
            network_rx,
            network_tx,
            block_read: block_bytes("read"),
            block_write: block_bytes("write"),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// What a prune of stopped containers removed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneReport {
    pub containers_deleted: Vec<String>,
    pub space_reclaimed: u64,
}

impl PruneReport {
    pub fn from_wire(value: Value) -> Result<Self> {
        let raw: RawPrune = serde_json::from_value(value)?;
        let space_reclaimed = raw.space_reclaimed.unwrap_or(0);
        Ok(Self {
            containers_deleted: raw.containers_deleted.unwrap_or_default(),
            space_reclaimed: u64::try_from(space_reclaimed).map_err(|_| {
                EngineError::InvalidResponse(format!(
                    "negative space reclaimed: {}",
                    space_reclaimed
                ))
            })?,
        })
    }
}

// Wire shapes; the stats document uses snake_case keys.

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawStats {
    cpu_stats: Option<RawCpuStats>,
    precpu_stats: Option<RawCpuStats>,
    memory_stats: Option<RawMemoryStats>,
    networks: Option<BTreeMap<String, RawNetworkStats>>,
    blkio_stats: Option<RawBlkioStats>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCpuStats {
    cpu_usage: Option<RawCpuUsage>,
    system_cpu_usage: Option<u64>,
    online_cpus: Option<u32>,
}

impl RawCpuStats {
    fn total_usage(&self) -> u64 {
        self.cpu_usage
            .as_ref()
            .and_then(|u| u.total_usage)
            .unwrap_or(0)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCpuUsage {
    total_usage: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMemoryStats {
    usage: Option<u64>,
    limit: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNetworkStats {
    rx_bytes: Option<u64>,
    tx_bytes: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBlkioStats {
    io_service_bytes_recursive: Option<Vec<RawBlkioEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawBlkioEntry {
    op: Option<String>,
    value: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct RawPrune {
    containers_deleted: Option<Vec<String>>,
    space_reclaimed: Option<i64>,
}
