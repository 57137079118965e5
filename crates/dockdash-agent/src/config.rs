//! Configuration for the DockDash agent
//!
//! Everything is read from `DOCKDASH_*` environment variables. The engine
//! connection itself follows `DOCKER_HOST` through bollard.

use dockdash_core::ReplaceConfig;
use std::env;

fn env_dockdash(name: &str) -> Option<String> {
    env::var(format!("DOCKDASH_{}", name)).ok()
}

fn env_dockdash_default(name: &str, default: &str) -> String {
    env_dockdash(name).unwrap_or_else(|| default.to_string())
}

/// Parse a size string like "64KB", "1MB" or raw bytes
fn parse_size(s: &str) -> Option<usize> {
    let s = s.trim().to_uppercase();

    if let Ok(bytes) = s.parse::<usize>() {
        return Some(bytes);
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("MB") {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = s.strip_suffix('M') {
        (n, 1024 * 1024)
    } else if let Some(n) = s.strip_suffix('K') {
        (n, 1024)
    } else {
        return None;
    };

    num_str.trim().parse::<usize>().ok().map(|n| n * multiplier)
}

/// Main configuration for the agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    // Server
    pub host: String,
    pub port: u16,
    /// Bearer token for the API; empty disables auth
    pub secret: String,
    pub max_body_size: usize, // bytes

    // Replacement
    /// Pull flag used when a recreate request does not say
    pub pull_latest: bool,
    pub post_replace_command: Option<String>,
    pub replace: ReplaceConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            secret: String::new(),
            max_body_size: 64 * 1024,
            pull_latest: true,
            post_replace_command: None,
            replace: ReplaceConfig::default(),
        }
    }
}

impl AgentConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: env_dockdash_default("HOST", &defaults.host),
            port: env_dockdash("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            secret: env_dockdash_default("SECRET", ""),
            max_body_size: env_dockdash("MAX_BODY_SIZE")
                .and_then(|v| parse_size(&v))
                .unwrap_or(defaults.max_body_size),
            pull_latest: env_dockdash("PULL_LATEST")
                .map(|v| !matches!(v.to_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(defaults.pull_latest),
            post_replace_command: env_dockdash("POST_REPLACE_COMMAND")
                .filter(|c| !c.trim().is_empty()),
            replace: ReplaceConfig::from_env(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
