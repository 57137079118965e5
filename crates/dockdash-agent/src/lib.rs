//! DockDash agent
//!
//! Manages containers on a single Docker-compatible host and replaces them in
//! place: a replacement keeps the container's name, configuration and
//! networks, and rolls back to the original when the new one fails to come up.

pub mod config;
pub mod docker;
pub mod error;
pub mod middleware;
pub mod replace;
pub mod routes;

pub use config::AgentConfig;
pub use docker::{BollardEngine, ContainerEngine, EngineError};
pub use error::{AgentError, Result};
pub use replace::{ReplaceError, ReplaceOutcome, ReplaceReport, Replacer};
