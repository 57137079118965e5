//! Container engine access using Bollard

mod client;
pub mod container;
mod engine;
#[cfg(test)]
pub(crate) mod fake;
pub mod image;
pub mod network;
pub mod stats;

pub use client::BollardEngine;
pub use container::{ContainerSummary, PortSummary};
pub use engine::{ContainerEngine, EngineError};
pub use stats::{ContainerStats, PruneReport};
