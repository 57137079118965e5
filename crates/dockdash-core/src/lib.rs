//! DockDash core - container descriptors and recreation specs
//!
//! Everything in this crate is engine-agnostic: it parses the inspect JSON a
//! Docker/Podman-compatible engine reports for a container and turns it back
//! into the create body that reproduces that container.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod network;
pub mod spec;

pub use config::ReplaceConfig;
pub use descriptor::{short_id, ContainerDescriptor, ContainerStatus};
pub use error::{Error, Result};
pub use network::{NetworkAttachment, NetworkPlan};
pub use spec::CreationSpec;
