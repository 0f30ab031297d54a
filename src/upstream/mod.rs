//! Data acquisition from backend Alertmanager instances
//!
//! Each instance is owned by an `InstanceConnector` that pulls status, silences
//! and alert groups and republishes them as one atomic snapshot. The `Registry`
//! holds all connectors and pulls them concurrently.

pub mod backend;
pub mod client;
pub mod config;
pub mod connector;
pub mod registry;

#[cfg(test)]
pub(crate) mod fixtures;

pub use backend::{Backend, PullError, UpstreamAlert, UpstreamGroup};
pub use client::{AlertmanagerClient, ApiVersion};
pub use config::{parse_instances, InstanceConfig};
pub use connector::{InstanceConnector, InstanceSnapshot};
pub use registry::{PullOutcome, Registry, RegistryError};
