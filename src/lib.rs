//! alertdeck: Alert Aggregation Engine
//!
//! Pulls alerts and silences from several Alertmanager instances, merges them
//! into one deduplicated view and serves it through a small JSON API with a
//! filter query language.
//!
//! # Features
//!
//! - **Concurrent Pulls**: Every instance is pulled in parallel with a hard timeout
//! - **Atomic Snapshots**: Readers never see half-updated instance state
//! - **Deduplication**: Identical alerts from different instances are merged,
//!   keeping each instance's own silence and inhibition state
//! - **Filter Language**: Label, regex, free text and `@meta` filters with `@limit`
//! - **Autocomplete**: Typeahead hints built from live data
//! - **Colors**: Stable per-cycle color ids for selected label values
//!
//! # Example
//!
//! ```no_run
//! use alertdeck::dedup::{dedup_alerts, DedupConfig};
//! use alertdeck::filters::{apply_filters, compile_filters};
//! use alertdeck::upstream::{InstanceConfig, InstanceConnector, Registry};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Registry::new();
//! let config = InstanceConfig::new("prod", "http://alertmanager:9093");
//! registry.register(InstanceConnector::from_config(&config)?)?;
//! registry.pull_all().await;
//!
//! let groups = dedup_alerts(&registry.snapshots(), &DedupConfig::default());
//! let mut filters = compile_filters(&["cluster=prod", "@state=active"]);
//! let visible = apply_filters(&groups, &mut filters);
//! println!("{} groups match", visible.len());
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod data;
pub mod dedup;
pub mod derived;
pub mod filters;
pub mod poller;
pub mod upstream;

// Re-export commonly used types
pub use config::{ConfigError, Settings};
pub use data::{Alert, AlertGroup, AlertState, Silence};
pub use filters::{apply_filters, Filter, FilterError};
pub use upstream::{InstanceConnector, PullError, Registry, RegistryError};
