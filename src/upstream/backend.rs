use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use crate::data::{AlertState, Annotation, Silence};

/// An alert as returned by a backend, before it is attached to an instance view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamAlert {
    pub labels: BTreeMap<String, String>,
    pub annotations: Vec<Annotation>,
    pub starts_at: DateTime<Utc>,
    pub state: AlertState,
    pub silenced_by: BTreeSet<String>,
    pub inhibited_by: BTreeSet<String>,
}

/// A backend alert group, normalized across API versions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpstreamGroup {
    pub receiver: String,
    pub labels: BTreeMap<String, String>,
    pub alerts: Vec<UpstreamAlert>,
}

/// Data source for a single instance.
///
/// Implementations hide the wire protocol; every call either yields normalized
/// records or a `PullError`.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend version string
    async fn fetch_version(&self) -> Result<String, PullError>;

    async fn fetch_silences(&self) -> Result<Vec<Silence>, PullError>;

    async fn fetch_alert_groups(&self) -> Result<Vec<UpstreamGroup>, PullError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PullError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request to {url} failed with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Pull timed out after {0:?}")]
    Timeout(Duration),
}
