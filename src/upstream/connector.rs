use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::backend::{Backend, PullError, UpstreamAlert, UpstreamGroup};
use super::client::AlertmanagerClient;
use super::config::InstanceConfig;
use crate::data::{Alert, AlertGroup, InstanceView, Silence};
use crate::dedup::{fingerprint, group_key};

/// Everything known about one instance after its latest pull
#[derive(Debug, Clone, Default, Serialize)]
pub struct InstanceSnapshot {
    pub name: String,
    pub version: String,
    /// Set when the last pull failed; all data fields are empty in that case
    pub error: Option<String>,
    pub known_labels: BTreeSet<String>,
    pub alert_groups: Vec<AlertGroup>,
    pub silences: BTreeMap<String, Arc<Silence>>,
    pub pulled_at: Option<DateTime<Utc>>,
}

impl InstanceSnapshot {
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            error: Some(error.into()),
            pulled_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.error.is_none()
    }

    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alert_groups.iter().flat_map(|g| g.alerts.iter())
    }

    pub fn alert_count(&self) -> usize {
        self.alert_groups.iter().map(AlertGroup::len).sum()
    }
}

/// Owns the relationship to a single backend instance.
///
/// The published snapshot is replaced whole under a write lock that is only
/// held for the swap itself; backend requests never run under the lock.
pub struct InstanceConnector {
    name: String,
    uri: String,
    timeout: Duration,
    backend: Arc<dyn Backend>,
    ticket_patterns: Vec<Regex>,
    state: RwLock<Arc<InstanceSnapshot>>,
}

impl InstanceConnector {
    pub fn new(
        name: impl Into<String>,
        uri: impl Into<String>,
        backend: Arc<dyn Backend>,
        timeout: Duration,
    ) -> Self {
        let name = name.into();
        Self {
            state: RwLock::new(Arc::new(InstanceSnapshot::empty(name.clone()))),
            name,
            uri: uri.into(),
            timeout,
            backend,
            ticket_patterns: Vec::new(),
        }
    }

    /// Build a connector backed by the HTTP client
    pub fn from_config(config: &InstanceConfig) -> Result<Self, PullError> {
        let client = AlertmanagerClient::new(&config.uri, config.timeout, config.api_version)?;
        Ok(Self::new(
            config.name.clone(),
            config.uri.clone(),
            Arc::new(client),
            config.timeout,
        ))
    }

    /// Patterns used to extract ticket ids from silence comments
    pub fn with_ticket_patterns(mut self, patterns: Vec<Regex>) -> Self {
        self.ticket_patterns = patterns;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch fresh data and publish it, or publish an empty failed snapshot
    pub async fn pull(&self) -> Result<(), PullError> {
        let start = Instant::now();

        match self.fetch().await {
            Ok(snapshot) => {
                tracing::debug!(
                    instance = %self.name,
                    version = %snapshot.version,
                    groups = snapshot.alert_groups.len(),
                    alerts = snapshot.alert_count(),
                    silences = snapshot.silences.len(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Pull completed"
                );
                *self.state.write() = Arc::new(snapshot);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    instance = %self.name,
                    uri = %self.uri,
                    error = %e,
                    "Pull failed, clearing instance data"
                );
                *self.state.write() = Arc::new(InstanceSnapshot::failed(&self.name, e.to_string()));
                Err(e)
            }
        }
    }

    async fn bounded<T>(
        &self,
        request: impl Future<Output = Result<T, PullError>>,
    ) -> Result<T, PullError> {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_) => Err(PullError::Timeout(self.timeout)),
        }
    }

    async fn fetch(&self) -> Result<InstanceSnapshot, PullError> {
        let version = self.bounded(self.backend.fetch_version()).await?;
        let silences = self.bounded(self.backend.fetch_silences()).await?;
        let groups = self.bounded(self.backend.fetch_alert_groups()).await?;

        let silences: BTreeMap<String, Arc<Silence>> = silences
            .into_iter()
            .map(|mut silence| {
                silence.detect_ticket(&self.ticket_patterns);
                (silence.id.clone(), Arc::new(silence))
            })
            .collect();

        let mut known_labels = BTreeSet::new();
        let alert_groups = groups
            .into_iter()
            .map(|group| self.build_group(group, &silences, &mut known_labels))
            .collect();

        Ok(InstanceSnapshot {
            name: self.name.clone(),
            version,
            error: None,
            known_labels,
            alert_groups,
            silences,
            pulled_at: Some(Utc::now()),
        })
    }

    fn build_group(
        &self,
        group: UpstreamGroup,
        silences: &BTreeMap<String, Arc<Silence>>,
        known_labels: &mut BTreeSet<String>,
    ) -> AlertGroup {
        let id = group_key(&group.receiver, &group.labels);
        let receiver = group.receiver;

        let alerts = group
            .alerts
            .into_iter()
            .map(|alert| {
                known_labels.extend(alert.labels.keys().cloned());
                self.build_alert(alert, &receiver, silences)
            })
            .collect();

        AlertGroup::new(id, receiver, group.labels).with_alerts(alerts)
    }

    fn build_alert(
        &self,
        alert: UpstreamAlert,
        receiver: &str,
        silences: &BTreeMap<String, Arc<Silence>>,
    ) -> Alert {
        let view = InstanceView {
            name: self.name.clone(),
            silences: alert
                .silenced_by
                .iter()
                .filter_map(|id| silences.get(id).map(|s| (id.clone(), Arc::clone(s))))
                .collect(),
            silenced_by: alert.silenced_by,
            inhibited_by: alert.inhibited_by,
        };

        Alert {
            fingerprint: fingerprint(&alert.labels),
            labels: alert.labels,
            annotations: alert.annotations,
            state: alert.state,
            starts_at: alert.starts_at,
            receiver: receiver.to_string(),
            instances: vec![view],
        }
    }

    /// Current snapshot; readers always see one complete pull result
    pub fn snapshot(&self) -> Arc<InstanceSnapshot> {
        Arc::clone(&self.state.read())
    }

    pub fn version(&self) -> String {
        self.snapshot().version.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.snapshot().error.clone()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.snapshot().alerts().cloned().collect()
    }

    pub fn alert_groups(&self) -> Vec<AlertGroup> {
        self.snapshot().alert_groups.clone()
    }

    pub fn silences(&self) -> BTreeMap<String, Arc<Silence>> {
        self.snapshot().silences.clone()
    }

    pub fn known_labels(&self) -> BTreeSet<String> {
        self.snapshot().known_labels.clone()
    }
}

impl std::fmt::Debug for InstanceConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceConnector")
            .field("name", &self.name)
            .field("uri", &self.uri)
            .field("timeout", &self.timeout)
            .finish()
    }
}
