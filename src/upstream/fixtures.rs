//! Test backends and mock alert data shared by unit tests

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::backend::{Backend, PullError, UpstreamAlert, UpstreamGroup};
use super::connector::InstanceConnector;
use super::registry::Registry;
use crate::data::{AlertState, Annotation, Silence, SilenceMatcher};

/// Backend serving fixed data, switchable into failure or slow mode
pub struct StaticBackend {
    version: String,
    silences: Vec<Silence>,
    groups: Vec<UpstreamGroup>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl StaticBackend {
    pub fn new(version: &str, silences: Vec<Silence>, groups: Vec<UpstreamGroup>) -> Self {
        Self {
            version: version.to_string(),
            silences,
            groups,
            failing: AtomicBool::new(false),
            delay: Mutex::new(None),
        }
    }

    pub fn mock() -> Self {
        Self::new("0.21.0", mock_silences(), mock_groups())
    }

    pub fn failing() -> Self {
        let backend = Self::mock();
        backend.set_failing(true);
        backend
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock() = delay;
    }

    async fn respond<T: Clone>(&self, value: &T) -> Result<T, PullError> {
        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(PullError::Network("connection refused".to_string()));
        }
        Ok(value.clone())
    }
}

#[async_trait]
impl Backend for StaticBackend {
    async fn fetch_version(&self) -> Result<String, PullError> {
        self.respond(&self.version).await
    }

    async fn fetch_silences(&self) -> Result<Vec<Silence>, PullError> {
        self.respond(&self.silences).await
    }

    async fn fetch_alert_groups(&self) -> Result<Vec<UpstreamGroup>, PullError> {
        self.respond(&self.groups).await
    }
}

pub fn mock_connector(name: &str, backend: Arc<StaticBackend>) -> InstanceConnector {
    InstanceConnector::new(
        name,
        format!("http://{}.localhost", name),
        backend,
        Duration::from_secs(1),
    )
}

/// Registry of `count` instances all serving the mock data, already pulled
pub async fn pulled_registry(count: usize) -> Registry {
    let registry = Registry::new();
    for i in 0..count {
        registry
            .register(mock_connector(
                &format!("am{:02}", i + 1),
                Arc::new(StaticBackend::mock()),
            ))
            .expect("unique mock names");
    }
    for outcome in registry.pull_all().await {
        outcome.result.expect("mock pull");
    }
    registry
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub fn mock_silences() -> Vec<Silence> {
    vec![
        Silence {
            id: "1".to_string(),
            created_by: "john@example.com".to_string(),
            comment: "Silenced instance".to_string(),
            jira_id: None,
            matchers: vec![
                SilenceMatcher {
                    name: "alertname".to_string(),
                    value: "Host_Down".to_string(),
                    is_regex: false,
                },
                SilenceMatcher {
                    name: "cluster".to_string(),
                    value: "dev".to_string(),
                    is_regex: false,
                },
            ],
            starts_at: base_time(),
            ends_at: base_time() + ChronoDuration::days(365),
        },
        Silence {
            id: "2".to_string(),
            created_by: "bob@example.com".to_string(),
            comment: "Disk cleanup in staging, DEVOPS-123".to_string(),
            jira_id: None,
            matchers: vec![SilenceMatcher {
                name: "alertname".to_string(),
                value: "Free_Disk_Space_Too_Low".to_string(),
                is_regex: false,
            }],
            starts_at: base_time(),
            ends_at: base_time() + ChronoDuration::days(365),
        },
    ]
}

fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

struct MockAlert {
    alertname: &'static str,
    cluster: &'static str,
    instance: &'static str,
    job: &'static str,
}

/// Ten groups, 24 alerts in total
pub fn mock_groups() -> Vec<UpstreamGroup> {
    let host = |alertname, cluster, instance| MockAlert {
        alertname,
        cluster,
        instance,
        job: "node_exporter",
    };
    let probe = |cluster, instance| MockAlert {
        alertname: "HTTP_Probe_Failed",
        cluster,
        instance,
        job: "blackbox",
    };

    let by_name = |alertname: &str| labels(&[("alertname", alertname)]);
    let by_service = |alertname: &str, cluster: &str, service: &str| {
        labels(&[
            ("alertname", alertname),
            ("cluster", cluster),
            ("service", service),
        ])
    };

    let layout: Vec<(&str, BTreeMap<String, String>, Vec<MockAlert>)> = vec![
        (
            "by-name",
            by_name("HTTP_Probe_Failed"),
            vec![probe("dev", "web1"), probe("dev", "web2")],
        ),
        (
            "by-name",
            by_name("Host_Down"),
            vec![
                host("Host_Down", "dev", "server1"),
                host("Host_Down", "prod", "server4"),
                host("Host_Down", "staging", "server7"),
                host("Host_Down", "staging", "server8"),
            ],
        ),
        (
            "by-name",
            by_name("Memory_Usage_Too_High"),
            vec![
                host("Memory_Usage_Too_High", "prod", "server2"),
                host("Memory_Usage_Too_High", "prod", "server3"),
            ],
        ),
        (
            "by-name",
            by_name("Free_Disk_Space_Too_Low"),
            vec![
                host("Free_Disk_Space_Too_Low", "staging", "server5"),
                host("Free_Disk_Space_Too_Low", "staging", "server6"),
            ],
        ),
        (
            "by-cluster-service",
            by_service("HTTP_Probe_Failed", "dev", "web"),
            vec![probe("dev", "web1"), probe("dev", "web2")],
        ),
        (
            "by-cluster-service",
            by_service("Host_Down", "dev", "node"),
            vec![
                host("Host_Down", "dev", "server1"),
                host("Host_Down", "dev", "server2"),
                host("Host_Down", "dev", "server3"),
            ],
        ),
        (
            "by-cluster-service",
            by_service("Host_Down", "prod", "node"),
            vec![
                host("Host_Down", "prod", "server4"),
                host("Host_Down", "prod", "server5"),
                host("Host_Down", "prod", "server6"),
            ],
        ),
        (
            "by-cluster-service",
            by_service("Host_Down", "staging", "node"),
            vec![
                host("Host_Down", "staging", "server7"),
                host("Host_Down", "staging", "server8"),
            ],
        ),
        (
            "by-cluster-service",
            by_service("Memory_Usage_Too_High", "prod", "node"),
            vec![
                host("Memory_Usage_Too_High", "prod", "server2"),
                host("Memory_Usage_Too_High", "prod", "server3"),
            ],
        ),
        (
            "by-cluster-service",
            by_service("Free_Disk_Space_Too_Low", "staging", "node"),
            vec![
                host("Free_Disk_Space_Too_Low", "staging", "server5"),
                host("Free_Disk_Space_Too_Low", "staging", "server6"),
            ],
        ),
    ];

    let mut offset = 0;
    layout
        .into_iter()
        .map(|(receiver, group_labels, alerts)| UpstreamGroup {
            receiver: receiver.to_string(),
            labels: group_labels,
            alerts: alerts
                .into_iter()
                .map(|a| {
                    offset += 1;
                    mock_alert(a, base_time() - ChronoDuration::minutes(offset * 10))
                })
                .collect(),
        })
        .collect()
}

fn mock_alert(alert: MockAlert, starts_at: DateTime<Utc>) -> UpstreamAlert {
    let mut silenced_by = BTreeSet::new();
    let mut inhibited_by = BTreeSet::new();

    if alert.alertname == "Host_Down" && alert.cluster == "dev" {
        silenced_by.insert("1".to_string());
    }
    if alert.alertname == "Free_Disk_Space_Too_Low" {
        silenced_by.insert("2".to_string());
    }
    if alert.alertname == "Memory_Usage_Too_High" && alert.instance == "server3" {
        inhibited_by.insert("Host_Down".to_string());
    }

    let state = if silenced_by.is_empty() && inhibited_by.is_empty() {
        AlertState::Active
    } else {
        AlertState::Suppressed
    };

    UpstreamAlert {
        labels: labels(&[
            ("alertname", alert.alertname),
            ("cluster", alert.cluster),
            ("instance", alert.instance),
            ("job", alert.job),
        ]),
        annotations: vec![
            Annotation::new("summary", format!("{} on {}", alert.alertname, alert.instance)),
            Annotation::new("help", "Example help annotation"),
        ],
        starts_at,
        state,
        silenced_by,
        inhibited_by,
    }
}
