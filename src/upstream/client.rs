use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use super::backend::{Backend, PullError, UpstreamAlert, UpstreamGroup};
use crate::data::{Annotation, Silence, SilenceMatcher};

/// Alertmanager API version used for requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiVersion {
    /// Probe v2 first, fall back to v1 when the server answers 404
    #[default]
    Auto,
    V1,
    V2,
}

impl FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" | "" => Ok(ApiVersion::Auto),
            "v1" | "1" => Ok(ApiVersion::V1),
            "v2" | "2" => Ok(ApiVersion::V2),
            other => Err(format!("unsupported API version '{}'", other)),
        }
    }
}

/// HTTP backend talking to a single Alertmanager server
#[derive(Debug)]
pub struct AlertmanagerClient {
    http_client: reqwest::Client,
    uri: String,
    api_version: ApiVersion,
    /// Version detected by the last status probe in `Auto` mode
    detected: RwLock<Option<ApiVersion>>,
}

impl AlertmanagerClient {
    pub fn new(
        uri: impl Into<String>,
        timeout: Duration,
        api_version: ApiVersion,
    ) -> Result<Self, PullError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PullError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            uri: uri.into().trim_end_matches('/').to_string(),
            api_version,
            detected: RwLock::new(None),
        })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Version that silence and alert requests will use
    pub fn effective_version(&self) -> ApiVersion {
        match self.api_version {
            ApiVersion::Auto => (*self.detected.read()).unwrap_or(ApiVersion::V2),
            pinned => pinned,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, PullError> {
        let url = format!("{}{}", self.uri, path);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| PullError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PullError::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| PullError::Deserialization(e.to_string()))
    }

    async fn get_v1<T: DeserializeOwned>(&self, path: &str) -> Result<T, PullError> {
        let envelope: V1Envelope<T> = self.get_json(path).await?;
        if envelope.status != "success" {
            return Err(PullError::Backend(
                envelope.error.unwrap_or_else(|| envelope.status.clone()),
            ));
        }
        envelope
            .data
            .ok_or_else(|| PullError::Deserialization(format!("{} returned no data", path)))
    }
}

#[async_trait]
impl Backend for AlertmanagerClient {
    async fn fetch_version(&self) -> Result<String, PullError> {
        match self.api_version {
            ApiVersion::V1 => {
                let status: StatusData = self.get_v1("/api/v1/status").await?;
                Ok(status.version_info.version)
            }
            ApiVersion::V2 => {
                let status: StatusData = self.get_json("/api/v2/status").await?;
                Ok(status.version_info.version)
            }
            ApiVersion::Auto => match self.get_json::<StatusData>("/api/v2/status").await {
                Ok(status) => {
                    *self.detected.write() = Some(ApiVersion::V2);
                    Ok(status.version_info.version)
                }
                Err(PullError::Status { status: 404, .. }) => {
                    tracing::debug!(uri = %self.uri, "v2 API not found, falling back to v1");
                    let status: StatusData = self.get_v1("/api/v1/status").await?;
                    *self.detected.write() = Some(ApiVersion::V1);
                    Ok(status.version_info.version)
                }
                Err(e) => Err(e),
            },
        }
    }

    async fn fetch_silences(&self) -> Result<Vec<Silence>, PullError> {
        let silences: Vec<WireSilence> = match self.effective_version() {
            ApiVersion::V1 => self.get_v1("/api/v1/silences").await?,
            _ => self.get_json("/api/v2/silences").await?,
        };
        Ok(silences.into_iter().map(Silence::from).collect())
    }

    async fn fetch_alert_groups(&self) -> Result<Vec<UpstreamGroup>, PullError> {
        match self.effective_version() {
            ApiVersion::V1 => {
                let groups: Vec<V1Group> = self.get_v1("/api/v1/alerts/groups").await?;
                Ok(groups.into_iter().flat_map(V1Group::into_groups).collect())
            }
            _ => {
                let groups: Vec<V2Group> = self.get_json("/api/v2/alerts/groups").await?;
                Ok(groups.into_iter().map(UpstreamGroup::from).collect())
            }
        }
    }
}

// ============================================================================
// Wire formats
// ============================================================================

#[derive(Debug, Deserialize)]
struct V1Envelope<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusData {
    version_info: VersionInfo,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
    version: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireSilence {
    id: String,
    #[serde(default)]
    matchers: Vec<WireMatcher>,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    #[serde(default)]
    created_by: String,
    #[serde(default)]
    comment: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMatcher {
    name: String,
    value: String,
    #[serde(default)]
    is_regex: bool,
}

impl From<WireSilence> for Silence {
    fn from(s: WireSilence) -> Self {
        Silence {
            id: s.id,
            created_by: s.created_by,
            comment: s.comment,
            jira_id: None,
            matchers: s
                .matchers
                .into_iter()
                .map(|m| SilenceMatcher {
                    name: m.name,
                    value: m.value,
                    is_regex: m.is_regex,
                })
                .collect(),
            starts_at: s.starts_at,
            ends_at: s.ends_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAlert {
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
    starts_at: DateTime<Utc>,
    status: WireAlertStatus,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAlertStatus {
    state: String,
    // v1 sends null instead of an empty list
    #[serde(default)]
    silenced_by: Option<Vec<String>>,
    #[serde(default)]
    inhibited_by: Option<Vec<String>>,
}

impl From<WireAlert> for UpstreamAlert {
    fn from(a: WireAlert) -> Self {
        UpstreamAlert {
            labels: a.labels,
            annotations: a
                .annotations
                .into_iter()
                .map(|(name, value)| Annotation { name, value })
                .collect(),
            starts_at: a.starts_at,
            state: a.status.state.parse().unwrap_or_default(),
            silenced_by: a.status.silenced_by.unwrap_or_default().into_iter().collect(),
            inhibited_by: a.status.inhibited_by.unwrap_or_default().into_iter().collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct V2Group {
    #[serde(default)]
    labels: BTreeMap<String, String>,
    receiver: V2Receiver,
    #[serde(default)]
    alerts: Vec<WireAlert>,
}

#[derive(Debug, Deserialize)]
struct V2Receiver {
    name: String,
}

impl From<V2Group> for UpstreamGroup {
    fn from(g: V2Group) -> Self {
        UpstreamGroup {
            receiver: g.receiver.name,
            labels: g.labels,
            alerts: g.alerts.into_iter().map(UpstreamAlert::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct V1Group {
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    blocks: Vec<V1Block>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V1Block {
    route_opts: V1RouteOpts,
    #[serde(default)]
    alerts: Vec<WireAlert>,
}

#[derive(Debug, Deserialize)]
struct V1RouteOpts {
    receiver: String,
}

impl V1Group {
    /// v1 nests receivers in blocks, each block becomes its own group
    fn into_groups(self) -> Vec<UpstreamGroup> {
        let labels = self.labels;
        self.blocks
            .into_iter()
            .map(|block| UpstreamGroup {
                receiver: block.route_opts.receiver,
                labels: labels.clone(),
                alerts: block.alerts.into_iter().map(UpstreamAlert::from).collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::AlertState;

    const V2_STATUS: &str = r#"{"versionInfo":{"version":"0.21.0","branch":"HEAD"},"cluster":{"status":"ready"}}"#;

    const V2_SILENCES: &str = r#"[{
        "id": "abc-1",
        "matchers": [{"name": "cluster", "value": "prod", "isRegex": false}],
        "startsAt": "2024-01-01T00:00:00Z",
        "endsAt": "2024-01-02T00:00:00Z",
        "updatedAt": "2024-01-01T00:00:00Z",
        "createdBy": "john@example.com",
        "comment": "DEVOPS-12 maintenance",
        "status": {"state": "active"}
    }]"#;

    const V2_GROUPS: &str = r#"[{
        "labels": {"alertname": "HostDown"},
        "receiver": {"name": "by-name"},
        "alerts": [{
            "labels": {"alertname": "HostDown", "instance": "web1"},
            "annotations": {"summary": "web1 is down"},
            "startsAt": "2024-01-01T10:00:00Z",
            "endsAt": "2024-01-01T11:00:00Z",
            "fingerprint": "f1",
            "receivers": [{"name": "by-name"}],
            "status": {"state": "suppressed", "silencedBy": ["abc-1"], "inhibitedBy": []}
        }]
    }]"#;

    const V1_STATUS: &str = r#"{"status":"success","data":{"versionInfo":{"version":"0.15.3"},"uptime":"2024-01-01T00:00:00Z"}}"#;

    const V1_SILENCES: &str = r#"{"status":"success","data":[{
        "id": "old-1",
        "matchers": [{"name": "job", "value": "node.*", "isRegex": true}],
        "startsAt": "2024-01-01T00:00:00Z",
        "endsAt": "2024-01-02T00:00:00Z",
        "createdBy": "bob@example.com",
        "comment": "legacy"
    }]}"#;

    const V1_GROUPS: &str = r#"{"status":"success","data":[{
        "labels": {"alertname": "Disk"},
        "blocks": [
            {"routeOpts": {"receiver": "by-cluster-service"}, "alerts": [{
                "labels": {"alertname": "Disk", "cluster": "dev"},
                "annotations": {},
                "startsAt": "2024-01-01T10:00:00Z",
                "status": {"state": "active", "silencedBy": null, "inhibitedBy": null}
            }]},
            {"routeOpts": {"receiver": "by-name"}, "alerts": [{
                "labels": {"alertname": "Disk", "cluster": "prod"},
                "startsAt": "2024-01-01T10:00:00Z",
                "status": {"state": "active", "silencedBy": [], "inhibitedBy": []}
            }]}
        ]
    }]}"#;

    fn client(url: String, version: ApiVersion) -> AlertmanagerClient {
        AlertmanagerClient::new(url, Duration::from_secs(2), version).unwrap()
    }

    #[test]
    fn test_api_version_parsing() {
        assert_eq!("auto".parse::<ApiVersion>(), Ok(ApiVersion::Auto));
        assert_eq!("V1".parse::<ApiVersion>(), Ok(ApiVersion::V1));
        assert_eq!("2".parse::<ApiVersion>(), Ok(ApiVersion::V2));
        assert!("v3".parse::<ApiVersion>().is_err());
    }

    #[tokio::test]
    async fn test_v2_pull() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v2/status")
            .with_status(200)
            .with_body(V2_STATUS)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v2/silences")
            .with_status(200)
            .with_body(V2_SILENCES)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v2/alerts/groups")
            .with_status(200)
            .with_body(V2_GROUPS)
            .create_async()
            .await;

        let client = client(server.url(), ApiVersion::Auto);
        assert_eq!(client.fetch_version().await.unwrap(), "0.21.0");
        assert_eq!(client.effective_version(), ApiVersion::V2);

        let silences = client.fetch_silences().await.unwrap();
        assert_eq!(silences.len(), 1);
        assert_eq!(silences[0].created_by, "john@example.com");
        assert_eq!(silences[0].matchers[0].name, "cluster");

        let groups = client.fetch_alert_groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].receiver, "by-name");
        let alert = &groups[0].alerts[0];
        assert_eq!(alert.state, AlertState::Suppressed);
        assert!(alert.silenced_by.contains("abc-1"));
        assert_eq!(alert.annotations[0].value, "web1 is down");
    }

    #[tokio::test]
    async fn test_auto_falls_back_to_v1() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v2/status")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/status")
            .with_status(200)
            .with_body(V1_STATUS)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/silences")
            .with_status(200)
            .with_body(V1_SILENCES)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/alerts/groups")
            .with_status(200)
            .with_body(V1_GROUPS)
            .create_async()
            .await;

        let client = client(server.url(), ApiVersion::Auto);
        assert_eq!(client.fetch_version().await.unwrap(), "0.15.3");
        assert_eq!(client.effective_version(), ApiVersion::V1);

        let silences = client.fetch_silences().await.unwrap();
        assert!(silences[0].matchers[0].is_regex);

        let groups = client.fetch_alert_groups().await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].receiver, "by-cluster-service");
        assert_eq!(groups[1].receiver, "by-name");
        assert_eq!(groups[1].labels.get("alertname").map(String::as_str), Some("Disk"));
        assert!(groups[0].alerts[0].silenced_by.is_empty());
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v2/status")
            .with_status(500)
            .create_async()
            .await;

        let client = client(server.url(), ApiVersion::V2);
        let err = client.fetch_version().await.unwrap_err();
        assert!(matches!(err, PullError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_v1_error_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v1/status")
            .with_status(200)
            .with_body(r#"{"status":"error","error":"boom"}"#)
            .create_async()
            .await;

        let client = client(server.url(), ApiVersion::V1);
        let err = client.fetch_version().await.unwrap_err();
        assert!(matches!(err, PullError::Backend(ref msg) if msg == "boom"));
    }

    #[tokio::test]
    async fn test_malformed_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/v2/silences")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = client(server.url(), ApiVersion::V2);
        let err = client.fetch_silences().await.unwrap_err();
        assert!(matches!(err, PullError::Deserialization(_)));
    }
}
