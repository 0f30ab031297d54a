use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::client::ApiVersion;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A single backend instance to pull from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceConfig {
    /// Unique instance name
    pub name: String,
    /// Base URI, e.g. http://alertmanager:9093
    pub uri: String,
    /// Per-request timeout
    pub timeout: Duration,
    pub api_version: ApiVersion,
}

impl InstanceConfig {
    pub fn new(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            timeout: DEFAULT_TIMEOUT,
            api_version: ApiVersion::Auto,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_api_version(mut self, api_version: ApiVersion) -> Self {
        self.api_version = api_version;
        self
    }
}

/// Parse an instance list: "name=uri,other=uri2,uri3".
///
/// Entries without a name are called `instance-N` by position.
pub fn parse_instances(raw: &str) -> Vec<InstanceConfig> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .enumerate()
        .map(|(i, entry)| match entry.split_once('=') {
            Some((name, uri)) if !name.contains("://") => {
                InstanceConfig::new(name.trim(), uri.trim())
            }
            _ => InstanceConfig::new(format!("instance-{}", i + 1), entry),
        })
        .collect()
}
