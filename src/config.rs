//! Service configuration read from `ALERTDECK_*` environment variables
//!
//! - `ALERTDECK_HOST`: Bind address (default: 0.0.0.0)
//! - `ALERTDECK_PORT`: Port number (default: 8080)
//! - `ALERTDECK_INSTANCES`: Comma-separated `name=uri` list, the name is optional
//! - `ALERTDECK_TIMEOUT_SECS`: Per-request backend timeout (default: 10)
//! - `ALERTDECK_PULL_INTERVAL_SECS`: Pull cycle interval (default: 60)
//! - `ALERTDECK_API_VERSION`: `auto`, `v1` or `v2` (default: auto)
//! - `ALERTDECK_LABELS_KEEP` / `ALERTDECK_LABELS_STRIP`: Label retention lists
//! - `ALERTDECK_RECEIVERS_KEEP` / `ALERTDECK_RECEIVERS_STRIP`: Receiver retention lists
//! - `ALERTDECK_COLOR_UNIQUE`: Labels colored per value, `@receiver` and `@alertmanager` allowed
//! - `ALERTDECK_JIRA_REGEX`: Space separated ticket patterns matched against silence comments

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::dedup::DedupConfig;
use crate::derived::ColorConfig;
use crate::upstream::{parse_instances, ApiVersion, InstanceConfig};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_PULL_INTERVAL_SECS: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("No instances configured, set ALERTDECK_INSTANCES")]
    NoInstances,

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("Duplicate instance name '{0}'")]
    DuplicateInstance(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub instances: Vec<InstanceConfig>,
    pub pull_interval: Duration,
    pub dedup: DedupConfig,
    pub colors: ColorConfig,
    /// Raw ticket patterns, see `ticket_patterns`
    pub jira_regex: Vec<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup, `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let list = |key: &str| lookup(key).map(|v| parse_list(&v)).unwrap_or_default();

        let host = lookup("ALERTDECK_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_number(&lookup, "ALERTDECK_PORT", DEFAULT_PORT)?;
        let timeout = parse_number(&lookup, "ALERTDECK_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)?;
        let pull_interval = parse_number(
            &lookup,
            "ALERTDECK_PULL_INTERVAL_SECS",
            DEFAULT_PULL_INTERVAL_SECS,
        )?;

        let api_version = match lookup("ALERTDECK_API_VERSION") {
            Some(raw) => raw.parse::<ApiVersion>().map_err(|_| ConfigError::InvalidValue {
                key: "ALERTDECK_API_VERSION",
                value: raw,
            })?,
            None => ApiVersion::Auto,
        };

        let instances: Vec<InstanceConfig> = lookup("ALERTDECK_INSTANCES")
            .map(|raw| parse_instances(&raw))
            .unwrap_or_default()
            .into_iter()
            .map(|instance| {
                instance
                    .with_timeout(Duration::from_secs(timeout))
                    .with_api_version(api_version)
            })
            .collect();

        if instances.is_empty() {
            return Err(ConfigError::NoInstances);
        }
        for (i, instance) in instances.iter().enumerate() {
            if instances[..i].iter().any(|other| other.name == instance.name) {
                return Err(ConfigError::DuplicateInstance(instance.name.clone()));
            }
        }

        Ok(Self {
            host,
            port,
            instances,
            pull_interval: Duration::from_secs(pull_interval.max(1)),
            dedup: DedupConfig {
                labels_keep: list("ALERTDECK_LABELS_KEEP"),
                labels_strip: list("ALERTDECK_LABELS_STRIP"),
                receivers_keep: list("ALERTDECK_RECEIVERS_KEEP"),
                receivers_strip: list("ALERTDECK_RECEIVERS_STRIP"),
            },
            colors: ColorConfig {
                unique_labels: list("ALERTDECK_COLOR_UNIQUE"),
            },
            jira_regex: lookup("ALERTDECK_JIRA_REGEX")
                .map(|raw| raw.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default(),
        })
    }

    /// Compile ticket patterns, invalid ones are logged and skipped
    pub fn ticket_patterns(&self) -> Vec<Regex> {
        self.jira_regex
            .iter()
            .filter_map(|pattern| match Regex::new(pattern) {
                Ok(re) => Some(re),
                Err(e) => {
                    tracing::warn!(pattern = %pattern, error = %e, "Skipping invalid ticket pattern");
                    None
                }
            })
            .collect()
    }

    pub fn log_summary(&self) {
        tracing::info!("alertdeck configuration:");
        tracing::info!("  Host: {}:{}", self.host, self.port);
        tracing::info!("  Pull interval: {:?}", self.pull_interval);
        tracing::info!("  Instances: {}", self.instances.len());
        for instance in &self.instances {
            tracing::info!(
                "    - {} @ {} (timeout {:?}, api {:?})",
                instance.name,
                instance.uri,
                instance.timeout,
                instance.api_version
            );
        }
        if !self.dedup.labels_keep.is_empty() {
            tracing::info!("  Labels kept: {}", self.dedup.labels_keep.join(" "));
        }
        if !self.dedup.labels_strip.is_empty() {
            tracing::info!("  Labels stripped: {}", self.dedup.labels_strip.join(" "));
        }
        if !self.dedup.receivers_keep.is_empty() {
            tracing::info!("  Receivers kept: {}", self.dedup.receivers_keep.join(" "));
        }
        if !self.dedup.receivers_strip.is_empty() {
            tracing::info!("  Receivers stripped: {}", self.dedup.receivers_strip.join(" "));
        }
        if !self.colors.unique_labels.is_empty() {
            tracing::info!("  Unique colors: {}", self.colors.unique_labels.join(" "));
        }
    }
}

fn parse_number<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => {
            raw.trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue { key, value: raw })
        }
        _ => Ok(default),
    }
}

/// Split a space and/or comma separated list, dropping empty entries
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("a b,c ,, d"), vec!["a", "b", "c", "d"]);
        assert!(parse_list("  ").is_empty());
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[("ALERTDECK_INSTANCES", "http://am:9093")]).unwrap();
        assert_eq!(settings.host, "0.0.0.0");
        assert_eq!(settings.port, 8080);
        assert_eq!(settings.pull_interval, Duration::from_secs(60));
        assert_eq!(settings.instances.len(), 1);
        assert_eq!(settings.instances[0].name, "instance-1");
        assert_eq!(settings.instances[0].timeout, Duration::from_secs(10));
        assert_eq!(settings.instances[0].api_version, ApiVersion::Auto);
        assert_eq!(settings.dedup, DedupConfig::default());
        assert!(settings.colors.unique_labels.is_empty());
        assert!(settings.ticket_patterns().is_empty());
    }

    #[test]
    fn test_full_configuration() {
        let settings = settings(&[
            ("ALERTDECK_HOST", "127.0.0.1"),
            ("ALERTDECK_PORT", "9000"),
            ("ALERTDECK_INSTANCES", "prod=http://am1:9093,dev=http://am2:9093"),
            ("ALERTDECK_TIMEOUT_SECS", "3"),
            ("ALERTDECK_PULL_INTERVAL_SECS", "15"),
            ("ALERTDECK_API_VERSION", "v1"),
            ("ALERTDECK_LABELS_STRIP", "job, instance"),
            ("ALERTDECK_RECEIVERS_STRIP", "by-name"),
            ("ALERTDECK_COLOR_UNIQUE", "cluster @receiver"),
            ("ALERTDECK_JIRA_REGEX", "OPS-[0-9]+ [invalid"),
        ])
        .unwrap();

        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.pull_interval, Duration::from_secs(15));
        assert_eq!(settings.instances[1].name, "dev");
        assert!(settings
            .instances
            .iter()
            .all(|i| i.timeout == Duration::from_secs(3) && i.api_version == ApiVersion::V1));
        assert_eq!(settings.dedup.labels_strip, vec!["job", "instance"]);
        assert_eq!(settings.dedup.receivers_strip, vec!["by-name"]);
        assert_eq!(settings.colors.unique_labels, vec!["cluster", "@receiver"]);
        assert_eq!(settings.jira_regex.len(), 2);
        assert_eq!(settings.ticket_patterns().len(), 1);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(settings(&[]), Err(ConfigError::NoInstances)));
        assert!(matches!(
            settings(&[("ALERTDECK_INSTANCES", "http://am"), ("ALERTDECK_PORT", "http")]),
            Err(ConfigError::InvalidValue { key: "ALERTDECK_PORT", .. })
        ));
        assert!(matches!(
            settings(&[("ALERTDECK_INSTANCES", "http://am"), ("ALERTDECK_API_VERSION", "v3")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            settings(&[("ALERTDECK_INSTANCES", "am=http://a,am=http://b")]),
            Err(ConfigError::DuplicateInstance(name)) if name == "am"
        ));
    }
}
