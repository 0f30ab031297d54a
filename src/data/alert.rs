use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use super::silence::Silence;

/// Alert state as reported by the backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertState {
    #[default]
    Unprocessed,
    Active,
    Suppressed,
}

impl AlertState {
    pub const ALL: [AlertState; 3] = [
        AlertState::Unprocessed,
        AlertState::Active,
        AlertState::Suppressed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertState::Unprocessed => "unprocessed",
            AlertState::Active => "active",
            AlertState::Suppressed => "suppressed",
        }
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertState {
    type Err = String;

    /// Case-sensitive, only the exact lowercase literals are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unprocessed" => Ok(AlertState::Unprocessed),
            "active" => Ok(AlertState::Active),
            "suppressed" => Ok(AlertState::Suppressed),
            other => Err(format!("unknown alert state '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub value: String,
}

impl Annotation {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// How a single backend instance sees an alert
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstanceView {
    /// Instance name, unique within the registry
    pub name: String,
    pub silenced_by: BTreeSet<String>,
    pub inhibited_by: BTreeSet<String>,
    /// Silences from this instance referenced by `silenced_by`
    pub silences: BTreeMap<String, Arc<Silence>>,
}

impl InstanceView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn is_silenced(&self) -> bool {
        !self.silenced_by.is_empty()
    }

    /// Fold another view of the same instance into this one
    pub fn absorb(&mut self, other: InstanceView) {
        self.silenced_by.extend(other.silenced_by);
        self.inhibited_by.extend(other.inhibited_by);
        self.silences.extend(other.silences);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub fingerprint: String,
    pub labels: BTreeMap<String, String>,
    pub annotations: Vec<Annotation>,
    pub state: AlertState,
    pub starts_at: DateTime<Utc>,
    pub receiver: String,
    pub instances: Vec<InstanceView>,
}

impl Alert {
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(String::as_str)
    }

    pub fn annotation(&self, name: &str) -> Option<&str> {
        self.annotations
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn instance_names(&self) -> impl Iterator<Item = &str> {
        self.instances.iter().map(|i| i.name.as_str())
    }

    pub fn is_silenced(&self) -> bool {
        self.instances.iter().any(InstanceView::is_silenced)
    }

    /// Union of silence ids across all instance views
    pub fn silence_ids(&self) -> BTreeSet<&str> {
        self.instances
            .iter()
            .flat_map(|i| i.silenced_by.iter().map(String::as_str))
            .collect()
    }

    /// Silences currently suppressing this alert on any instance.
    ///
    /// Ids listed in `silenced_by` without a matching silence record are skipped.
    pub fn active_silences(&self) -> impl Iterator<Item = &Silence> {
        self.instances.iter().flat_map(|view| {
            view.silenced_by
                .iter()
                .filter_map(|id| view.silences.get(id).map(|s| s.as_ref()))
        })
    }

    /// Recompute `state` from the instance views: suppressed iff silenced somewhere
    pub fn normalize_state(&mut self) {
        if self.is_silenced() {
            self.state = AlertState::Suppressed;
        } else if self.state == AlertState::Suppressed {
            self.state = AlertState::Active;
        }
    }
}
