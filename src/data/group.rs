use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::alert::{Alert, AlertState};

/// A set of alerts sharing a group key (grouping labels + receiver)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertGroup {
    /// Group key
    pub id: String,
    pub receiver: String,
    /// Grouping labels
    pub labels: BTreeMap<String, String>,
    pub alerts: Vec<Alert>,
    pub state_count: BTreeMap<AlertState, usize>,
}

impl AlertGroup {
    pub fn new(
        id: impl Into<String>,
        receiver: impl Into<String>,
        labels: BTreeMap<String, String>,
    ) -> Self {
        Self {
            id: id.into(),
            receiver: receiver.into(),
            labels,
            alerts: Vec::new(),
            state_count: BTreeMap::new(),
        }
    }

    pub fn with_alerts(mut self, alerts: Vec<Alert>) -> Self {
        self.alerts = alerts;
        self.update_state_count();
        self
    }

    pub fn update_state_count(&mut self) {
        let mut counts: BTreeMap<AlertState, usize> =
            AlertState::ALL.iter().map(|s| (*s, 0)).collect();
        for alert in &self.alerts {
            *counts.entry(alert.state).or_insert(0) += 1;
        }
        self.state_count = counts;
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }
}
