use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

use crate::data::AlertGroup;
use crate::derived::{ColorMap, Hint};
use crate::upstream::InstanceConnector;

/// Health of one instance as of the last cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceStatus {
    pub name: String,
    pub uri: String,
    pub version: String,
    pub error: Option<String>,
    pub alert_count: usize,
    pub pulled_at: Option<DateTime<Utc>>,
}

impl InstanceStatus {
    pub fn of(connector: &InstanceConnector) -> Self {
        let snapshot = connector.snapshot();
        Self {
            name: connector.name().to_string(),
            uri: connector.uri().to_string(),
            version: snapshot.version.clone(),
            error: snapshot.error.clone(),
            alert_count: snapshot.alert_count(),
            pulled_at: snapshot.pulled_at,
        }
    }
}

/// Everything the presentation layer needs from one pull cycle
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardView {
    pub groups: Vec<AlertGroup>,
    pub hints: Vec<Hint>,
    pub colors: ColorMap,
    pub instances: Vec<InstanceStatus>,
    pub generated_at: Option<DateTime<Utc>>,
}

impl DashboardView {
    pub fn alert_count(&self) -> usize {
        self.groups.iter().map(AlertGroup::len).sum()
    }
}

#[derive(Debug, Default)]
struct Published {
    generation: u64,
    view: Arc<DashboardView>,
}

/// Latest published view, replaced whole on every cycle
#[derive(Debug, Default)]
pub struct AlertStore {
    current: RwLock<Published>,
}

impl AlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> Arc<DashboardView> {
        Arc::clone(&self.current.read().view)
    }

    /// Generation and view read under one lock, so they always belong together
    pub fn snapshot(&self) -> (u64, Arc<DashboardView>) {
        let current = self.current.read();
        (current.generation, Arc::clone(&current.view))
    }

    pub fn publish(&self, view: DashboardView) {
        let view = Arc::new(view);
        let mut current = self.current.write();
        current.generation += 1;
        current.view = view;
    }

    /// Number of views published so far
    pub fn generation(&self) -> u64 {
        self.current.read().generation
    }
}
