use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

use super::backend::PullError;
use super::connector::{InstanceConnector, InstanceSnapshot};

/// Named set of instance connectors
#[derive(Debug, Default)]
pub struct Registry {
    instances: DashMap<String, Arc<InstanceConnector>>,
}

/// Outcome of pulling one instance
#[derive(Debug)]
pub struct PullOutcome {
    pub name: String,
    pub result: Result<(), PullError>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector; an existing name is never overwritten
    pub fn register(
        &self,
        connector: InstanceConnector,
    ) -> Result<Arc<InstanceConnector>, RegistryError> {
        match self.instances.entry(connector.name().to_string()) {
            Entry::Occupied(entry) => Err(RegistryError::Duplicate(entry.key().clone())),
            Entry::Vacant(entry) => {
                let connector = Arc::new(connector);
                entry.insert(Arc::clone(&connector));
                tracing::info!(
                    instance = %connector.name(),
                    uri = %connector.uri(),
                    "Registered instance"
                );
                Ok(connector)
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<InstanceConnector>> {
        self.instances.get(name).map(|c| Arc::clone(&c))
    }

    /// All connectors ordered by name
    pub fn get_all(&self) -> Vec<Arc<InstanceConnector>> {
        let mut all: Vec<Arc<InstanceConnector>> =
            self.instances.iter().map(|e| Arc::clone(e.value())).collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        all
    }

    pub fn names(&self) -> Vec<String> {
        self.get_all().iter().map(|c| c.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Current snapshots ordered by instance name
    pub fn snapshots(&self) -> Vec<Arc<InstanceSnapshot>> {
        self.get_all().iter().map(|c| c.snapshot()).collect()
    }

    /// Pull every registered instance concurrently
    pub async fn pull_all(&self) -> Vec<PullOutcome> {
        let connectors = self.get_all();
        let futures: Vec<_> = connectors
            .iter()
            .map(|connector| async move {
                PullOutcome {
                    name: connector.name().to_string(),
                    result: connector.pull().await,
                }
            })
            .collect();

        futures::future::join_all(futures).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Instance '{0}' is already registered")]
    Duplicate(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::fixtures::{mock_connector, StaticBackend};

    #[test]
    fn test_duplicate_registration_fails() {
        let registry = Registry::new();
        let first = registry
            .register(mock_connector("am1", Arc::new(StaticBackend::mock())))
            .unwrap();

        let err = registry
            .register(mock_connector("am1", Arc::new(StaticBackend::failing())))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(ref name) if name == "am1"));

        // first connector is kept
        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&first, &registry.get("am1").unwrap()));
    }

    #[test]
    fn test_concurrent_registration_has_single_winner() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry
                        .register(mock_connector("shared", Arc::new(StaticBackend::mock())))
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_all_is_name_ordered() {
        let registry = Registry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(mock_connector(name, Arc::new(StaticBackend::mock())))
                .unwrap();
        }
        assert_eq!(registry.names(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_pull_all_isolates_failures() {
        let registry = Registry::new();
        registry
            .register(mock_connector("good", Arc::new(StaticBackend::mock())))
            .unwrap();
        registry
            .register(mock_connector("bad", Arc::new(StaticBackend::failing())))
            .unwrap();

        let outcomes = tokio_test::block_on(registry.pull_all());
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].name, "bad");
        assert!(outcomes[0].result.is_err());
        assert!(outcomes[1].result.is_ok());

        let snapshots = registry.snapshots();
        assert!(snapshots[0].error.is_some());
        assert_eq!(snapshots[0].alert_count(), 0);
        assert_eq!(snapshots[1].alert_count(), 24);
    }
}
