use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time;

use super::store::{AlertStore, DashboardView, InstanceStatus};
use crate::dedup::{dedup_alerts, DedupConfig};
use crate::derived::{build_autocomplete, ColorConfig};
use crate::upstream::Registry;

/// Outcome of a single pull cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub instances: usize,
    pub failed: usize,
    pub groups: usize,
    pub alerts: usize,
}

/// Pull every instance once, rebuild the view and publish it
pub async fn refresh_view(
    registry: &Registry,
    store: &AlertStore,
    dedup: &DedupConfig,
    colors: &ColorConfig,
) -> CycleSummary {
    let started = Instant::now();

    let outcomes = registry.pull_all().await;
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();

    let groups = dedup_alerts(&registry.snapshots(), dedup);
    let view = DashboardView {
        hints: build_autocomplete(&groups, &registry.names()),
        colors: colors.assign(&groups),
        instances: registry
            .get_all()
            .iter()
            .map(|c| InstanceStatus::of(c))
            .collect(),
        generated_at: Some(Utc::now()),
        groups,
    };

    let summary = CycleSummary {
        instances: outcomes.len(),
        failed,
        groups: view.groups.len(),
        alerts: view.alert_count(),
    };
    store.publish(view);

    tracing::info!(
        instances = summary.instances,
        failed = summary.failed,
        groups = summary.groups,
        alerts = summary.alerts,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Pull cycle complete"
    );
    summary
}

/// Background worker running `refresh_view` on a fixed interval
pub struct PullWorker {
    registry: Arc<Registry>,
    store: Arc<AlertStore>,
    dedup: DedupConfig,
    colors: ColorConfig,
    interval: Duration,
    running: Arc<AtomicBool>,
}

impl PullWorker {
    pub fn new(
        registry: Arc<Registry>,
        store: Arc<AlertStore>,
        dedup: DedupConfig,
        colors: ColorConfig,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            dedup,
            colors,
            interval,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the background worker; the first cycle runs immediately
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            tracing::info!("Pull worker started with interval {:?}", self.interval);

            let mut interval = time::interval(self.interval);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

            while self.running.load(Ordering::SeqCst) {
                interval.tick().await;
                if !self.running.load(Ordering::SeqCst) {
                    break;
                }
                refresh_view(&self.registry, &self.store, &self.dedup, &self.colors).await;
            }

            tracing::info!("Pull worker stopped");
        })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}
