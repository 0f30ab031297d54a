use fxhash::FxHasher64;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::config::DedupConfig;
use crate::data::{Alert, AlertGroup, InstanceView};
use crate::upstream::InstanceSnapshot;

/// Group identity: receiver plus grouping labels
pub fn group_key(receiver: &str, labels: &BTreeMap<String, String>) -> String {
    let mut hasher = FxHasher64::default();
    receiver.hash(&mut hasher);
    labels.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Alert identity: hash of the label set only
pub fn fingerprint(labels: &BTreeMap<String, String>) -> String {
    let mut hasher = FxHasher64::default();
    labels.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Labels used for identity. When keep/strip rules remove every label the
/// backend's own label set identifies the group or alert instead.
fn identity_labels<'a>(
    filtered: &'a BTreeMap<String, String>,
    raw: &'a BTreeMap<String, String>,
) -> &'a BTreeMap<String, String> {
    if filtered.is_empty() {
        raw
    } else {
        filtered
    }
}

struct GroupBuilder {
    receiver: String,
    labels: BTreeMap<String, String>,
    alerts: BTreeMap<String, Alert>,
}

/// Merge per-instance snapshots into deduplicated alert groups.
///
/// Output is ordered by group key, alerts by start time then fingerprint and
/// instance views by name, so unchanged input always yields identical output.
pub fn dedup_alerts(snapshots: &[Arc<InstanceSnapshot>], config: &DedupConfig) -> Vec<AlertGroup> {
    let mut groups: BTreeMap<String, GroupBuilder> = BTreeMap::new();

    for snapshot in snapshots {
        if let Some(error) = &snapshot.error {
            tracing::debug!(instance = %snapshot.name, error = %error, "Skipping failed instance");
            continue;
        }

        for group in &snapshot.alert_groups {
            if !config.keeps_receiver(&group.receiver) {
                continue;
            }

            let group_labels = config.filter_labels(&group.labels);
            let key = group_key(
                &group.receiver,
                identity_labels(&group_labels, &group.labels),
            );
            let builder = groups.entry(key).or_insert_with(|| GroupBuilder {
                receiver: group.receiver.clone(),
                labels: group_labels,
                alerts: BTreeMap::new(),
            });

            for alert in &group.alerts {
                let labels = config.filter_labels(&alert.labels);
                let fp = fingerprint(identity_labels(&labels, &alert.labels));

                match builder.alerts.entry(fp) {
                    Entry::Occupied(mut entry) => {
                        let merged = entry.get_mut();
                        merged.state = merged.state.max(alert.state);
                        merged.starts_at = merged.starts_at.min(alert.starts_at);
                        merge_views(&mut merged.instances, &alert.instances);
                    }
                    Entry::Vacant(entry) => {
                        let merged = Alert {
                            fingerprint: entry.key().clone(),
                            labels,
                            receiver: group.receiver.clone(),
                            ..alert.clone()
                        };
                        entry.insert(merged);
                    }
                }
            }
        }
    }

    groups
        .into_iter()
        .filter(|(_, builder)| !builder.alerts.is_empty())
        .map(|(key, builder)| {
            let mut alerts: Vec<Alert> = builder
                .alerts
                .into_values()
                .map(|mut alert| {
                    alert.instances.sort_by(|a, b| a.name.cmp(&b.name));
                    alert.normalize_state();
                    alert
                })
                .collect();
            alerts.sort_by(|a, b| {
                a.starts_at
                    .cmp(&b.starts_at)
                    .then_with(|| a.fingerprint.cmp(&b.fingerprint))
            });

            AlertGroup::new(key, builder.receiver, builder.labels).with_alerts(alerts)
        })
        .collect()
}

fn merge_views(views: &mut Vec<InstanceView>, incoming: &[InstanceView]) {
    for view in incoming {
        match views.iter_mut().find(|v| v.name == view.name) {
            Some(existing) => existing.absorb(view.clone()),
            None => views.push(view.clone()),
        }
    }
}
