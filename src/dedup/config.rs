use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Label and receiver retention rules applied while merging instances
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupConfig {
    /// When non-empty, only these labels are kept
    #[serde(default)]
    pub labels_keep: Vec<String>,
    #[serde(default)]
    pub labels_strip: Vec<String>,
    /// When non-empty, only alerts routed to these receivers are kept
    #[serde(default)]
    pub receivers_keep: Vec<String>,
    #[serde(default)]
    pub receivers_strip: Vec<String>,
}

impl DedupConfig {
    pub fn keeps_label(&self, name: &str) -> bool {
        (self.labels_keep.is_empty() || self.labels_keep.iter().any(|k| k == name))
            && !self.labels_strip.iter().any(|s| s == name)
    }

    pub fn keeps_receiver(&self, receiver: &str) -> bool {
        (self.receivers_keep.is_empty() || self.receivers_keep.iter().any(|k| k == receiver))
            && !self.receivers_strip.iter().any(|s| s == receiver)
    }

    pub fn filter_labels(&self, labels: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        labels
            .iter()
            .filter(|(name, _)| self.keeps_label(name))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
