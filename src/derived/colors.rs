use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::{Alert, AlertGroup};

/// label name -> label value -> color id
pub type ColorMap = BTreeMap<String, BTreeMap<String, usize>>;

pub const RECEIVER_LABEL: &str = "@receiver";
pub const ALERTMANAGER_LABEL: &str = "@alertmanager";

/// Labels whose values get a distinct color each
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorConfig {
    #[serde(default)]
    pub unique_labels: Vec<String>,
}

impl ColorConfig {
    pub fn assign(&self, groups: &[AlertGroup]) -> ColorMap {
        assign_colors(groups, &self.unique_labels)
    }
}

fn label_values<'a>(alert: &'a Alert, label: &str) -> Vec<&'a str> {
    match label {
        RECEIVER_LABEL => vec![alert.receiver.as_str()],
        ALERTMANAGER_LABEL => alert.instance_names().collect(),
        name => alert.label(name).into_iter().collect(),
    }
}

/// Number every distinct value of each unique label in first-seen order.
///
/// Ids start at 0 per label, labels without any value are left out.
pub fn assign_colors(groups: &[AlertGroup], unique_labels: &[String]) -> ColorMap {
    let mut colors = ColorMap::new();

    for alert in groups.iter().flat_map(|g| &g.alerts) {
        for label in unique_labels {
            for value in label_values(alert, label) {
                let ids = colors.entry(label.clone()).or_default();
                let next = ids.len();
                ids.entry(value.to_string()).or_insert(next);
            }
        }
    }

    colors
}
