use serde::Serialize;
use std::collections::BTreeMap;

use crate::data::{AlertGroup, AlertState};
use crate::filters::FilterOperator;

/// A suggested filter expression and the tokens it can be found by
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hint {
    pub value: String,
    pub tokens: Vec<String>,
}

impl Hint {
    fn new(key: &str, operator: FilterOperator, value: &str) -> Self {
        let expression = format!("{}{}{}", key, operator, value);
        Self {
            tokens: vec![key.to_string(), value.to_string(), expression.clone()],
            value: expression,
        }
    }

    fn matches(&self, term: &str) -> bool {
        self.tokens.iter().any(|t| t.to_lowercase().contains(term))
    }
}

const AGE_HINTS: [(FilterOperator, &str); 4] = [
    (FilterOperator::LessThan, "10m"),
    (FilterOperator::LessThan, "1h"),
    (FilterOperator::GreaterThan, "10m"),
    (FilterOperator::GreaterThan, "1h"),
];
const LIMIT_HINTS: [&str; 3] = ["10", "50", "100"];

#[derive(Default)]
struct HintSet {
    hints: BTreeMap<String, Hint>,
}

impl HintSet {
    fn push(&mut self, hint: Hint) {
        self.hints.entry(hint.value.clone()).or_insert(hint);
    }

    /// `key=value` and `key!=value`
    fn push_equality(&mut self, key: &str, value: &str) {
        self.push(Hint::new(key, FilterOperator::Equal, value));
        self.push(Hint::new(key, FilterOperator::NotEqual, value));
    }

    fn into_hints(self) -> Vec<Hint> {
        self.hints.into_values().collect()
    }
}

/// Hints that do not depend on live data
fn base_hints(set: &mut HintSet) {
    for state in AlertState::ALL {
        set.push_equality("@state", state.as_str());
    }
    for (operator, value) in AGE_HINTS {
        set.push(Hint::new("@age", operator, value));
    }
    for limit in LIMIT_HINTS {
        set.push(Hint::new("@limit", FilterOperator::Equal, limit));
    }
}

/// Build the typeahead hint list, sorted by value and free of duplicates
pub fn build_autocomplete(groups: &[AlertGroup], instance_names: &[String]) -> Vec<Hint> {
    let mut set = HintSet::default();
    base_hints(&mut set);

    for name in instance_names {
        set.push_equality("@alertmanager", name);
    }

    for group in groups {
        set.push_equality("@receiver", &group.receiver);

        for alert in &group.alerts {
            for (name, value) in &alert.labels {
                set.push_equality(name, value);
            }
            for silence in alert.active_silences() {
                set.push_equality("@silence_id", &silence.id);
                if !silence.created_by.is_empty() {
                    set.push_equality("@silence_author", &silence.created_by);
                }
                if let Some(jira) = &silence.jira_id {
                    set.push_equality("@silence_jira", jira);
                }
            }
        }
    }

    set.into_hints()
}

/// Hint values matching a typeahead term, shortest first
pub fn search_hints(hints: &[Hint], term: &str, limit: usize) -> Vec<String> {
    let term = term.to_lowercase();
    let mut found: Vec<&str> = hints
        .iter()
        .filter(|h| h.matches(&term))
        .map(|h| h.value.as_str())
        .collect();

    found.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    found.truncate(limit);
    found.into_iter().map(str::to_string).collect()
}
