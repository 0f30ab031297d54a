use serde::Serialize;

use super::matcher::Matcher;
use super::parser::{parse_expression, FilterError};
use crate::data::{Alert, AlertGroup};

/// A user supplied filter expression and its compiled matcher.
///
/// Invalid expressions are kept around so their status can be reported back,
/// they never match anything.
#[derive(Debug, Clone)]
pub struct Filter {
    raw: String,
    compiled: Result<Matcher, FilterError>,
    hits: usize,
}

/// Serializable summary of a filter after evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterStatus {
    pub text: String,
    pub is_valid: bool,
    pub hits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Filter {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let compiled = parse_expression(&raw).and_then(|expr| Matcher::compile(&expr));
        Self {
            raw,
            compiled,
            hits: 0,
        }
    }

    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    pub fn is_valid(&self) -> bool {
        self.compiled.is_ok()
    }

    pub fn error(&self) -> Option<&FilterError> {
        self.compiled.as_ref().err()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn is_limit(&self) -> bool {
        matches!(&self.compiled, Ok(m) if m.is_limit())
    }

    /// Evaluate against an alert and update the hit counter.
    ///
    /// Ordinary filters count alerts they accept, `@limit` counts alerts it cuts off.
    pub fn matches(&mut self, alert: &Alert, index: usize) -> bool {
        let Ok(matcher) = &self.compiled else {
            return false;
        };

        let matched = matcher.matches(alert, index);
        if matched != matcher.is_limit() {
            self.hits += 1;
        }
        matched
    }

    pub fn reset(&mut self) {
        self.hits = 0;
    }

    pub fn status(&self) -> FilterStatus {
        FilterStatus {
            text: self.raw.clone(),
            is_valid: self.is_valid(),
            hits: self.hits,
            error: self.error().map(ToString::to_string),
        }
    }
}

/// Compile a list of raw filter expressions
pub fn compile_filters<S: AsRef<str>>(raw: &[S]) -> Vec<Filter> {
    raw.iter().map(|s| Filter::new(s.as_ref())).collect()
}

/// Keep only alerts accepted by every valid filter.
///
/// Invalid filters are ignored. `@limit` filters are consulted last, only for
/// alerts every other filter accepted, with the number of alerts accepted so
/// far as index. Groups left without alerts are dropped.
pub fn apply_filters(groups: &[AlertGroup], filters: &mut [Filter]) -> Vec<AlertGroup> {
    let mut accepted = 0;
    let mut result = Vec::new();

    for group in groups {
        let mut alerts = Vec::new();

        for alert in &group.alerts {
            // every filter sees the alert so hit counters stay per filter
            let mut passed = true;
            for filter in filters.iter_mut().filter(|f| f.is_valid() && !f.is_limit()) {
                passed &= filter.matches(alert, accepted);
            }
            if !passed {
                continue;
            }

            for filter in filters.iter_mut().filter(|f| f.is_limit()) {
                passed &= filter.matches(alert, accepted);
            }
            if passed {
                accepted += 1;
                alerts.push(alert.clone());
            }
        }

        if !alerts.is_empty() {
            result.push(
                AlertGroup::new(group.id.clone(), group.receiver.clone(), group.labels.clone())
                    .with_alerts(alerts),
            );
        }
    }

    result
}
