use chrono::Utc;
use regex::Regex;
use std::time::Duration;

use super::parser::{parse_duration, Expression, FilterError, FilterOperator};
use crate::data::{Alert, AlertState};

/// Equality or regex test against a set of candidate strings
#[derive(Debug, Clone)]
pub enum ValueMatch {
    Equal(String),
    NotEqual(String),
    Regex(Regex),
    NegativeRegex(Regex),
}

impl ValueMatch {
    fn compile(key: &str, operator: FilterOperator, value: &str) -> Result<Self, FilterError> {
        match operator {
            FilterOperator::Equal => Ok(ValueMatch::Equal(value.to_string())),
            FilterOperator::NotEqual => Ok(ValueMatch::NotEqual(value.to_string())),
            FilterOperator::Regex => Ok(ValueMatch::Regex(compile_regex(value)?)),
            FilterOperator::NegativeRegex => Ok(ValueMatch::NegativeRegex(compile_regex(value)?)),
            FilterOperator::LessThan | FilterOperator::GreaterThan => {
                Err(FilterError::OperatorNotAllowed {
                    key: key.to_string(),
                    operator,
                })
            }
        }
    }

    /// Same as `compile` but `=` and `!=` compare ignoring case
    fn compile_ignore_case(
        key: &str,
        operator: FilterOperator,
        value: &str,
    ) -> Result<Self, FilterError> {
        match operator {
            FilterOperator::Equal | FilterOperator::NotEqual => {
                Self::compile(key, operator, &value.to_lowercase())
            }
            _ => Self::compile(key, operator, value),
        }
    }

    fn is_negative(&self) -> bool {
        matches!(self, ValueMatch::NotEqual(_) | ValueMatch::NegativeRegex(_))
    }

    fn hit(&self, candidate: &str, ignore_case: bool) -> bool {
        match self {
            ValueMatch::Equal(expected) | ValueMatch::NotEqual(expected) => {
                if ignore_case {
                    candidate.to_lowercase() == *expected
                } else {
                    candidate == expected
                }
            }
            ValueMatch::Regex(re) | ValueMatch::NegativeRegex(re) => re.is_match(candidate),
        }
    }

    /// Positive operators need at least one hit, negative ones need none
    fn test<'a>(&self, candidates: impl IntoIterator<Item = &'a str>, ignore_case: bool) -> bool {
        let mut candidates = candidates.into_iter();
        let any_hit = candidates.any(|c| self.hit(c, ignore_case));
        any_hit != self.is_negative()
    }
}

fn compile_regex(pattern: &str) -> Result<Regex, FilterError> {
    Regex::new(pattern).map_err(|e| FilterError::InvalidRegex(e.to_string()))
}

/// Compiled form of one filter expression
#[derive(Debug, Clone)]
pub enum Matcher {
    State { negate: bool, state: AlertState },
    SilenceId { negate: bool, id: String },
    SilenceJira(ValueMatch),
    SilenceAuthor(ValueMatch),
    Age { older: bool, threshold: Duration },
    Alertmanager(ValueMatch),
    Receiver(ValueMatch),
    Limit(usize),
    Label { name: String, value: ValueMatch },
    FreeText(Regex),
}

impl Matcher {
    pub fn compile(expression: &Expression) -> Result<Self, FilterError> {
        match expression {
            Expression::FreeText(text) => {
                let re = compile_regex(&format!("(?i){}", text))?;
                Ok(Matcher::FreeText(re))
            }
            Expression::Keyed {
                key,
                operator,
                value,
            } => Self::compile_keyed(key, *operator, value),
        }
    }

    fn compile_keyed(key: &str, operator: FilterOperator, value: &str) -> Result<Self, FilterError> {
        let not_allowed = || FilterError::OperatorNotAllowed {
            key: key.to_string(),
            operator,
        };

        match key {
            "@state" => {
                let negate = equality(operator).ok_or_else(not_allowed)?;
                let state = value
                    .parse::<AlertState>()
                    .map_err(|_| FilterError::InvalidState(value.to_string()))?;
                Ok(Matcher::State { negate, state })
            }
            "@silence_id" => {
                let negate = equality(operator).ok_or_else(not_allowed)?;
                Ok(Matcher::SilenceId {
                    negate,
                    id: value.to_string(),
                })
            }
            "@silence_jira" => Ok(Matcher::SilenceJira(ValueMatch::compile(key, operator, value)?)),
            "@silence_author" => Ok(Matcher::SilenceAuthor(ValueMatch::compile(
                key, operator, value,
            )?)),
            "@age" => {
                let older = match operator {
                    FilterOperator::LessThan => false,
                    FilterOperator::GreaterThan => true,
                    _ => return Err(not_allowed()),
                };
                let threshold = parse_duration(value)?;
                Ok(Matcher::Age { older, threshold })
            }
            "@alertmanager" => Ok(Matcher::Alertmanager(ValueMatch::compile(
                key, operator, value,
            )?)),
            "@receiver" => Ok(Matcher::Receiver(ValueMatch::compile(key, operator, value)?)),
            "@limit" => {
                if operator != FilterOperator::Equal {
                    return Err(not_allowed());
                }
                match value.parse::<usize>() {
                    Ok(limit) if limit > 0 => Ok(Matcher::Limit(limit)),
                    _ => Err(FilterError::InvalidLimit(value.to_string())),
                }
            }
            meta if meta.starts_with('@') => Err(FilterError::UnknownMetaKey(meta.to_string())),
            name => Ok(Matcher::Label {
                name: name.to_string(),
                value: ValueMatch::compile_ignore_case(key, operator, value)?,
            }),
        }
    }

    pub fn is_limit(&self) -> bool {
        matches!(self, Matcher::Limit(_))
    }

    /// Evaluate against one alert; `index` is only consulted by `@limit`
    pub fn matches(&self, alert: &Alert, index: usize) -> bool {
        match self {
            Matcher::State { negate, state } => (alert.state == *state) != *negate,
            Matcher::SilenceId { negate, id } => {
                let silenced = alert.state == AlertState::Suppressed
                    && alert.silence_ids().contains(id.as_str());
                silenced != *negate
            }
            Matcher::SilenceJira(m) => m.test(
                alert.active_silences().filter_map(|s| s.jira_id.as_deref()),
                false,
            ),
            Matcher::SilenceAuthor(m) => {
                m.test(alert.active_silences().map(|s| s.created_by.as_str()), false)
            }
            Matcher::Age { older, threshold } => {
                let age = (Utc::now() - alert.starts_at)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                if *older {
                    age > *threshold
                } else {
                    age < *threshold
                }
            }
            Matcher::Alertmanager(m) => m.test(alert.instance_names(), false),
            Matcher::Receiver(m) => m.test([alert.receiver.as_str()], false),
            Matcher::Limit(limit) => index < *limit,
            Matcher::Label { name, value } => {
                let found = alert.label(name).or_else(|| alert.annotation(name));
                value.test(found, true)
            }
            Matcher::FreeText(re) => {
                alert.labels.values().any(|v| re.is_match(v))
                    || alert.annotations.iter().any(|a| re.is_match(&a.value))
                    || alert.active_silences().any(|s| re.is_match(&s.comment))
            }
        }
    }
}

/// `Some(negate)` for `=` and `!=`, `None` for everything else
fn equality(operator: FilterOperator) -> Option<bool> {
    match operator {
        FilterOperator::Equal => Some(false),
        FilterOperator::NotEqual => Some(true),
        _ => None,
    }
}
