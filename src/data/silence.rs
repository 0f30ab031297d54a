use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SilenceMatcher {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub is_regex: bool,
}

/// A user-authored rule suppressing matching alerts on one instance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Silence {
    pub id: String,
    pub created_by: String,
    pub comment: String,
    pub jira_id: Option<String>,
    pub matchers: Vec<SilenceMatcher>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

impl Silence {
    /// Set `jira_id` from the first ticket pattern found in the comment
    pub fn detect_ticket(&mut self, patterns: &[Regex]) {
        self.jira_id = patterns
            .iter()
            .find_map(|re| re.find(&self.comment))
            .map(|m| m.as_str().to_string());
    }
}
