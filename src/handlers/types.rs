use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

/// One raw record extracted by handler logic, keyed by field name
pub type Report = BTreeMap<String, Value>;

/// Message carried by every successful [`ParseResult`]
pub const SUCCESS_MESSAGE: &str = "Data successfully parsed";

/// A validated, filtered record accepted into a run's output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub feed: String,
    pub fields: Report,
}

/// Outcome of one handler run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResult {
    pub error_status: bool,
    pub error_message: String,
    pub warning_count: u32,
    /// `None` on failure, the accepted incidents on success
    pub data: Option<Vec<Incident>>,
}

impl ParseResult {
    pub fn success(incidents: Vec<Incident>, warning_count: u32) -> Self {
        Self {
            error_status: false,
            error_message: SUCCESS_MESSAGE.to_string(),
            warning_count,
            data: Some(incidents),
        }
    }

    pub fn failure(message: impl Into<String>, warning_count: u32) -> Self {
        Self {
            error_status: true,
            error_message: message.into(),
            warning_count,
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        !self.error_status
    }

    pub fn incidents(&self) -> &[Incident] {
        self.data.as_deref().unwrap_or_default()
    }
}

/// Whether a field value counts as "set" for required-field checks
pub(crate) fn is_set(value: &Value) -> bool {
    !value.is_null()
}

/// Whether a field value is dropped by empty-value filtering.
/// Booleans, `false` included, always survive.
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Remove every filtered field and, when `remove_empty` is set, every field
/// left with an empty value. Blank entries in `filters` are ignored.
pub fn filter_report<S: AsRef<str>>(mut report: Report, filters: &[S], remove_empty: bool) -> Report {
    let filters: HashSet<&str> = filters
        .iter()
        .map(|f| f.as_ref())
        .filter(|f| !f.is_empty())
        .collect();

    report.retain(|key, value| {
        !filters.contains(key.as_str()) && !(remove_empty && is_empty(value))
    });
    report
}
