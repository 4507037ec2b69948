//! Task corpus records
//!
//! `DatasetEntry` is one raw instance as exported from the benchmark dataset;
//! `TaskRecord` is the view served to callers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One raw benchmark instance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetEntry {
    pub instance_id: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub base_commit: String,
    #[serde(default)]
    pub problem_statement: String,
    #[serde(default)]
    pub hints_text: Option<String>,
    /// Gold patch; only used to derive the touched file paths
    #[serde(default)]
    pub patch: Option<String>,
    #[serde(default)]
    pub test_patch: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub version: Option<Value>,
    #[serde(default)]
    pub environment_setup_commit: Option<String>,
    /// Either a JSON-encoded string or a bare list, depending on the export
    #[serde(default, rename = "FAIL_TO_PASS")]
    pub fail_to_pass: Option<Value>,
    #[serde(default, rename = "PASS_TO_PASS")]
    pub pass_to_pass: Option<Value>,
}

/// A task as served by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub issue_text: String,
    pub base_commit: String,
    pub file_paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
}

impl From<&DatasetEntry> for TaskRecord {
    fn from(entry: &DatasetEntry) -> Self {
        Self {
            task_id: entry.instance_id.clone(),
            issue_text: issue_text(entry),
            base_commit: entry.base_commit.clone(),
            file_paths: entry
                .patch
                .as_deref()
                .map(file_paths_from_patch)
                .unwrap_or_default(),
            context: Some(context(entry)),
        }
    }
}

/// Problem statement followed by the hints, separated by a blank line
fn issue_text(entry: &DatasetEntry) -> String {
    let mut parts = Vec::new();
    if !entry.problem_statement.is_empty() {
        parts.push(entry.problem_statement.clone());
    }
    if let Some(hints) = entry.hints_text.as_deref().filter(|h| !h.is_empty()) {
        parts.push(format!("Additional Hints:\n{}", hints));
    }
    parts.join("\n\n")
}

/// Post-image paths of every `diff --git a/... b/...` header
pub fn file_paths_from_patch(patch: &str) -> Vec<String> {
    patch
        .lines()
        .filter(|line| line.starts_with("diff --git"))
        .filter_map(|line| line.split_whitespace().last())
        .map(|token| token.strip_prefix("b/").unwrap_or(token).to_string())
        .collect()
}

fn context(entry: &DatasetEntry) -> Map<String, Value> {
    fn text(value: Option<&str>) -> Value {
        Value::String(value.unwrap_or_default().to_string())
    }

    let mut map = Map::new();
    map.insert("repo".into(), Value::String(entry.repo.clone()));
    map.insert("created_at".into(), text(entry.created_at.as_deref()));
    map.insert(
        "version".into(),
        entry.version.clone().unwrap_or_else(|| text(None)),
    );
    map.insert("test_patch".into(), text(entry.test_patch.as_deref()));
    map.insert(
        "environment_setup_commit".into(),
        text(entry.environment_setup_commit.as_deref()),
    );
    map.insert(
        "FAIL_TO_PASS".into(),
        entry.fail_to_pass.clone().unwrap_or_else(|| text(None)),
    );
    map.insert(
        "PASS_TO_PASS".into(),
        entry.pass_to_pass.clone().unwrap_or_else(|| text(None)),
    );
    map
}
