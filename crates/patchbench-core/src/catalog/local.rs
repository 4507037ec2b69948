//! Catalog backed by a local dataset export

use std::collections::HashMap;
use std::path::Path;

use super::TaskCatalog;
use super::record::{DatasetEntry, TaskRecord};
use crate::error::{BenchError, BenchResult};

/// In-memory catalog built from a JSON array or JSON Lines file
#[derive(Debug, Clone, Default)]
pub struct LocalTaskCatalog {
    records: HashMap<String, TaskRecord>,
    order: Vec<String>,
}

impl LocalTaskCatalog {
    /// Build a catalog from already parsed entries; the first entry wins on duplicate ids
    pub fn from_entries(entries: impl IntoIterator<Item = DatasetEntry>) -> Self {
        let mut catalog = Self::default();
        for entry in entries {
            if catalog.records.contains_key(&entry.instance_id) {
                tracing::warn!(instance_id = %entry.instance_id, "duplicate instance id ignored");
                continue;
            }
            catalog.order.push(entry.instance_id.clone());
            catalog
                .records
                .insert(entry.instance_id.clone(), TaskRecord::from(&entry));
        }
        catalog
    }

    /// Load a dataset export from disk
    pub fn from_path(path: impl AsRef<Path>) -> BenchResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            BenchError::io_with_path(
                format!("Failed to read dataset: {}", e),
                path.display().to_string(),
            )
        })?;

        let entries = Self::parse(&content)
            .map_err(|e| e.with_context(format!("dataset {}", path.display())))?;
        let catalog = Self::from_entries(entries);

        tracing::info!(
            path = %path.display(),
            tasks = catalog.len(),
            "Dataset loaded"
        );
        if let Some(sample) = catalog.order.first() {
            tracing::debug!(first_instance = %sample, "Dataset sample");
        }
        Ok(catalog)
    }

    /// Parse a JSON array, or JSON Lines when the content is not an array
    pub fn parse(content: &str) -> BenchResult<Vec<DatasetEntry>> {
        if content.trim_start().starts_with('[') {
            return Ok(serde_json::from_str(content)?);
        }

        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                serde_json::from_str::<DatasetEntry>(line).map_err(|e| {
                    BenchError::json(format!("line {}: {}", index + 1, e))
                })
            })
            .collect()
    }

    /// Task ids in dataset order
    pub fn task_ids(&self) -> &[String] {
        &self.order
    }
}

impl TaskCatalog for LocalTaskCatalog {
    fn lookup(&self, task_id: &str) -> BenchResult<TaskRecord> {
        self.records.get(task_id).cloned().ok_or_else(|| {
            BenchError::not_found_resource(format!("Task {} not found in dataset", task_id), "task")
        })
    }

    fn contains(&self, task_id: &str) -> bool {
        self.records.contains_key(task_id)
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
