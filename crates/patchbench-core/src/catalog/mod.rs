//! Task catalog
//!
//! The catalog answers "which task is this?" for the HTTP surface. It is
//! loaded once at startup and handed around as a read-only [`CatalogHandle`].

mod handle;
mod local;
mod record;

pub use handle::CatalogHandle;
pub use local::LocalTaskCatalog;
pub use record::{DatasetEntry, TaskRecord, file_paths_from_patch};

use crate::error::BenchResult;

/// Read-only lookup of benchmark tasks
pub trait TaskCatalog: Send + Sync {
    /// Look up a single task; unknown ids are a `NotFound` error
    fn lookup(&self, task_id: &str) -> BenchResult<TaskRecord>;

    /// Look up several tasks in request order, failing on the first unknown id
    fn lookup_many(&self, task_ids: &[String]) -> BenchResult<Vec<TaskRecord>> {
        task_ids.iter().map(|id| self.lookup(id)).collect()
    }

    /// Whether the task id is known
    fn contains(&self, task_id: &str) -> bool;

    /// Number of tasks in the catalog
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
