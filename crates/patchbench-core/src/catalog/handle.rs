//! Shared, read-only handle to the task catalog

use std::sync::Arc;

use super::{LocalTaskCatalog, TaskCatalog};
use crate::config::CatalogConfig;
use crate::error::{BenchError, BenchResult};

#[derive(Clone)]
enum CatalogState {
    Ready(Arc<dyn TaskCatalog>),
    Unavailable { reason: String },
}

/// Catalog handle created once at startup and cloned into every consumer.
///
/// A catalog that failed to load is represented as `Unavailable` rather than
/// aborting startup, so evaluation keeps working without task metadata.
#[derive(Clone)]
pub struct CatalogHandle {
    state: CatalogState,
}

impl CatalogHandle {
    /// Wrap a loaded catalog
    pub fn ready(catalog: impl TaskCatalog + 'static) -> Self {
        Self {
            state: CatalogState::Ready(Arc::new(catalog)),
        }
    }

    /// A handle without a catalog
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: CatalogState::Unavailable {
                reason: reason.into(),
            },
        }
    }

    /// Load the catalog described by the configuration
    pub fn from_config(config: &CatalogConfig) -> Self {
        let Some(path) = config.dataset_path.as_ref() else {
            tracing::warn!("No dataset configured; task lookups are disabled");
            return Self::unavailable("no dataset configured");
        };

        match LocalTaskCatalog::from_path(path) {
            Ok(catalog) => Self::ready(catalog),
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Error loading dataset");
                Self::unavailable(e.to_string())
            }
        }
    }

    /// The catalog, or `CatalogUnavailable`
    pub fn get(&self) -> BenchResult<&dyn TaskCatalog> {
        match &self.state {
            CatalogState::Ready(catalog) => Ok(catalog.as_ref()),
            CatalogState::Unavailable { reason } => Err(BenchError::catalog_unavailable(format!(
                "Dataset not properly initialized ({})",
                reason
            ))),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, CatalogState::Ready(_))
    }

    /// Short status for health reporting
    pub fn status(&self) -> &'static str {
        if self.is_ready() { "ready" } else { "unavailable" }
    }
}

impl std::fmt::Debug for CatalogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            CatalogState::Ready(catalog) => f
                .debug_struct("CatalogHandle")
                .field("tasks", &catalog.len())
                .finish(),
            CatalogState::Unavailable { reason } => f
                .debug_struct("CatalogHandle")
                .field("unavailable", reason)
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DatasetEntry;
    use crate::error::UnifiedError;
    use std::path::PathBuf;

    #[test]
    fn test_unconfigured_catalog_is_unavailable() {
        let handle = CatalogHandle::from_config(&CatalogConfig::default());
        assert!(!handle.is_ready());
        assert_eq!(handle.status(), "unavailable");
        let err = handle.get().err().unwrap();
        assert_eq!(err.error_code(), "BENCH_CATALOG_UNAVAILABLE");
        assert!(err.to_string().contains("Dataset not properly initialized"));
    }

    #[test]
    fn test_unreadable_dataset_is_unavailable() {
        let handle = CatalogHandle::from_config(&CatalogConfig {
            dataset_path: Some(PathBuf::from("/no/such/file.jsonl")),
        });
        assert!(!handle.is_ready());
    }

    #[test]
    fn test_ready_handle_is_shared_by_clones() {
        let handle = CatalogHandle::ready(LocalTaskCatalog::from_entries(vec![DatasetEntry {
            instance_id: "a__a-1".to_string(),
            ..Default::default()
        }]));
        let clone = handle.clone();
        assert_eq!(clone.status(), "ready");
        assert!(clone.get().unwrap().contains("a__a-1"));
    }
}
