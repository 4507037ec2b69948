//! `patchbench task`: print catalog records

use anyhow::Result;
use patchbench_core::catalog::CatalogHandle;
use patchbench_core::config::AppConfig;

/// Print the records for `task_ids` as a JSON array, in request order
pub async fn show(config: &AppConfig, task_ids: &[String]) -> Result<()> {
    let handle = CatalogHandle::from_config(&config.catalog);
    let tasks = handle.get()?.lookup_many(task_ids)?;
    println!("{}", serde_json::to_string_pretty(&tasks)?);
    Ok(())
}
