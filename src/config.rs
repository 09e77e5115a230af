// src/config.rs

//! Loading of the storage directory's `config.toml` and `workItems.toml`.

use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::models::{Config, WorkItems};

pub const CONFIG_FILE: &str = "config.toml";
pub const WORK_ITEMS_FILE: &str = "workItems.toml";

pub fn config_path(storage_dir: &Path) -> PathBuf {
    storage_dir.join(CONFIG_FILE)
}

pub fn work_items_path(storage_dir: &Path) -> PathBuf {
    storage_dir.join(WORK_ITEMS_FILE)
}

/// Load configuration, falling back to defaults if the file is missing or
/// unreadable. The result is always validated.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = Config::load_or_default(path);
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid config {}: {e}", path.display())))?;
    Ok(config)
}

/// Load work items. A missing file means nothing to crawl; a malformed one
/// is an error.
pub fn load_work_items(path: &Path) -> Result<WorkItems> {
    if !path.exists() {
        log::warn!("No work items at {}, nothing to crawl", path.display());
        return Ok(WorkItems::default());
    }
    let items = WorkItems::load(path)?;
    items
        .validate()
        .map_err(|e| AppError::config(format!("Invalid work items {}: {e}", path.display())))?;
    Ok(items)
}

/// Load and validate both config and work items.
pub fn load_all(storage_dir: &Path, work_items: Option<&Path>) -> Result<(Config, WorkItems)> {
    let config = load_config(&config_path(storage_dir))?;
    let items_path = work_items
        .map(Path::to_path_buf)
        .unwrap_or_else(|| work_items_path(storage_dir));
    let items = load_work_items(&items_path)?;
    Ok((config, items))
}
