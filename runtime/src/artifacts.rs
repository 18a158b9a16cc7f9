//! JSON artifacts on disk: the work list, the raw URL list, manifests.

use anyhow::{Context, Result};
use pack_catalog::WorkList;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// Read and parse a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// Write pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

/// Write JSON to `<stem>.tmp.json` next to `path`, then rename over `path`.
///
/// Readers of `path` see either the old document or the new one.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let tmp = path.with_extension("tmp.json");
    write_json(&tmp, value)?;
    std::fs::rename(&tmp, path).with_context(|| {
        format!("failed to move {} to {}", tmp.display(), path.display())
    })
}

/// The work list, or an empty one when the file does not exist yet.
pub fn read_work_list(path: &Path) -> Result<WorkList> {
    if !path.exists() {
        tracing::warn!("{} not found, treating as empty", path.display());
        return Ok(WorkList::default());
    }
    read_json(path)
}
