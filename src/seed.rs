//! Administrative bulk loading of bookmarks from a JSON export.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::model::Bookmark;
use crate::storage::DocumentStore;

/// Reads a JSON array of bookmark documents. `_id` is optional per entry.
pub fn load_file(path: &Path) -> Result<Vec<Bookmark>> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read seed file {}", path.display()))?;
    parse(&raw).with_context(|| format!("failed to parse seed file {}", path.display()))
}

pub fn parse(raw: &str) -> Result<Vec<Bookmark>> {
    Ok(serde_json::from_str(raw)?)
}

pub async fn seed(store: &DocumentStore, path: &Path) -> Result<usize> {
    let mut bookmarks = load_file(path)?;
    let count = store.bulk_insert(&mut bookmarks).await?;
    tracing::info!(count, path = %path.display(), "seeded bookmarks");
    Ok(count)
}
