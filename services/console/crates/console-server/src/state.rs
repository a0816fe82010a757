//! Shared server state — a read-only view over the workspace store
//! directory the CLI writes.

use std::path::PathBuf;

use anyhow::{Context, Result};

use atelier_common::WorkspaceRecord;

/// Read-only accessor for the on-disk workspace records.
#[derive(Clone)]
pub struct AppState {
    workspaces_dir: PathBuf,
}

impl AppState {
    #[must_use]
    pub fn new(workspaces_dir: PathBuf) -> Self {
        Self { workspaces_dir }
    }

    /// Load all workspace records, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub async fn list(&self) -> Result<Vec<WorkspaceRecord>> {
        let dir = self.workspaces_dir.clone();
        tokio::task::spawn_blocking(move || list_sync(&dir))
            .await
            .context("workspace list task panicked")?
    }

    /// Load one workspace record by id, with the handshake token redacted.
    ///
    /// Returns `Ok(None)` for an unknown or malformed id.
    ///
    /// # Errors
    ///
    /// Returns an error if the record file exists but cannot be parsed.
    pub async fn load(&self, workspace_id: &str) -> Result<Option<WorkspaceRecord>> {
        if !valid_id(workspace_id) {
            return Ok(None);
        }
        let path = self.workspaces_dir.join(format!("{workspace_id}.json"));
        tokio::task::spawn_blocking(move || load_sync(&path))
            .await
            .context("workspace load task panicked")?
    }
}

/// Workspace ids are `atl-` plus 16 hex chars. Anything else is rejected
/// before it can touch the filesystem.
fn valid_id(id: &str) -> bool {
    id.len() == 20
        && id.starts_with("atl-")
        && id[4..].chars().all(|c| c.is_ascii_hexdigit())
}

fn load_sync(path: &std::path::Path) -> Result<Option<WorkspaceRecord>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let record: WorkspaceRecord =
        serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(redact(record)))
}

fn list_sync(dir: &std::path::Path) -> Result<Vec<WorkspaceRecord>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut records = Vec::new();
    for entry in
        std::fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        if let Ok(record) = serde_json::from_str::<WorkspaceRecord>(&content) {
            records.push(redact(record));
        }
    }
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(records)
}

/// The console is a consumer surface; handshake tokens never leave the
/// orchestrator.
fn redact(mut record: WorkspaceRecord) -> WorkspaceRecord {
    record.agent.token = None;
    record
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn valid_id_shape() {
        assert!(valid_id("atl-0123456789abcdef"));
        assert!(!valid_id("atl-short"));
        assert!(!valid_id("../../../etc/passwd"));
        assert!(!valid_id("atl-0123456789abcdeg"));
    }

    #[tokio::test]
    async fn malformed_id_is_none_not_an_error() {
        let state = AppState::new(PathBuf::from("/nonexistent"));
        assert!(state.load("weird/../id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_dir_lists_empty() {
        let state = AppState::new(PathBuf::from("/nonexistent"));
        assert!(state.list().await.unwrap().is_empty());
    }
}
