//! Infrastructure implementations of the `WorkspaceStore` port.
//!
//! `DirWorkspaceStore` keeps one JSON file per workspace id under
//! `~/.atelier/workspaces/`, written atomically (temp file + rename) via
//! `tokio::task::spawn_blocking`. `MemoryWorkspaceStore` backs tests and
//! embedders that don't want a filesystem.

use std::path::PathBuf;

use anyhow::{Context, Result};
use dashmap::DashMap;

use atelier_common::WorkspaceRecord;

use crate::application::ports::WorkspaceStore;
use crate::domain::workspace::validate_workspace_id;

/// Directory-backed store — the persistent workspace registry.
#[derive(Clone)]
pub struct DirWorkspaceStore {
    dir: PathBuf,
}

impl DirWorkspaceStore {
    /// Create a store at the default location (`~/.atelier/workspaces`).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        Ok(Self::with_dir(default_workspaces_dir()?))
    }

    /// Create a store rooted at an explicit directory (used in tests).
    #[must_use]
    pub fn with_dir(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn record_path(&self, workspace_id: &str) -> PathBuf {
        self.dir.join(format!("{workspace_id}.json"))
    }

    fn load_sync(&self, workspace_id: &str) -> Result<Option<WorkspaceRecord>> {
        validate_workspace_id(workspace_id)?;
        let path = self.record_path(workspace_id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("reading workspace file {}", path.display()))?;
        let record: WorkspaceRecord = serde_json::from_str(&content)
            .with_context(|| format!("parsing workspace file {}", path.display()))?;
        Ok(Some(record))
    }

    fn save_sync(&self, record: &WorkspaceRecord) -> Result<()> {
        validate_workspace_id(&record.workspace_id)?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating directory {}", self.dir.display()))?;
        let content = serde_json::to_string_pretty(record).context("serializing workspace")?;

        // Atomic write via temp file then rename, so a crash mid-write never
        // leaves a truncated record.
        let path = self.record_path(&record.workspace_id);
        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("finalizing workspace file {}", path.display()))?;
        Ok(())
    }

    fn remove_sync(&self, workspace_id: &str) -> Result<()> {
        validate_workspace_id(workspace_id)?;
        let path = self.record_path(workspace_id);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("removing workspace file {}", path.display()))?;
        }
        Ok(())
    }

    fn list_sync(&self) -> Result<Vec<WorkspaceRecord>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut records = Vec::new();
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("reading directory {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading workspace file {}", path.display()))?;
            match serde_json::from_str::<WorkspaceRecord>(&content) {
                Ok(record) => records.push(record),
                // A foreign file in the directory is not fatal to listing.
                Err(_) => continue,
            }
        }
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }
}

/// Resolve the default workspaces directory, honoring `ATELIER_HOME`.
///
/// # Errors
///
/// Returns an error if no home directory can be determined.
pub fn default_workspaces_dir() -> Result<PathBuf> {
    if let Ok(val) = std::env::var("ATELIER_HOME") {
        return Ok(PathBuf::from(val).join("workspaces"));
    }
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.join(".atelier").join("workspaces"))
}

impl WorkspaceStore for DirWorkspaceStore {
    async fn load(&self, workspace_id: &str) -> Result<Option<WorkspaceRecord>> {
        let store = self.clone();
        let id = workspace_id.to_string();
        tokio::task::spawn_blocking(move || store.load_sync(&id))
            .await
            .context("workspace load task panicked")?
    }

    async fn save(&self, record: &WorkspaceRecord) -> Result<()> {
        let store = self.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || store.save_sync(&record))
            .await
            .context("workspace save task panicked")?
    }

    async fn remove(&self, workspace_id: &str) -> Result<()> {
        let store = self.clone();
        let id = workspace_id.to_string();
        tokio::task::spawn_blocking(move || store.remove_sync(&id))
            .await
            .context("workspace remove task panicked")?
    }

    async fn list(&self) -> Result<Vec<WorkspaceRecord>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.list_sync())
            .await
            .context("workspace list task panicked")?
    }
}

/// In-memory store for embedding and tests. Concurrent-safe per key.
#[derive(Default)]
pub struct MemoryWorkspaceStore {
    records: DashMap<String, WorkspaceRecord>,
}

impl MemoryWorkspaceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkspaceStore for MemoryWorkspaceStore {
    async fn load(&self, workspace_id: &str) -> Result<Option<WorkspaceRecord>> {
        Ok(self.records.get(workspace_id).map(|r| r.clone()))
    }

    async fn save(&self, record: &WorkspaceRecord) -> Result<()> {
        self.records
            .insert(record.workspace_id.clone(), record.clone());
        Ok(())
    }

    async fn remove(&self, workspace_id: &str) -> Result<()> {
        self.records.remove(workspace_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<WorkspaceRecord>> {
        let mut records: Vec<_> = self.records.iter().map(|r| r.clone()).collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::collections::BTreeMap;

    use atelier_common::{AgentRecord, LifecyclePhase};
    use chrono::Utc;

    use super::*;

    fn record(id: &str) -> WorkspaceRecord {
        WorkspaceRecord {
            workspace_id: id.to_string(),
            owner: "dev".to_string(),
            template: "rust-dev".to_string(),
            phase: LifecyclePhase::Pending,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            resource_id: None,
            last_error: None,
            variables: BTreeMap::new(),
            template_digest: None,
            agent: AgentRecord {
                os: "linux".to_string(),
                arch: "amd64".to_string(),
                startup_script: String::new(),
                env: BTreeMap::new(),
                token: None,
            },
            apps: vec![],
        }
    }

    #[tokio::test]
    async fn save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirWorkspaceStore::with_dir(dir.path().to_path_buf());
        let rec = record("atl-0123456789abcdef");

        store.save(&rec).await.unwrap();
        let loaded = store.load("atl-0123456789abcdef").await.unwrap().unwrap();
        assert_eq!(loaded.workspace_id, rec.workspace_id);
        assert_eq!(loaded.phase, LifecyclePhase::Pending);
    }

    #[tokio::test]
    async fn load_unknown_id_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirWorkspaceStore::with_dir(dir.path().to_path_buf());
        assert!(store.load("atl-0123456789abcdef").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn load_rejects_malformed_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirWorkspaceStore::with_dir(dir.path().to_path_buf());
        assert!(store.load("../../etc/passwd").await.is_err());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirWorkspaceStore::with_dir(dir.path().to_path_buf());
        let rec = record("atl-0123456789abcdef");
        store.save(&rec).await.unwrap();

        store.remove("atl-0123456789abcdef").await.unwrap();
        assert!(store.load("atl-0123456789abcdef").await.unwrap().is_none());
        // Second remove succeeds silently.
        store.remove("atl-0123456789abcdef").await.unwrap();
    }

    #[tokio::test]
    async fn list_returns_records_oldest_first_and_skips_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirWorkspaceStore::with_dir(dir.path().to_path_buf());

        let mut first = record("atl-0123456789abcdef");
        first.created_at = Utc::now() - chrono::Duration::minutes(5);
        let second = record("atl-fedcba9876543210");
        store.save(&second).await.unwrap();
        store.save(&first).await.unwrap();
        std::fs::write(dir.path().join("notes.json"), "not a record").unwrap();
        std::fs::write(dir.path().join("README.md"), "hi").unwrap();

        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].workspace_id, "atl-0123456789abcdef");
        assert_eq!(listed[1].workspace_id, "atl-fedcba9876543210");
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = DirWorkspaceStore::with_dir(dir.path().to_path_buf());
        store.save(&record("atl-0123456789abcdef")).await.unwrap();
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryWorkspaceStore::new();
        let rec = record("atl-0123456789abcdef");
        store.save(&rec).await.unwrap();
        assert!(store.load("atl-0123456789abcdef").await.unwrap().is_some());
        store.remove("atl-0123456789abcdef").await.unwrap();
        assert!(store.load("atl-0123456789abcdef").await.unwrap().is_none());
    }
}
