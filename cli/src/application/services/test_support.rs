//! Shared stubs for application-service tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use anyhow::Result;
use chrono::Utc;

use atelier_common::{AgentRecord, LifecyclePhase, WorkspaceRecord};

use crate::application::ports::WorkspaceStore;

/// In-memory `WorkspaceStore` stub that also logs every persisted phase,
/// so tests can assert on the transition history.
#[derive(Default)]
pub struct MemoryStoreStub {
    records: Mutex<HashMap<String, WorkspaceRecord>>,
    saved_phases: Mutex<Vec<LifecyclePhase>>,
}

impl MemoryStoreStub {
    pub fn phase_history(&self) -> Vec<LifecyclePhase> {
        self.saved_phases.lock().expect("lock").clone()
    }
}

impl WorkspaceStore for MemoryStoreStub {
    async fn load(&self, workspace_id: &str) -> Result<Option<WorkspaceRecord>> {
        Ok(self.records.lock().expect("lock").get(workspace_id).cloned())
    }

    async fn save(&self, record: &WorkspaceRecord) -> Result<()> {
        self.saved_phases.lock().expect("lock").push(record.phase);
        self.records
            .lock()
            .expect("lock")
            .insert(record.workspace_id.clone(), record.clone());
        Ok(())
    }

    async fn remove(&self, workspace_id: &str) -> Result<()> {
        self.records.lock().expect("lock").remove(workspace_id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<WorkspaceRecord>> {
        Ok(self.records.lock().expect("lock").values().cloned().collect())
    }
}

/// A record already in `provisioning`, carrying the given handshake token.
pub fn provisioning_record(token: &str) -> WorkspaceRecord {
    WorkspaceRecord {
        workspace_id: "atl-0123456789abcdef".to_string(),
        owner: "dev".to_string(),
        template: "rust-dev".to_string(),
        phase: LifecyclePhase::Provisioning,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        resource_id: Some("res-1".to_string()),
        last_error: None,
        variables: BTreeMap::new(),
        template_digest: None,
        agent: AgentRecord {
            os: "linux".to_string(),
            arch: "amd64".to_string(),
            startup_script: String::new(),
            env: BTreeMap::new(),
            token: Some(token.to_string()),
        },
        apps: vec![],
    }
}
