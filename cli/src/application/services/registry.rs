//! In-flight provisioning flow registry.
//!
//! The persisted workspace registry is the [`WorkspaceStore`]; this one
//! tracks which workspace identifiers currently have a live provisioning
//! flow, and holds the cancellation handle for each. One active flow per
//! identifier — that is all the serialization concurrent workspaces need,
//! since flows for different identifiers share no mutable state.
//!
//! [`WorkspaceStore`]: crate::application::ports::WorkspaceStore

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio_util::sync::CancellationToken;

use crate::domain::error::WorkspaceError;

/// Registry of in-flight provisioning flows, keyed by workspace id.
#[derive(Default)]
pub struct WorkspaceRegistry {
    flows: DashMap<String, CancellationToken>,
}

impl WorkspaceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a flow for `workspace_id`, guarding it with `cancel`.
    ///
    /// # Errors
    ///
    /// Returns `WorkspaceError::FlowInProgress` if a flow is already active
    /// for this identifier.
    pub fn begin(&self, workspace_id: &str, cancel: CancellationToken) -> Result<(), WorkspaceError> {
        match self.flows.entry(workspace_id.to_string()) {
            Entry::Occupied(_) => Err(WorkspaceError::FlowInProgress(workspace_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(cancel);
                Ok(())
            }
        }
    }

    /// Deregister the flow for `workspace_id`. Safe to call when absent.
    pub fn finish(&self, workspace_id: &str) {
        self.flows.remove(workspace_id);
    }

    /// Request cancellation of the active flow, if any.
    ///
    /// Returns `true` when a flow was signalled. The flow itself unwinds the
    /// workspace (destroy path) and deregisters.
    pub fn cancel(&self, workspace_id: &str) -> bool {
        if let Some(token) = self.flows.get(workspace_id) {
            token.cancel();
            true
        } else {
            false
        }
    }

    /// Whether a flow is currently active for `workspace_id`.
    #[must_use]
    pub fn is_active(&self, workspace_id: &str) -> bool {
        self.flows.contains_key(workspace_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn begin_twice_is_rejected() {
        let registry = WorkspaceRegistry::new();
        registry
            .begin("atl-0123456789abcdef", CancellationToken::new())
            .unwrap();
        let err = registry
            .begin("atl-0123456789abcdef", CancellationToken::new())
            .unwrap_err();
        assert_eq!(
            err,
            WorkspaceError::FlowInProgress("atl-0123456789abcdef".to_string())
        );
    }

    #[test]
    fn distinct_ids_do_not_contend() {
        let registry = WorkspaceRegistry::new();
        registry
            .begin("atl-0123456789abcdef", CancellationToken::new())
            .unwrap();
        registry
            .begin("atl-fedcba9876543210", CancellationToken::new())
            .unwrap();
        assert!(registry.is_active("atl-0123456789abcdef"));
        assert!(registry.is_active("atl-fedcba9876543210"));
    }

    #[test]
    fn finish_allows_a_fresh_flow() {
        let registry = WorkspaceRegistry::new();
        registry
            .begin("atl-0123456789abcdef", CancellationToken::new())
            .unwrap();
        registry.finish("atl-0123456789abcdef");
        assert!(!registry.is_active("atl-0123456789abcdef"));
        assert!(
            registry
                .begin("atl-0123456789abcdef", CancellationToken::new())
                .is_ok()
        );
    }

    #[test]
    fn cancel_signals_the_registered_token() {
        let registry = WorkspaceRegistry::new();
        let token = CancellationToken::new();
        registry
            .begin("atl-0123456789abcdef", token.clone())
            .unwrap();
        assert!(registry.cancel("atl-0123456789abcdef"));
        assert!(token.is_cancelled());
        assert!(!registry.cancel("atl-unknown0000000000"));
    }
}
