//! Application service — workspace teardown use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::Result;

use atelier_common::{LifecyclePhase, WorkspaceRecord};

use crate::application::ports::{ProgressReporter, ProvisioningEngine, WorkspaceStore};
use crate::application::services::registry::WorkspaceRegistry;
use crate::domain::error::{EngineError, WorkspaceError};
use crate::domain::workspace::mark_destroyed;

/// Outcome of the `teardown_workspace` use-case.
#[derive(Debug, PartialEq, Eq)]
pub enum TeardownOutcome {
    /// The resource was destroyed and the record marked `destroyed`.
    Destroyed,
    /// The workspace was already destroyed; nothing was done.
    AlreadyDestroyed,
    /// A provisioning flow was mid-handshake; it has been signalled and
    /// will unwind through its own destroy path.
    CancellationRequested,
}

/// Tear down a workspace.
///
/// Idempotent: tearing down an already-destroyed workspace is a no-op
/// success. A teardown requested while the workspace is mid-provisioning
/// interrupts the handshake wait instead of racing it for the engine.
///
/// # Errors
///
/// Returns `WorkspaceError::NotFound` for an unknown id, or the engine's
/// destroy error verbatim.
pub async fn teardown_workspace(
    engine: &impl ProvisioningEngine,
    store: &impl WorkspaceStore,
    registry: &WorkspaceRegistry,
    reporter: &impl ProgressReporter,
    workspace_id: &str,
) -> Result<TeardownOutcome> {
    let mut rec = store
        .load(workspace_id)
        .await?
        .ok_or_else(|| WorkspaceError::NotFound(workspace_id.to_string()))?;

    if registry.cancel(workspace_id) {
        reporter.warn("provisioning in progress, interrupting it");
        return Ok(TeardownOutcome::CancellationRequested);
    }

    if rec.phase == LifecyclePhase::Destroyed {
        return Ok(TeardownOutcome::AlreadyDestroyed);
    }

    if let Some(resource_id) = rec.resource_id.clone() {
        reporter.step("destroying workspace resource...");
        engine
            .destroy(&resource_id)
            .await
            .map_err(|err| EngineError::DestroyFailed {
                resource_id,
                message: err.to_string(),
            })?;
    }

    mark_destroyed(&mut rec);
    store.save(&rec).await?;
    reporter.success("workspace destroyed");
    Ok(TeardownOutcome::Destroyed)
}

/// Best-effort resource destroy used by the cancellation path. Failures are
/// swallowed: the flow is already unwinding and the record keeps the
/// resource id for a later explicit teardown.
pub async fn destroy_resource(engine: &impl ProvisioningEngine, rec: &WorkspaceRecord) {
    if let Some(resource_id) = &rec.resource_id {
        let _ = engine.destroy(resource_id).await;
    }
}
