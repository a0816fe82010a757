//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `atelier_common` — never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

use anyhow::Result;

use atelier_common::{AgentReport, ResourceGraph, WorkspaceRecord};

// ── Provisioning Engine Port ──────────────────────────────────────────────────

/// The external infrastructure engine, reduced to the two operations the
/// orchestrator needs. Everything behind it (planning, drivers, cloud APIs)
/// is out of scope.
#[allow(async_fn_in_trait)]
pub trait ProvisioningEngine {
    /// Submit a create operation. Returns the engine's resource identifier.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::CreateFailed` carrying the engine's error text
    /// verbatim. The orchestrator never retries; that is the caller's call.
    async fn create(&self, graph: &ResourceGraph) -> Result<String>;

    /// Destroy a previously created resource. Idempotent: destroying a
    /// resource that no longer exists succeeds.
    async fn destroy(&self, resource_id: &str) -> Result<()>;
}

// ── Handshake Channel Port ────────────────────────────────────────────────────

/// The external rendezvous channel agents report to. The orchestrator only
/// polls; it never serves the channel itself.
#[allow(async_fn_in_trait)]
pub trait HandshakeChannel {
    /// What, if anything, the agent for `workspace_id` has presented so far.
    ///
    /// `Ok(None)` means no presentation yet — keep polling.
    async fn poll(&self, workspace_id: &str) -> Result<Option<AgentReport>>;
}

// ── Workspace Store Port ──────────────────────────────────────────────────────

/// Persistence for workspace records, keyed by workspace id. Implementations
/// must be safe for concurrent use across workspace identifiers; writes to a
/// single identifier are serialized by the flow registry, not the store.
#[allow(async_fn_in_trait)]
pub trait WorkspaceStore {
    /// Load one record, returning `None` if the id is unknown.
    async fn load(&self, workspace_id: &str) -> Result<Option<WorkspaceRecord>>;
    /// Persist one record, replacing any previous version.
    async fn save(&self, record: &WorkspaceRecord) -> Result<()>;
    /// Remove one record. Removing an unknown id is a no-op.
    async fn remove(&self, workspace_id: &str) -> Result<()>;
    /// All records, in unspecified order.
    async fn list(&self) -> Result<Vec<WorkspaceRecord>>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    async fn run(&self, program: &str, args: &[&str]) -> Result<std::process::Output>;

    /// Run a program with stdin piped from `input`.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds the
    /// runner's timeout. On timeout, the child process must be killed (not
    /// left orphaned).
    async fn run_with_stdin(
        &self,
        program: &str,
        args: &[&str],
        input: &[u8],
    ) -> Result<std::process::Output>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

/// Reporter that swallows everything. Used by non-interactive callers and
/// tests.
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn step(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warn(&self, _: &str) {}
}

// ── Config Store Port ─────────────────────────────────────────────────────────

/// Abstracts configuration persistence (load/save). Sync — config files are
/// tiny and read once per command.
pub trait ConfigStore {
    /// Load the configuration, falling back to defaults when absent.
    fn load(&self) -> Result<crate::domain::config::AtelierConfig>;
    /// Persist the configuration.
    fn save(&self, config: &crate::domain::config::AtelierConfig) -> Result<()>;
    /// Path of the backing file (for display).
    fn path(&self) -> Result<std::path::PathBuf>;
}
