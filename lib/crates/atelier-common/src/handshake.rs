//! Wire types for the agent handshake channel.
//!
//! The agent process inside a workspace presents `(workspace_id, token)` to
//! the rendezvous endpoint; the orchestrator only polls. These types mirror
//! the endpoint's JSON responses.

use serde::{Deserialize, Serialize};

/// Startup-script progress as reported alongside the handshake.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScriptState {
    /// Script has not finished yet.
    Pending,
    /// Script exited successfully.
    Completed,
    /// Script exited with an error.
    Failed,
}

/// What the agent has presented to the handshake channel so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    /// Token the agent presented.
    pub token: String,
    /// Startup-script status.
    pub script_state: ScriptState,
    /// Failure detail when `script_state` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_error: Option<String>,
}
