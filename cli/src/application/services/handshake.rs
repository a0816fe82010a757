//! Application service — agent handshake tracking.
//!
//! Walks a workspace through `provisioning → starting → ready` by polling
//! the external handshake channel. Imports only from `crate::domain` and
//! `crate::application::ports`.

use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use atelier_common::{LifecyclePhase, ScriptState, WorkspaceRecord};

use crate::application::ports::{HandshakeChannel, ProgressReporter, WorkspaceStore};
use crate::domain::error::HandshakeError;
use crate::domain::workspace::{mark_ready, mark_starting};

/// Wait budget for one handshake. Both stages are bounded separately.
#[derive(Debug, Clone, Copy)]
pub struct HandshakeWait {
    /// Budget for the agent's first token presentation.
    pub connect_timeout: Duration,
    /// Budget for startup-script completion after the token matched.
    pub startup_timeout: Duration,
    /// Delay between channel polls.
    pub poll_interval: Duration,
}

impl Default for HandshakeWait {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(120),
            startup_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl HandshakeWait {
    /// Build a wait budget from the configured timeouts.
    #[must_use]
    pub fn from_config(config: &crate::domain::config::HandshakeConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            startup_timeout: Duration::from_secs(config.startup_timeout_secs),
            ..Self::default()
        }
    }
}

/// How a tracked handshake ended, short of an error.
#[derive(Debug, PartialEq, Eq)]
pub enum TrackOutcome {
    /// Agent connected and its startup script completed.
    Ready,
    /// The wait was interrupted by cancellation; no transition was made.
    /// The caller proceeds directly to the destroy path.
    Cancelled,
}

/// Track the agent handshake for a workspace in `provisioning`.
///
/// On token match the workspace moves to `starting` (consuming the token);
/// on reported script completion it moves to `ready`. Both transitions are
/// persisted as they happen. The wait is a suspension point: it holds no
/// locks and reacts to `cancel` at every await.
///
/// # Errors
///
/// [`HandshakeError::Timeout`] when a stage budget runs out,
/// [`HandshakeError::TokenMismatch`] on a wrong token (fatal, not retried),
/// [`HandshakeError::ScriptFailed`] when the agent reports a failed script.
/// The caller owns the transition to `failed`.
pub async fn track_agent(
    channel: &impl HandshakeChannel,
    store: &impl WorkspaceStore,
    rec: &mut WorkspaceRecord,
    wait: HandshakeWait,
    cancel: &CancellationToken,
    reporter: &impl ProgressReporter,
) -> Result<TrackOutcome> {
    let Some(expected) = rec.agent.token.clone() else {
        // A record in `provisioning` always carries its attempt's token;
        // its absence means the handshake already ran.
        return Err(HandshakeError::TokenMismatch.into());
    };

    // Stage 1: wait for the agent to present its token.
    let deadline = Instant::now() + wait.connect_timeout;
    loop {
        let report = tokio::select! {
            () = cancel.cancelled() => return Ok(TrackOutcome::Cancelled),
            report = channel.poll(&rec.workspace_id) => report,
        };
        // Channel unavailability is indistinguishable from a not-yet-started
        // agent until the deadline passes.
        if let Ok(Some(report)) = report {
            if report.token != expected {
                return Err(HandshakeError::TokenMismatch.into());
            }
            mark_starting(rec)?;
            store.save(rec).await?;
            reporter.step("agent connected, running startup script...");
            break;
        }
        if Instant::now() + wait.poll_interval > deadline {
            return Err(HandshakeError::Timeout {
                waiting_for: LifecyclePhase::Starting,
                timeout_secs: wait.connect_timeout.as_secs(),
            }
            .into());
        }
        tokio::select! {
            () = cancel.cancelled() => return Ok(TrackOutcome::Cancelled),
            () = tokio::time::sleep(wait.poll_interval) => {}
        }
    }

    // Stage 2: wait for the startup script to finish.
    let deadline = Instant::now() + wait.startup_timeout;
    loop {
        let report = tokio::select! {
            () = cancel.cancelled() => return Ok(TrackOutcome::Cancelled),
            report = channel.poll(&rec.workspace_id) => report,
        };
        if let Ok(Some(report)) = report {
            match report.script_state {
                ScriptState::Completed => {
                    mark_ready(rec)?;
                    store.save(rec).await?;
                    return Ok(TrackOutcome::Ready);
                }
                ScriptState::Failed => {
                    let detail = report
                        .script_error
                        .unwrap_or_else(|| "no detail reported".to_string());
                    return Err(HandshakeError::ScriptFailed(detail).into());
                }
                ScriptState::Pending => {}
            }
        }
        if Instant::now() + wait.poll_interval > deadline {
            return Err(HandshakeError::Timeout {
                waiting_for: LifecyclePhase::Ready,
                timeout_secs: wait.startup_timeout.as_secs(),
            }
            .into());
        }
        tokio::select! {
            () = cancel.cancelled() => return Ok(TrackOutcome::Cancelled),
            () = tokio::time::sleep(wait.poll_interval) => {}
        }
    }
}
