//! Workspace identity and lifecycle transitions.
//!
//! This module is intentionally free of I/O, async, and external layer
//! imports. All functions take data in and return data out.

use anyhow::Result;
use chrono::Utc;

use atelier_common::{LifecyclePhase, WorkspaceRecord};

use crate::domain::error::WorkspaceError;

/// Prefix of every workspace identifier.
pub const ID_PREFIX: &str = "atl-";
/// Total length of a workspace identifier (`atl-` + 16 hex chars).
pub const ID_LEN: usize = 20;

/// Validates workspace ID format.
///
/// A valid workspace ID is `atl-` followed by exactly 16 hex characters.
///
/// # Errors
///
/// Returns an error if the ID doesn't match the expected format.
pub fn validate_workspace_id(id: &str) -> Result<()> {
    if !id.starts_with(ID_PREFIX) || id.len() != ID_LEN {
        return Err(WorkspaceError::InvalidId(id.to_string()).into());
    }
    if !id[ID_PREFIX.len()..].chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(WorkspaceError::InvalidId(id.to_string()).into());
    }
    Ok(())
}

/// Generate a unique workspace identifier.
///
/// Format: `atl-` followed by 16 lowercase hex characters.
/// Entropy sources: nanosecond timestamp and two independent `RandomState`
/// hashes.
#[must_use]
pub fn generate_workspace_id() -> String {
    use std::collections::hash_map::RandomState;
    use std::hash::{BuildHasher, Hasher};

    let mut hasher = RandomState::new().build_hasher();
    hasher.write_u128(
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0),
    );
    hasher.write_u64(RandomState::new().build_hasher().finish());
    hasher.write_u64(RandomState::new().build_hasher().finish());
    format!("atl-{:016x}", hasher.finish())
}

/// Encode bytes as lowercase hex string.
///
/// Pure utility used for template digests.
#[must_use]
pub fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(char::from(HEX[(b >> 4) as usize]));
        out.push(char::from(HEX[(b & 0xf) as usize]));
    }
    out
}

/// SHA-256 of the template manifest bytes, hex-encoded.
#[must_use]
pub fn template_digest(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex_encode(&Sha256::digest(bytes))
}

// ── Phase transitions ─────────────────────────────────────────────────────────
//
// The lifecycle is a tagged-variant enum with explicit transition functions.
// Every mutation of a record's phase goes through one of these; each bumps
// `updated_at` and rejects moves the state machine does not allow.

/// `pending → provisioning`, after the engine accepted the create operation.
///
/// # Errors
///
/// Returns `WorkspaceError::InvalidTransition` from any other phase.
pub fn begin_provisioning(
    rec: &mut WorkspaceRecord,
    resource_id: String,
) -> Result<(), WorkspaceError> {
    expect_phase(rec, LifecyclePhase::Pending, LifecyclePhase::Provisioning)?;
    rec.resource_id = Some(resource_id);
    set_phase(rec, LifecyclePhase::Provisioning);
    Ok(())
}

/// `provisioning → starting`, after the agent presented a matching token.
///
/// Consumes the single-use handshake token.
///
/// # Errors
///
/// Returns `WorkspaceError::InvalidTransition` from any other phase.
pub fn mark_starting(rec: &mut WorkspaceRecord) -> Result<(), WorkspaceError> {
    expect_phase(rec, LifecyclePhase::Provisioning, LifecyclePhase::Starting)?;
    rec.agent.token = None;
    set_phase(rec, LifecyclePhase::Starting);
    Ok(())
}

/// `starting → ready`, after the startup script completed.
///
/// # Errors
///
/// Returns `WorkspaceError::InvalidTransition` from any other phase.
pub fn mark_ready(rec: &mut WorkspaceRecord) -> Result<(), WorkspaceError> {
    expect_phase(rec, LifecyclePhase::Starting, LifecyclePhase::Ready)?;
    set_phase(rec, LifecyclePhase::Ready);
    Ok(())
}

/// Any non-terminal phase `→ failed`. Terminal for this attempt: a fresh
/// attempt requires a new record.
///
/// # Errors
///
/// Returns `WorkspaceError::InvalidTransition` when already `failed` or
/// `destroyed` — a workspace fails at most once.
pub fn mark_failed(rec: &mut WorkspaceRecord, reason: &str) -> Result<(), WorkspaceError> {
    if matches!(
        rec.phase,
        LifecyclePhase::Failed | LifecyclePhase::Destroyed
    ) {
        return Err(WorkspaceError::InvalidTransition {
            from: rec.phase,
            to: LifecyclePhase::Failed,
        });
    }
    rec.last_error = Some(reason.to_string());
    set_phase(rec, LifecyclePhase::Failed);
    Ok(())
}

/// Any phase `→ destroyed`. Destroying an already-destroyed workspace is a
/// no-op success, keeping teardown idempotent.
pub fn mark_destroyed(rec: &mut WorkspaceRecord) {
    if rec.phase == LifecyclePhase::Destroyed {
        return;
    }
    rec.agent.token = None;
    set_phase(rec, LifecyclePhase::Destroyed);
}

fn expect_phase(
    rec: &WorkspaceRecord,
    from: LifecyclePhase,
    to: LifecyclePhase,
) -> Result<(), WorkspaceError> {
    if rec.phase == from {
        Ok(())
    } else {
        Err(WorkspaceError::InvalidTransition {
            from: rec.phase,
            to,
        })
    }
}

fn set_phase(rec: &mut WorkspaceRecord, phase: LifecyclePhase) {
    rec.phase = phase;
    rec.updated_at = Utc::now();
}
