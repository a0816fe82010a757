//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

use atelier_common::LifecyclePhase;

// ── Template errors ───────────────────────────────────────────────────────────

/// Errors raised while resolving template variables. Caller-fixable; never
/// retried by the orchestrator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Variable '{variable}' has no value: pass --var {variable}=<value> or add a default.")]
    MissingValue { variable: String },

    #[error("Variable '{variable}' rejected value '{value}': {reason}")]
    ValidationFailed {
        variable: String,
        value: String,
        reason: String,
    },

    #[error("Unknown variable '{variable}': the template does not declare it.")]
    UnknownOverride { variable: String },

    #[error("'${{{variable}}}' is not a resolved variable.")]
    UnresolvedReference { variable: String },

    #[error("Variable '{variable}' is immutable and cannot change on rebuild.")]
    ImmutableVariable { variable: String },
}

// ── Workspace errors ──────────────────────────────────────────────────────────

/// Errors related to workspace lifecycle and identity.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("Workspace '{0}' not found. Run 'atelier list' to see workspaces.")]
    NotFound(String),

    #[error("Invalid workspace ID: {0}")]
    InvalidId(String),

    #[error("Workspace cannot move from '{from}' to '{to}'.")]
    InvalidTransition {
        from: LifecyclePhase,
        to: LifecyclePhase,
    },

    #[error("Workspace '{0}' already has a provisioning flow in progress.")]
    FlowInProgress(String),
}

// ── Engine errors ─────────────────────────────────────────────────────────────

/// Failures reported by the external provisioning engine. The message is
/// carried verbatim; whether to retry is the caller's decision.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("provisioning engine failed to create workspace: {message}")]
    CreateFailed { message: String },

    #[error("provisioning engine failed to destroy resource '{resource_id}': {message}")]
    DestroyFailed {
        resource_id: String,
        message: String,
    },

    #[error("provisioning engine unavailable: {0}\n\nCheck 'atelier config get engine.binary'.")]
    Unavailable(String),
}

// ── Handshake errors ──────────────────────────────────────────────────────────

/// Failures of the agent handshake. Both variants move the workspace to
/// `failed`; neither is retried within the same provisioning attempt.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("agent did not reach '{waiting_for}' within {timeout_secs}s")]
    Timeout {
        waiting_for: LifecyclePhase,
        timeout_secs: u64,
    },

    #[error("agent presented a token that does not match this workspace")]
    TokenMismatch,

    #[error("agent startup script failed: {0}")]
    ScriptFailed(String),
}

// ── App errors ────────────────────────────────────────────────────────────────

/// Errors related to app endpoint registration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("App slug '{0}' is already registered for this agent.")]
    DuplicateSlug(String),

    #[error("Invalid app slug '{0}': must match ^[a-z0-9]([a-z0-9-]{{0,38}}[a-z0-9])?$")]
    InvalidSlug(String),

    #[error("Apps can only be registered against a ready workspace (phase is '{0}').")]
    AgentNotReady(LifecyclePhase),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },
}
