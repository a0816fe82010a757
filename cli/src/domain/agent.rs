//! Agent descriptor construction and handshake token minting.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use std::collections::BTreeMap;

use atelier_common::AgentRecord;
use atelier_common::template::AgentTemplate;

use crate::domain::error::TemplateError;
use crate::domain::template::{interpolate, interpolate_map};

/// Environment variable the handshake token is injected under, so the
/// engine can hand it to the agent process inside the workspace.
pub const TOKEN_ENV: &str = "ATELIER_AGENT_TOKEN";

/// Mint a handshake token. One per provisioning attempt, single-use.
#[must_use]
pub fn mint_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Build the agent record for a provisioning attempt: interpolate the
/// template's startup script and environment, then inject the freshly
/// minted token under [`TOKEN_ENV`].
///
/// # Errors
///
/// Returns a [`TemplateError`] if interpolation references an unresolved
/// variable.
pub fn build_agent(
    template: &AgentTemplate,
    resolved: &BTreeMap<String, String>,
    token: String,
) -> Result<AgentRecord, TemplateError> {
    let mut env = interpolate_map(&template.env, resolved)?;
    env.insert(TOKEN_ENV.to_string(), token.clone());
    Ok(AgentRecord {
        os: template.os.clone(),
        arch: template.arch.clone(),
        startup_script: interpolate(&template.startup_script, resolved)?,
        env,
        token: Some(token),
    })
}
