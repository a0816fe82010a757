//! Status command — one workspace in detail.

use anyhow::Result;
use clap::Args;

use crate::application::ports::WorkspaceStore;
use crate::domain::error::WorkspaceError;
use crate::domain::workspace::validate_workspace_id;
use crate::output::{OutputContext, human::HumanRenderer, json};

/// Arguments for the `atelier status` command.
#[derive(Args)]
pub struct StatusArgs {
    /// Workspace to inspect.
    pub workspace_id: String,
}

/// Entry point for `atelier status`.
///
/// # Errors
///
/// Returns an error for an unknown or malformed workspace id.
pub async fn run(
    ctx: &OutputContext,
    store: &impl WorkspaceStore,
    args: &StatusArgs,
    json_mode: bool,
) -> Result<()> {
    validate_workspace_id(&args.workspace_id)?;
    let rec = store
        .load(&args.workspace_id)
        .await?
        .ok_or_else(|| WorkspaceError::NotFound(args.workspace_id.clone()))?;

    if json_mode {
        println!("{}", json::format_value(&rec)?);
    } else {
        HumanRenderer::new(ctx).render_status(&rec);
    }
    Ok(())
}
