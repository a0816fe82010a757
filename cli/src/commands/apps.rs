//! Apps command — registered app endpoints of a workspace.

use anyhow::Result;
use clap::Args;

use crate::application::ports::WorkspaceStore;
use crate::domain::apps::find_app;
use crate::domain::error::WorkspaceError;
use crate::domain::workspace::validate_workspace_id;
use crate::output::{OutputContext, human::HumanRenderer, json};

/// Arguments for the `atelier apps` command.
#[derive(Args)]
pub struct AppsArgs {
    /// Workspace whose apps to list.
    pub workspace_id: String,

    /// Look up one app by slug instead of listing all.
    #[arg(long)]
    pub slug: Option<String>,
}

/// Entry point for `atelier apps`.
///
/// # Errors
///
/// Returns an error for an unknown workspace or slug.
pub async fn run(
    ctx: &OutputContext,
    store: &impl WorkspaceStore,
    args: &AppsArgs,
    json_mode: bool,
) -> Result<()> {
    validate_workspace_id(&args.workspace_id)?;
    let rec = store
        .load(&args.workspace_id)
        .await?
        .ok_or_else(|| WorkspaceError::NotFound(args.workspace_id.clone()))?;

    if let Some(slug) = &args.slug {
        let app = find_app(&rec, slug)
            .ok_or_else(|| anyhow::anyhow!("no app '{slug}' in workspace {}", rec.workspace_id))?;
        if json_mode {
            println!("{}", json::format_value(app)?);
        } else {
            HumanRenderer::new(ctx).render_apps(std::slice::from_ref(app));
        }
        return Ok(());
    }

    if json_mode {
        println!("{}", json::format_value(&rec.apps)?);
    } else {
        HumanRenderer::new(ctx).render_apps(&rec.apps);
    }
    Ok(())
}
