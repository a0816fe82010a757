//! List command — all workspaces and their phases.

use anyhow::Result;

use atelier_common::WorkspaceSummary;

use crate::application::ports::WorkspaceStore;
use crate::output::{OutputContext, human::HumanRenderer, json};

/// Entry point for `atelier list`.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn run(ctx: &OutputContext, store: &impl WorkspaceStore, json_mode: bool) -> Result<()> {
    let records = store.list().await?;
    let summaries: Vec<WorkspaceSummary> = records.iter().map(WorkspaceSummary::from).collect();

    if json_mode {
        println!("{}", json::format_value(&summaries)?);
    } else {
        HumanRenderer::new(ctx).render_list(&summaries);
    }
    Ok(())
}
