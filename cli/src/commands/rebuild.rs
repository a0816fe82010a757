//! Rebuild command — destroy and re-provision a workspace.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::app::AppContext;
use crate::application::services::provision::{ProvisionOutcome, rebuild_workspace};
use crate::commands::{load_template, parse_vars};
use crate::domain::workspace::validate_workspace_id;
use crate::output::OutputContext;
use crate::output::reporter::TerminalReporter;

/// Arguments for the `atelier rebuild` command.
#[derive(Args)]
pub struct RebuildArgs {
    /// Workspace to rebuild.
    pub workspace_id: String,

    /// Template manifest to rebuild from.
    #[arg(long, default_value = "template.yaml")]
    pub template: PathBuf,

    /// Variable override, repeatable (name=value). Unchanged variables keep
    /// their previous values; immutable ones must not change.
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,
}

/// Entry point for `atelier rebuild`.
///
/// # Errors
///
/// Returns an error if the workspace is unknown, an immutable variable
/// would change, or teardown/provisioning fails.
pub async fn run(app: &AppContext, ctx: &OutputContext, args: &RebuildArgs) -> Result<()> {
    validate_workspace_id(&args.workspace_id)?;
    let (manifest, bytes) = load_template(&args.template)?;
    let overrides = parse_vars(&args.vars)?;

    app.engine.check_version().await?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let reporter = TerminalReporter::new(ctx);
    let outcome = rebuild_workspace(
        &app.engine,
        &app.channel,
        &app.store,
        &app.registry,
        &reporter,
        app.handshake_wait(),
        &args.workspace_id,
        &manifest,
        &bytes,
        overrides,
        cancel,
    )
    .await;
    signal_task.abort();

    match outcome? {
        ProvisionOutcome::Ready { workspace_id } => {
            ctx.success(&format!(
                "workspace {} rebuilt as {workspace_id}",
                args.workspace_id
            ));
        }
        ProvisionOutcome::Cancelled { workspace_id } => {
            ctx.warn(&format!("rebuild of {workspace_id} was cancelled"));
        }
    }
    Ok(())
}
