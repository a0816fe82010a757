//! Up command — provision a workspace from a template.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tokio_util::sync::CancellationToken;

use crate::app::AppContext;
use crate::application::ports::WorkspaceStore;
use crate::application::services::provision::{
    ProvisionOutcome, ProvisionRequest, provision_workspace,
};
use crate::commands::{load_template, parse_vars, resolve_owner};
use crate::output::reporter::TerminalReporter;
use crate::output::{OutputContext, human::HumanRenderer, json};

/// Arguments for the `atelier up` command.
#[derive(Args)]
pub struct UpArgs {
    /// Template manifest to provision from.
    #[arg(long, default_value = "template.yaml")]
    pub template: PathBuf,

    /// Variable override, repeatable (name=value).
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,

    /// Workspace owner (defaults to $USER).
    #[arg(long, env = "ATELIER_OWNER")]
    pub owner: Option<String>,
}

/// Entry point for `atelier up`.
///
/// Ctrl-C while the handshake is pending interrupts the flow and unwinds
/// the workspace through the destroy path.
///
/// # Errors
///
/// Returns an error if the template is invalid, the engine rejects the
/// create, or the handshake fails.
pub async fn run(app: &AppContext, ctx: &OutputContext, args: &UpArgs, json_mode: bool) -> Result<()> {
    let (manifest, bytes) = load_template(&args.template)?;
    let overrides = parse_vars(&args.vars)?;
    let owner = resolve_owner(args.owner.as_deref());

    app.engine.check_version().await?;

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    let signal_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let reporter = TerminalReporter::new(ctx);
    let outcome = provision_workspace(
        &app.engine,
        &app.channel,
        &app.store,
        &app.registry,
        &reporter,
        app.handshake_wait(),
        ProvisionRequest {
            manifest: &manifest,
            manifest_bytes: &bytes,
            overrides,
            owner,
            cancel,
        },
    )
    .await;
    signal_task.abort();
    let outcome = outcome?;

    match &outcome {
        ProvisionOutcome::Ready { workspace_id } => {
            if json_mode {
                let rec = app.store.load(workspace_id).await?;
                println!("{}", json::format_value(&rec)?);
            } else {
                ctx.success(&format!("workspace {workspace_id} is ready"));
                if let Ok(Some(rec)) = app.store.load(workspace_id).await
                    && !rec.apps.is_empty()
                {
                    println!();
                    ctx.header("Apps:");
                    HumanRenderer::new(ctx).render_apps(&rec.apps);
                }
                ctx.info(&format!("inspect it: atelier status {workspace_id}"));
            }
        }
        ProvisionOutcome::Cancelled { workspace_id } => {
            if json_mode {
                let rec = app.store.load(workspace_id).await?;
                println!("{}", json::format_value(&rec)?);
            } else {
                ctx.warn(&format!("workspace {workspace_id} was cancelled and destroyed"));
            }
        }
    }
    Ok(())
}
