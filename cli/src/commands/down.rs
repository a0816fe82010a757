//! Down command — tear a workspace down.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::{NullReporter, WorkspaceStore};
use crate::application::services::teardown::{TeardownOutcome, teardown_workspace};
use crate::domain::workspace::validate_workspace_id;
use crate::output::{OutputContext, progress};

/// Arguments for the `atelier down` command.
#[derive(Args)]
pub struct DownArgs {
    /// Workspace to destroy.
    pub workspace_id: String,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Also remove the workspace record after destroying.
    #[arg(long)]
    pub purge: bool,
}

/// Entry point for `atelier down`.
///
/// Idempotent: running it against an already-destroyed workspace succeeds
/// without side effects.
///
/// # Errors
///
/// Returns an error for an unknown workspace or an engine destroy failure.
pub async fn run(app: &AppContext, ctx: &OutputContext, args: &DownArgs) -> Result<()> {
    validate_workspace_id(&args.workspace_id)?;

    if !args.yes && !app.non_interactive {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Destroy workspace {}?", args.workspace_id))
            .default(false)
            .interact()?;
        if !confirmed {
            ctx.info("aborted");
            return Ok(());
        }
    }

    let pb = ctx
        .show_progress()
        .then(|| progress::spinner("destroying workspace..."));

    let outcome = teardown_workspace(
        &app.engine,
        &app.store,
        &app.registry,
        &NullReporter,
        &args.workspace_id,
    )
    .await;

    match outcome {
        Ok(TeardownOutcome::Destroyed) => {
            let msg = format!("workspace {} destroyed", args.workspace_id);
            if let Some(pb) = &pb {
                progress::finish_ok(pb, &msg);
            } else {
                ctx.success(&msg);
            }
        }
        Ok(TeardownOutcome::AlreadyDestroyed) => {
            if let Some(pb) = &pb {
                pb.finish_and_clear();
            }
            ctx.info(&format!(
                "workspace {} was already destroyed",
                args.workspace_id
            ));
        }
        Ok(TeardownOutcome::CancellationRequested) => {
            if let Some(pb) = &pb {
                pb.finish_and_clear();
            }
            ctx.warn("provisioning was in progress; it is unwinding now");
            return Ok(());
        }
        Err(err) => {
            if let Some(pb) = &pb {
                pb.finish_and_clear();
            }
            return Err(err);
        }
    }

    if args.purge {
        app.store.remove(&args.workspace_id).await?;
        ctx.info("workspace record removed");
    }
    Ok(())
}
