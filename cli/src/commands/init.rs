//! Init command — scaffold a starter template manifest.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::infra::assets::get_asset;
use crate::output::OutputContext;

/// Arguments for the `atelier init` command.
#[derive(Args)]
pub struct InitArgs {
    /// Where to write the template (defaults to ./template.yaml).
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Overwrite an existing file.
    #[arg(long)]
    pub force: bool,
}

/// Entry point for `atelier init`.
///
/// # Errors
///
/// Returns an error if the target exists (without `--force`) or cannot be
/// written.
pub fn run(ctx: &OutputContext, args: &InitArgs) -> Result<()> {
    let path = args
        .path
        .clone()
        .unwrap_or_else(|| PathBuf::from("template.yaml"));

    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists. Pass --force to overwrite.",
            path.display()
        );
    }

    let template = get_asset("template.yaml")?;
    std::fs::write(&path, template)
        .with_context(|| format!("cannot write {}", path.display()))?;

    ctx.success(&format!("wrote {}", path.display()));
    ctx.info("next: atelier validate, then atelier up");
    Ok(())
}
