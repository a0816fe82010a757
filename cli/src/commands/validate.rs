//! Validate command — dry-run template resolution.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::commands::{load_template, parse_vars, resolve_owner};
use crate::domain::{apps, template};
use crate::output::{OutputContext, human::HumanRenderer, json};

/// Arguments for the `atelier validate` command.
#[derive(Args)]
pub struct ValidateArgs {
    /// Template manifest to validate.
    #[arg(long, default_value = "template.yaml")]
    pub template: PathBuf,

    /// Variable override, repeatable (name=value).
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,

    /// Workspace owner used for builtin variables (defaults to $USER).
    #[arg(long, env = "ATELIER_OWNER")]
    pub owner: Option<String>,
}

/// Entry point for `atelier validate`.
///
/// Resolves variables, interpolates the resource and agent sections, and
/// dry-runs the app slug checks. No side effects anywhere.
///
/// # Errors
///
/// Returns the first validation failure, naming the offending variable or
/// slug.
pub fn run(ctx: &OutputContext, args: &ValidateArgs, json_mode: bool) -> Result<()> {
    let result = check(args);
    match result {
        Ok(resolved) => {
            if json_mode {
                println!("{}", json::format_value(&resolved)?);
            } else {
                ctx.success(&format!("{} is valid", args.template.display()));
                HumanRenderer::new(ctx).render_resolved(&resolved);
            }
            Ok(())
        }
        Err(err) => {
            if json_mode {
                println!("{}", json::format_error(&err.to_string(), "validation_failed")?);
            }
            Err(err)
        }
    }
}

fn check(args: &ValidateArgs) -> Result<std::collections::BTreeMap<String, String>> {
    let (manifest, _bytes) = load_template(&args.template)?;
    let overrides = parse_vars(&args.vars)?;
    let owner = resolve_owner(args.owner.as_deref());

    // Resolve against a placeholder id; the real one is minted at `up` time.
    let resolved = template::resolve_variables(
        &manifest.spec.variables,
        &overrides,
        "atl-0000000000000000",
        &owner,
    )?;
    template::interpolate_resource(&manifest.spec.resource, &resolved)?;
    template::interpolate(&manifest.spec.agent.startup_script, &resolved)?;
    template::interpolate_map(&manifest.spec.agent.env, &resolved)?;
    apps::check_declared_apps(&manifest.spec.apps)?;
    for app in &manifest.spec.apps {
        template::interpolate_app(app, &resolved)?;
    }
    Ok(resolved)
}
