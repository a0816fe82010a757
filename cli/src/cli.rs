//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::AppContext;
use crate::commands;
use crate::infra::store::DirWorkspaceStore;
use crate::output::OutputContext;

/// Template-driven workspace provisioning
#[derive(Parser)]
#[command(
    name = "atelier",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scaffold a starter template
    Init(commands::init::InitArgs),

    /// Dry-run template resolution
    Validate(commands::validate::ValidateArgs),

    /// Provision a workspace from a template
    Up(commands::up::UpArgs),

    /// Destroy a workspace
    Down(commands::down::DownArgs),

    /// Destroy and re-provision a workspace
    Rebuild(commands::rebuild::RebuildArgs),

    /// List workspaces and their phases
    List,

    /// Show one workspace in detail
    Status(commands::status::StatusArgs),

    /// Show a workspace's app endpoints
    Apps(commands::apps::AppsArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli { no_color, quiet, json, command } = self;
        // JSON mode owns stdout; progress chatter goes quiet.
        let ctx = OutputContext::new(no_color, quiet || json);
        match command {
            Command::Version => commands::version::run(json),
            Command::Init(args) => commands::init::run(&ctx, &args),
            Command::Validate(args) => commands::validate::run(&ctx, &args, json),
            Command::Up(args) => {
                let app = AppContext::new(false)?;
                commands::up::run(&app, &ctx, &args, json).await
            }
            Command::Down(args) => {
                let app = AppContext::new(args.yes)?;
                commands::down::run(&app, &ctx, &args).await
            }
            Command::Rebuild(args) => {
                let app = AppContext::new(false)?;
                commands::rebuild::run(&app, &ctx, &args).await
            }
            Command::List => {
                let store = DirWorkspaceStore::new()?;
                commands::list::run(&ctx, &store, json).await
            }
            Command::Status(args) => {
                let store = DirWorkspaceStore::new()?;
                commands::status::run(&ctx, &store, &args, json).await
            }
            Command::Apps(args) => {
                let store = DirWorkspaceStore::new()?;
                commands::apps::run(&ctx, &store, &args, json).await
            }
            Command::Config(cmd) => commands::config::run(&ctx, &cmd),
        }
    }
}
