//! Application context — unified wiring passed to the provisioning commands.
//!
//! `AppContext` assembles the production port implementations (engine CLI
//! adapter, handshake HTTP poller, directory store, flow registry) from the
//! loaded configuration, so command handlers never construct infrastructure
//! themselves.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::application::services::handshake::HandshakeWait;
use crate::application::services::registry::WorkspaceRegistry;
use crate::domain::config::AtelierConfig;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::engine::CliEngine;
use crate::infra::handshake::HttpHandshakeChannel;
use crate::infra::store::DirWorkspaceStore;

/// Unified application context for provisioning commands.
pub struct AppContext {
    /// Provisioning engine CLI adapter.
    pub engine: CliEngine<TokioCommandRunner>,
    /// Handshake channel poller.
    pub channel: HttpHandshakeChannel,
    /// Persistent workspace store.
    pub store: DirWorkspaceStore,
    /// In-flight flow registry.
    pub registry: WorkspaceRegistry,
    /// Loaded configuration.
    pub config: AtelierConfig,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `ATELIER_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from the persisted configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if config loading, the store, or the handshake
    /// client fails to initialize.
    pub fn new(yes: bool) -> Result<Self> {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("ATELIER_YES").is_ok();
        let config = YamlConfigStore.load()?;
        Ok(Self {
            engine: CliEngine::default_runner(config.engine.binary.clone()),
            channel: HttpHandshakeChannel::new(&config.handshake.endpoint)?,
            store: DirWorkspaceStore::new()?,
            registry: WorkspaceRegistry::new(),
            non_interactive: yes || ci_env,
            config,
        })
    }

    /// Handshake wait budget from the loaded configuration.
    #[must_use]
    pub fn handshake_wait(&self) -> HandshakeWait {
        HandshakeWait::from_config(&self.config.handshake)
    }
}
