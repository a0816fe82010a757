//! Infrastructure adapter for the provisioning engine CLI.
//!
//! Routes engine calls through a `CommandRunner`: `create` streams the
//! resource graph as JSON on stdin and reads the resource id from stdout;
//! `destroy` passes the resource id through. The engine binary itself
//! (default `infractl`, configurable) is an external collaborator.

use anyhow::{Context, Result};

use atelier_common::ResourceGraph;

use crate::application::ports::{CommandRunner, ProvisioningEngine};
use crate::domain::error::EngineError;
use crate::infra::command_runner::{CREATE_TIMEOUT, DEFAULT_CMD_TIMEOUT, TokioCommandRunner};

/// Engine CLI adapter, generic over `R: CommandRunner` so tests can inject
/// a stub runner without spawning real processes.
///
/// Two runners are held:
/// - `cmd_runner`: version/destroy (fast, short timeout)
/// - `create_runner`: create (waits on real infrastructure, long timeout)
pub struct CliEngine<R: CommandRunner> {
    binary: String,
    cmd_runner: R,
    create_runner: R,
}

impl<R: CommandRunner> CliEngine<R> {
    /// Create an engine adapter with explicit runner instances.
    pub fn new(binary: impl Into<String>, cmd_runner: R, create_runner: R) -> Self {
        Self {
            binary: binary.into(),
            cmd_runner,
            create_runner,
        }
    }
}

impl CliEngine<TokioCommandRunner> {
    /// Convenience constructor for production use.
    #[must_use]
    pub fn default_runner(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            cmd_runner: TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT),
            create_runner: TokioCommandRunner::new(CREATE_TIMEOUT),
        }
    }
}

const ENGINE_MIN_VERSION: semver::Version = semver::Version::new(0, 9, 0);

impl<R: CommandRunner> CliEngine<R> {
    /// Check that the engine binary is reachable and recent enough.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Unavailable` if the binary cannot run or
    /// reports a version below the minimum.
    pub async fn check_version(&self) -> Result<()> {
        let output = self
            .cmd_runner
            .run(&self.binary, &["version"])
            .await
            .map_err(|err| EngineError::Unavailable(err.to_string()))?;
        if !output.status.success() {
            return Err(EngineError::Unavailable(format!(
                "'{} version' exited with {}",
                self.binary, output.status
            ))
            .into());
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(ver_str) = stdout
            .lines()
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            && let Ok(v) = semver::Version::parse(ver_str)
            && v < ENGINE_MIN_VERSION
        {
            return Err(EngineError::Unavailable(format!(
                "engine {v} is older than the minimum supported {ENGINE_MIN_VERSION}"
            ))
            .into());
        }
        Ok(())
    }
}

impl<R: CommandRunner> ProvisioningEngine for CliEngine<R> {
    async fn create(&self, graph: &ResourceGraph) -> Result<String> {
        let payload = serde_json::to_vec(graph).context("serializing resource graph")?;
        let output = self
            .create_runner
            .run_with_stdin(&self.binary, &["create", "--format", "json"], &payload)
            .await
            .map_err(|err| EngineError::Unavailable(err.to_string()))?;

        if !output.status.success() {
            return Err(EngineError::CreateFailed {
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }

        let response: serde_json::Value =
            serde_json::from_slice(&output.stdout).context("parsing engine create response")?;
        response
            .get("resource_id")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| anyhow::anyhow!("engine create response has no resource_id"))
    }

    async fn destroy(&self, resource_id: &str) -> Result<()> {
        let output = self
            .cmd_runner
            .run(&self.binary, &["destroy", resource_id])
            .await
            .map_err(|err| EngineError::Unavailable(err.to_string()))?;
        if !output.status.success() {
            return Err(EngineError::DestroyFailed {
                resource_id: resource_id.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(())
    }
}
