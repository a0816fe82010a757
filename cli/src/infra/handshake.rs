//! Infrastructure implementation of the `HandshakeChannel` port.
//!
//! Polls the external rendezvous endpoint agents report to. The endpoint is
//! not served by atelier; agents inside workspaces post their token and
//! script status there, and this adapter only reads.

use std::time::Duration;

use anyhow::{Context, Result};

use atelier_common::AgentReport;

use crate::application::ports::HandshakeChannel;

/// Per-request timeout. Kept short: the tracker loop supplies the patience.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP polling adapter for the handshake channel.
pub struct HttpHandshakeChannel {
    client: reqwest::Client,
    base_url: String,
}

impl HttpHandshakeChannel {
    /// Create a channel against the configured rendezvous base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building handshake HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn agent_url(&self, workspace_id: &str) -> String {
        format!("{}/v1/workspaces/{workspace_id}/agent", self.base_url)
    }
}

impl HandshakeChannel for HttpHandshakeChannel {
    async fn poll(&self, workspace_id: &str) -> Result<Option<AgentReport>> {
        let response = self
            .client
            .get(self.agent_url(workspace_id))
            .send()
            .await
            .context("polling handshake endpoint")?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            // Nothing presented yet.
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .context("handshake endpoint returned an error")?;
        let report: AgentReport = response
            .json()
            .await
            .context("parsing handshake response")?;
        Ok(Some(report))
    }
}
