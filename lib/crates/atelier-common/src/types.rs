use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a workspace.
///
/// `Failed` is terminal for a provisioning attempt; a fresh attempt requires
/// a new [`WorkspaceRecord`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LifecyclePhase {
    Pending,
    Provisioning,
    Starting,
    Ready,
    Failed,
    Destroyed,
}

impl LifecyclePhase {
    /// Display form used by the CLI and console API (`"pending"`, ...).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Provisioning => "provisioning",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Destroyed => "destroyed",
        }
    }
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent descriptor attached to a workspace record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    /// Operating system the agent runs on (e.g. `"linux"`).
    pub os: String,
    /// CPU architecture (e.g. `"amd64"`).
    pub arch: String,
    /// Startup script, already variable-interpolated.
    pub startup_script: String,
    /// Environment passed to the agent, already variable-interpolated.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Handshake token. Minted once per provisioning attempt, cleared when
    /// the handshake consumes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// A user-facing application endpoint registered against a ready agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppSpec {
    /// Short unique identifier within the agent (e.g. `"code-server"`).
    pub slug: String,
    /// Human-readable name shown to consumers.
    pub display_name: String,
    /// Endpoint URL.
    pub url: String,
    /// Icon reference (path or URL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Serve the app on its own subdomain instead of a path.
    #[serde(default)]
    pub subdomain: bool,
}

/// Workspace state persisted to `~/.atelier/workspaces/<id>.json`.
///
/// Mutated only by the provisioning driver and the handshake tracker;
/// removed on explicit teardown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceRecord {
    /// Workspace identifier (e.g. `"atl-0123456789abcdef"`).
    pub workspace_id: String,
    /// Owner the workspace was provisioned for.
    pub owner: String,
    /// Template name the workspace was created from.
    pub template: String,
    /// Current lifecycle phase.
    pub phase: LifecyclePhase,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// Last phase change.
    pub updated_at: DateTime<Utc>,
    /// Identifier returned by the provisioning engine, once created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    /// Error that moved the workspace to `failed`, verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    /// Resolved variable mapping used for this attempt.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    /// SHA-256 of the template manifest bytes (hex, 64 chars).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_digest: Option<String>,
    /// Agent descriptor owned by this workspace.
    pub agent: AgentRecord,
    /// Registered app endpoints, in declaration order.
    #[serde(default)]
    pub apps: Vec<AppSpec>,
}

/// Condensed row for `atelier list` and `GET /v1/workspaces`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceSummary {
    pub workspace_id: String,
    pub owner: String,
    pub template: String,
    pub phase: LifecyclePhase,
    pub created_at: DateTime<Utc>,
    pub app_count: usize,
}

impl From<&WorkspaceRecord> for WorkspaceSummary {
    fn from(rec: &WorkspaceRecord) -> Self {
        Self {
            workspace_id: rec.workspace_id.clone(),
            owner: rec.owner.clone(),
            template: rec.template.clone(),
            phase: rec.phase,
            created_at: rec.created_at,
            app_count: rec.apps.len(),
        }
    }
}

/// Payload submitted to the provisioning engine's create operation.
///
/// The `resource` section is opaque to the orchestrator — it is the
/// template's resource description with variables already substituted,
/// passed through to the engine untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceGraph {
    pub workspace_id: String,
    pub owner: String,
    pub resource: ResourceDescription,
    pub agent: AgentRecord,
}

/// Engine-facing compute resource description.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceDescription {
    /// Resource kind understood by the engine (e.g. `"container"`).
    pub kind: String,
    /// Image or base artifact reference.
    pub image: String,
    /// CPU allocation, engine-defined format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,
    /// Memory allocation, engine-defined format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
    /// Disk allocation, engine-defined format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk: Option<String>,
    /// Free-form labels forwarded to the engine.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_phase_serde_round_trip() {
        let variants = [
            (LifecyclePhase::Pending, "\"pending\""),
            (LifecyclePhase::Provisioning, "\"provisioning\""),
            (LifecyclePhase::Starting, "\"starting\""),
            (LifecyclePhase::Ready, "\"ready\""),
            (LifecyclePhase::Failed, "\"failed\""),
            (LifecyclePhase::Destroyed, "\"destroyed\""),
        ];
        for (variant, expected_json) in &variants {
            let json = serde_json::to_string(variant).unwrap();
            assert_eq!(&json, expected_json);
            let deserialized: LifecyclePhase = serde_json::from_str(&json).unwrap();
            assert_eq!(&deserialized, variant);
        }
    }

    #[test]
    fn lifecycle_phase_display_matches_serde() {
        assert_eq!(LifecyclePhase::Provisioning.to_string(), "provisioning");
        assert_eq!(LifecyclePhase::Ready.to_string(), "ready");
    }

    #[test]
    fn workspace_record_serde_round_trip() {
        let rec = WorkspaceRecord {
            workspace_id: "atl-0123456789abcdef".to_string(),
            owner: "dev".to_string(),
            template: "rust-dev".to_string(),
            phase: LifecyclePhase::Provisioning,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            resource_id: Some("res-42".to_string()),
            last_error: None,
            variables: BTreeMap::from([("cpu_limit".to_string(), "4".to_string())]),
            template_digest: Some("a".repeat(64)),
            agent: AgentRecord {
                os: "linux".to_string(),
                arch: "amd64".to_string(),
                startup_script: "echo hi".to_string(),
                env: BTreeMap::new(),
                token: Some("abc123".to_string()),
            },
            apps: vec![AppSpec {
                slug: "code-server".to_string(),
                display_name: "VS Code".to_string(),
                url: "http://localhost:13337".to_string(),
                icon: None,
                subdomain: true,
            }],
        };
        let json = serde_json::to_string(&rec).unwrap();
        let deserialized: WorkspaceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.workspace_id, rec.workspace_id);
        assert_eq!(deserialized.phase, LifecyclePhase::Provisioning);
        assert_eq!(deserialized.resource_id, rec.resource_id);
        assert_eq!(deserialized.variables["cpu_limit"], "4");
        assert_eq!(deserialized.agent.token.as_deref(), Some("abc123"));
        assert_eq!(deserialized.apps, rec.apps);
    }

    #[test]
    fn workspace_record_minimal_fields_deserialize() {
        // Older records may lack optional sections entirely.
        let json = r#"{
            "workspace_id": "atl-0123456789abcdef",
            "owner": "dev",
            "template": "rust-dev",
            "phase": "pending",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
            "agent": {"os": "linux", "arch": "amd64", "startup_script": ""}
        }"#;
        let rec: WorkspaceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.phase, LifecyclePhase::Pending);
        assert!(rec.resource_id.is_none());
        assert!(rec.variables.is_empty());
        assert!(rec.apps.is_empty());
        assert!(rec.agent.token.is_none());
    }

    #[test]
    fn summary_from_record_counts_apps() {
        let json = r#"{
            "workspace_id": "atl-0123456789abcdef",
            "owner": "dev",
            "template": "rust-dev",
            "phase": "ready",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z",
            "agent": {"os": "linux", "arch": "amd64", "startup_script": ""},
            "apps": [
                {"slug": "a", "display_name": "A", "url": "http://a"},
                {"slug": "b", "display_name": "B", "url": "http://b"}
            ]
        }"#;
        let rec: WorkspaceRecord = serde_json::from_str(json).unwrap();
        let summary = WorkspaceSummary::from(&rec);
        assert_eq!(summary.app_count, 2);
        assert_eq!(summary.phase, LifecyclePhase::Ready);
    }

    #[test]
    fn resource_graph_serializes_resource_untouched() {
        let graph = ResourceGraph {
            workspace_id: "atl-0123456789abcdef".to_string(),
            owner: "dev".to_string(),
            resource: ResourceDescription {
                kind: "container".to_string(),
                image: "ghcr.io/acme/dev:1.2".to_string(),
                cpu: Some("4".to_string()),
                memory: Some("8G".to_string()),
                disk: None,
                labels: BTreeMap::from([("team".to_string(), "acme".to_string())]),
            },
            agent: AgentRecord {
                os: "linux".to_string(),
                arch: "amd64".to_string(),
                startup_script: String::new(),
                env: BTreeMap::new(),
                token: Some("tok".to_string()),
            },
        };
        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&graph).unwrap()).unwrap();
        assert_eq!(value["resource"]["kind"], "container");
        assert_eq!(value["resource"]["cpu"], "4");
        assert_eq!(value["agent"]["token"], "tok");
        assert!(value["resource"].get("disk").is_none());
    }
}
