//! Application service — workspace provisioning use-case.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use atelier_common::template::TemplateManifest;
use atelier_common::{ResourceGraph, WorkspaceRecord};

use crate::application::ports::{
    HandshakeChannel, ProgressReporter, ProvisioningEngine, WorkspaceStore,
};
use crate::application::services::handshake::{self, HandshakeWait, TrackOutcome};
use crate::application::services::registry::WorkspaceRegistry;
use crate::application::services::teardown;
use crate::domain::error::WorkspaceError;
use crate::domain::workspace::{
    begin_provisioning, generate_workspace_id, mark_destroyed, mark_failed, template_digest,
};
use crate::domain::{agent, apps, template};

/// Inputs for one provisioning attempt.
pub struct ProvisionRequest<'a> {
    pub manifest: &'a TemplateManifest,
    /// Raw manifest bytes, digested into the record for drift visibility.
    pub manifest_bytes: &'a [u8],
    pub overrides: BTreeMap<String, String>,
    pub owner: String,
    /// Cancelling this token interrupts the handshake wait and unwinds the
    /// workspace through the destroy path.
    pub cancel: CancellationToken,
}

/// Outcome of the `provision_workspace` use-case.
#[derive(Debug, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Workspace reached `ready`; apps are registered.
    Ready { workspace_id: String },
    /// The flow was cancelled mid-provisioning and the workspace was
    /// destroyed.
    Cancelled { workspace_id: String },
}

impl ProvisionOutcome {
    #[must_use]
    pub fn workspace_id(&self) -> &str {
        match self {
            Self::Ready { workspace_id } | Self::Cancelled { workspace_id } => workspace_id,
        }
    }
}

/// Provision a new workspace from a template.
///
/// Variable resolution and app-slug checks run before any state exists, so
/// a bad template or override leaves nothing behind. From there the flow is
/// persisted at every phase change. Engine failures and handshake failures
/// move the record to `failed` (terminal for this attempt) and surface the
/// underlying error.
///
/// # Errors
///
/// Returns an error if resolution fails, the engine rejects the create
/// operation, or the handshake fails.
pub async fn provision_workspace(
    engine: &impl ProvisioningEngine,
    channel: &impl HandshakeChannel,
    store: &impl WorkspaceStore,
    registry: &WorkspaceRegistry,
    reporter: &impl ProgressReporter,
    wait: HandshakeWait,
    req: ProvisionRequest<'_>,
) -> Result<ProvisionOutcome> {
    let workspace_id = generate_workspace_id();

    // Fail fast, before any record exists: bad variables and app-slug
    // collisions are authoring errors, not provisioning failures.
    let resolved = template::resolve_variables(
        &req.manifest.spec.variables,
        &req.overrides,
        &workspace_id,
        &req.owner,
    )?;
    apps::check_declared_apps(&req.manifest.spec.apps)?;

    let token = agent::mint_token();
    let agent = agent::build_agent(&req.manifest.spec.agent, &resolved, token)?;
    let resource = template::interpolate_resource(&req.manifest.spec.resource, &resolved)?;

    let rec = WorkspaceRecord {
        workspace_id: workspace_id.clone(),
        owner: req.owner.clone(),
        template: req.manifest.metadata.name.clone(),
        phase: atelier_common::LifecyclePhase::Pending,
        created_at: Utc::now(),
        updated_at: Utc::now(),
        resource_id: None,
        last_error: None,
        variables: resolved,
        template_digest: Some(template_digest(req.manifest_bytes)),
        agent,
        apps: vec![],
    };

    registry.begin(&workspace_id, req.cancel.clone())?;
    let result = run_flow(engine, channel, store, reporter, wait, &req, rec, resource).await;
    registry.finish(&workspace_id);
    result
}

#[allow(clippy::too_many_arguments)]
async fn run_flow(
    engine: &impl ProvisioningEngine,
    channel: &impl HandshakeChannel,
    store: &impl WorkspaceStore,
    reporter: &impl ProgressReporter,
    wait: HandshakeWait,
    req: &ProvisionRequest<'_>,
    mut rec: WorkspaceRecord,
    resource: atelier_common::ResourceDescription,
) -> Result<ProvisionOutcome> {
    store.save(&rec).await.context("persisting new workspace")?;

    reporter.step("submitting to provisioning engine...");
    let graph = ResourceGraph {
        workspace_id: rec.workspace_id.clone(),
        owner: rec.owner.clone(),
        resource,
        agent: rec.agent.clone(),
    };
    let resource_id = match engine.create(&graph).await {
        Ok(id) => id,
        Err(err) => {
            mark_failed(&mut rec, &err.to_string())?;
            store.save(&rec).await?;
            return Err(err);
        }
    };
    begin_provisioning(&mut rec, resource_id)?;
    store.save(&rec).await?;
    reporter.success("create accepted by engine");

    reporter.step("waiting for agent handshake...");
    match handshake::track_agent(channel, store, &mut rec, wait, &req.cancel, reporter).await {
        Ok(TrackOutcome::Ready) => {
            for app in &req.manifest.spec.apps {
                let app = template::interpolate_app(app, &rec.variables)?;
                apps::register_app(&mut rec, app)?;
            }
            store.save(&rec).await?;
            reporter.success("workspace ready");
            Ok(ProvisionOutcome::Ready {
                workspace_id: rec.workspace_id.clone(),
            })
        }
        Ok(TrackOutcome::Cancelled) => {
            reporter.warn("cancelled, destroying workspace");
            teardown::destroy_resource(engine, &rec).await;
            mark_destroyed(&mut rec);
            store.save(&rec).await?;
            Ok(ProvisionOutcome::Cancelled {
                workspace_id: rec.workspace_id.clone(),
            })
        }
        Err(err) => {
            mark_failed(&mut rec, &err.to_string())?;
            store.save(&rec).await?;
            Err(err)
        }
    }
}

/// Rebuild an existing workspace: tear it down, then provision a fresh
/// record from the same template, carrying forward its variable values.
///
/// Immutable variables must keep their previous value; new overrides may
/// change mutable ones. The old record stays behind as `destroyed`.
///
/// # Errors
///
/// Returns an error if the workspace is unknown or mid-flow, an immutable
/// variable would change, or teardown/provisioning fails.
pub async fn rebuild_workspace(
    engine: &impl ProvisioningEngine,
    channel: &impl HandshakeChannel,
    store: &impl WorkspaceStore,
    registry: &WorkspaceRegistry,
    reporter: &impl ProgressReporter,
    wait: HandshakeWait,
    workspace_id: &str,
    manifest: &TemplateManifest,
    manifest_bytes: &[u8],
    overrides: BTreeMap<String, String>,
    cancel: CancellationToken,
) -> Result<ProvisionOutcome> {
    let old = store
        .load(workspace_id)
        .await?
        .ok_or_else(|| WorkspaceError::NotFound(workspace_id.to_string()))?;
    if registry.is_active(workspace_id) {
        return Err(WorkspaceError::FlowInProgress(workspace_id.to_string()).into());
    }

    // Carry previous values forward for declared variables, then let the
    // new overrides win.
    let mut merged: BTreeMap<String, String> = manifest
        .spec
        .variables
        .iter()
        .filter_map(|spec| {
            old.variables
                .get(&spec.name)
                .map(|v| (spec.name.clone(), v.clone()))
        })
        .collect();
    merged.extend(overrides);

    let next = template::resolve_variables(
        &manifest.spec.variables,
        &merged,
        &old.workspace_id,
        &old.owner,
    )?;
    template::check_immutable(&manifest.spec.variables, &old.variables, &next)?;

    teardown::teardown_workspace(engine, store, registry, reporter, workspace_id).await?;

    provision_workspace(
        engine,
        channel,
        store,
        registry,
        reporter,
        wait,
        ProvisionRequest {
            manifest,
            manifest_bytes,
            overrides: merged,
            owner: old.owner,
            cancel,
        },
    )
    .await
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use atelier_common::template::{
        AgentTemplate, TemplateMetadata, TemplateSpec, VariableSpec,
    };
    use atelier_common::{AgentReport, AppSpec, LifecyclePhase, ResourceDescription, ScriptState};

    use super::*;
    use crate::application::ports::NullReporter;
    use crate::application::services::test_support::MemoryStoreStub;

    struct EngineStub {
        create_result: Mutex<Option<Result<String>>>,
        destroys: AtomicUsize,
    }

    impl EngineStub {
        fn ok() -> Self {
            Self {
                create_result: Mutex::new(Some(Ok("res-1".to_string()))),
                destroys: AtomicUsize::new(0),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                create_result: Mutex::new(Some(Err(anyhow::anyhow!("{message}")))),
                destroys: AtomicUsize::new(0),
            }
        }

        fn destroy_count(&self) -> usize {
            self.destroys.load(Ordering::SeqCst)
        }
    }

    impl ProvisioningEngine for EngineStub {
        async fn create(&self, _graph: &ResourceGraph) -> Result<String> {
            self.create_result
                .lock()
                .expect("lock")
                .take()
                .unwrap_or_else(|| Ok("res-next".to_string()))
        }

        async fn destroy(&self, _resource_id: &str) -> Result<()> {
            self.destroys.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Channel that echoes whatever token the engine was given, by reading
    /// it from the stored record — mimicking a well-behaved agent.
    struct EchoChannel<'a> {
        store: &'a MemoryStoreStub,
        script_state: ScriptState,
    }

    impl HandshakeChannel for EchoChannel<'_> {
        async fn poll(&self, workspace_id: &str) -> Result<Option<AgentReport>> {
            let rec = self.store.load(workspace_id).await?;
            Ok(rec.map(|r| AgentReport {
                // After `starting`, the stored token is consumed; keep
                // presenting the agent env copy like a real agent would.
                token: r
                    .agent
                    .token
                    .unwrap_or_else(|| r.agent.env["ATELIER_AGENT_TOKEN"].clone()),
                script_state: self.script_state,
                script_error: None,
            }))
        }
    }

    /// Channel where no agent ever reports.
    struct SilentChannel;

    impl HandshakeChannel for SilentChannel {
        async fn poll(&self, _workspace_id: &str) -> Result<Option<AgentReport>> {
            Ok(None)
        }
    }

    fn manifest() -> TemplateManifest {
        TemplateManifest {
            api_version: "atelier/v1".to_string(),
            kind: "Template".to_string(),
            metadata: TemplateMetadata {
                name: "rust-dev".to_string(),
                display_name: "Rust Development".to_string(),
                description: None,
                icon: None,
            },
            spec: TemplateSpec {
                variables: vec![VariableSpec {
                    name: "cpu_limit".to_string(),
                    description: None,
                    default: Some("1".to_string()),
                    mutable: true,
                    validation: None,
                }],
                resource: ResourceDescription {
                    kind: "container".to_string(),
                    image: "ghcr.io/acme/rust-dev:latest".to_string(),
                    cpu: Some("${cpu_limit}".to_string()),
                    memory: None,
                    disk: None,
                    labels: BTreeMap::new(),
                },
                agent: AgentTemplate {
                    os: "linux".to_string(),
                    arch: "amd64".to_string(),
                    startup_script: "echo ready".to_string(),
                    env: BTreeMap::new(),
                },
                apps: vec![AppSpec {
                    slug: "code-server".to_string(),
                    display_name: "VS Code".to_string(),
                    url: "http://localhost:13337".to_string(),
                    icon: None,
                    subdomain: false,
                }],
            },
        }
    }

    fn fast_wait() -> HandshakeWait {
        HandshakeWait {
            connect_timeout: Duration::from_millis(100),
            startup_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(5),
        }
    }

    fn request(manifest: &TemplateManifest) -> ProvisionRequest<'_> {
        ProvisionRequest {
            manifest,
            manifest_bytes: b"manifest",
            overrides: BTreeMap::from([("cpu_limit".to_string(), "4".to_string())]),
            owner: "dev".to_string(),
            cancel: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn happy_path_reaches_ready_with_apps() {
        let manifest = manifest();
        let engine = EngineStub::ok();
        let store = MemoryStoreStub::default();
        let registry = WorkspaceRegistry::new();
        let channel = EchoChannel {
            store: &store,
            script_state: ScriptState::Completed,
        };

        let outcome = provision_workspace(
            &engine,
            &channel,
            &store,
            &registry,
            &NullReporter,
            fast_wait(),
            request(&manifest),
        )
        .await
        .expect("provisioning should succeed");

        let ProvisionOutcome::Ready { workspace_id } = outcome else {
            panic!("expected Ready");
        };
        let rec = store.load(&workspace_id).await.unwrap().unwrap();
        assert_eq!(rec.phase, LifecyclePhase::Ready);
        assert_eq!(rec.resource_id.as_deref(), Some("res-1"));
        assert_eq!(rec.variables["cpu_limit"], "4");
        assert_eq!(rec.apps.len(), 1);
        assert_eq!(rec.apps[0].slug, "code-server");
        assert!(!registry.is_active(&workspace_id));
        assert_eq!(
            store.phase_history(),
            [
                LifecyclePhase::Pending,
                LifecyclePhase::Provisioning,
                LifecyclePhase::Starting,
                LifecyclePhase::Ready,
                LifecyclePhase::Ready, // app registration persists once more
            ]
        );
    }

    #[tokio::test]
    async fn bad_override_fails_before_any_state_exists() {
        let mut manifest = manifest();
        manifest.spec.variables[0].validation =
            Some(atelier_common::template::ValidationRule {
                pattern: Some("^[0-9]+$".to_string()),
                one_of: vec![],
            });
        let engine = EngineStub::ok();
        let store = MemoryStoreStub::default();
        let registry = WorkspaceRegistry::new();
        let channel = SilentChannel;

        let mut req = request(&manifest);
        req.overrides
            .insert("cpu_limit".to_string(), "lots".to_string());

        let err = provision_workspace(
            &engine,
            &channel,
            &store,
            &registry,
            &NullReporter,
            fast_wait(),
            req,
        )
        .await
        .expect_err("expected validation failure");

        assert!(err.to_string().contains("cpu_limit"), "names variable: {err}");
        assert!(store.list().await.unwrap().is_empty(), "no record created");
        assert!(store.phase_history().is_empty());
    }

    #[tokio::test]
    async fn engine_failure_is_surfaced_verbatim_and_terminal() {
        let manifest = manifest();
        let engine = EngineStub::failing("quota exceeded in region eu-west");
        let store = MemoryStoreStub::default();
        let registry = WorkspaceRegistry::new();

        let err = provision_workspace(
            &engine,
            &SilentChannel,
            &store,
            &registry,
            &NullReporter,
            fast_wait(),
            request(&manifest),
        )
        .await
        .expect_err("expected engine failure");

        assert!(err.to_string().contains("quota exceeded in region eu-west"));
        let recs = store.list().await.unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].phase, LifecyclePhase::Failed);
        assert_eq!(
            recs[0].last_error.as_deref(),
            Some("quota exceeded in region eu-west"),
            "engine error recorded verbatim"
        );
        assert!(!registry.is_active(&recs[0].workspace_id));
    }

    #[tokio::test]
    async fn handshake_timeout_moves_to_failed_exactly_once() {
        let manifest = manifest();
        let engine = EngineStub::ok();
        let store = MemoryStoreStub::default();
        let registry = WorkspaceRegistry::new();

        let err = provision_workspace(
            &engine,
            &SilentChannel,
            &store,
            &registry,
            &NullReporter,
            fast_wait(),
            request(&manifest),
        )
        .await
        .expect_err("expected handshake timeout");

        assert!(err.to_string().contains("did not reach"), "got: {err}");
        let failed_saves = store
            .phase_history()
            .iter()
            .filter(|p| **p == LifecyclePhase::Failed)
            .count();
        assert_eq!(failed_saves, 1, "failed persisted exactly once");
    }

    #[tokio::test]
    async fn wrong_token_fails_the_workspace() {
        struct ImpostorChannel;
        impl HandshakeChannel for ImpostorChannel {
            async fn poll(&self, _workspace_id: &str) -> Result<Option<AgentReport>> {
                Ok(Some(AgentReport {
                    token: "wrong".to_string(),
                    script_state: ScriptState::Pending,
                    script_error: None,
                }))
            }
        }

        let manifest = manifest();
        let engine = EngineStub::ok();
        let store = MemoryStoreStub::default();
        let registry = WorkspaceRegistry::new();

        let err = provision_workspace(
            &engine,
            &ImpostorChannel,
            &store,
            &registry,
            &NullReporter,
            fast_wait(),
            request(&manifest),
        )
        .await
        .expect_err("expected token mismatch");

        assert!(err.to_string().contains("does not match"), "got: {err}");
        let recs = store.list().await.unwrap();
        assert_eq!(recs[0].phase, LifecyclePhase::Failed);
    }

    #[tokio::test]
    async fn cancellation_destroys_the_workspace() {
        let manifest = manifest();
        let engine = EngineStub::ok();
        let store = MemoryStoreStub::default();
        let registry = WorkspaceRegistry::new();
        let cancel = CancellationToken::new();

        let mut req = request(&manifest);
        req.cancel = cancel.clone();

        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });

        let wait = HandshakeWait {
            connect_timeout: Duration::from_secs(60),
            startup_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(5),
        };
        let outcome = provision_workspace(
            &engine,
            &SilentChannel,
            &store,
            &registry,
            &NullReporter,
            wait,
            req,
        )
        .await
        .expect("cancellation is not an error");
        trigger.await.expect("trigger task");

        let ProvisionOutcome::Cancelled { workspace_id } = outcome else {
            panic!("expected Cancelled");
        };
        assert_eq!(engine.destroy_count(), 1, "destroy path ran");
        let rec = store.load(&workspace_id).await.unwrap().unwrap();
        assert_eq!(rec.phase, LifecyclePhase::Destroyed);
        assert!(!registry.is_active(&workspace_id));
    }

    #[tokio::test]
    async fn duplicate_declared_slugs_fail_before_submission() {
        let mut manifest = manifest();
        let dup = manifest.spec.apps[0].clone();
        manifest.spec.apps.push(dup);
        let engine = EngineStub::ok();
        let store = MemoryStoreStub::default();
        let registry = WorkspaceRegistry::new();

        let err = provision_workspace(
            &engine,
            &SilentChannel,
            &store,
            &registry,
            &NullReporter,
            fast_wait(),
            request(&manifest),
        )
        .await
        .expect_err("expected duplicate slug");

        assert!(err.to_string().contains("code-server"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rebuild_keeps_immutable_values_and_reprovisions() {
        let mut manifest = manifest();
        manifest.spec.variables.push(VariableSpec {
            name: "image_tag".to_string(),
            description: None,
            default: Some("latest".to_string()),
            mutable: false,
            validation: None,
        });
        let engine = EngineStub::ok();
        let store = MemoryStoreStub::default();
        let registry = WorkspaceRegistry::new();
        let channel = EchoChannel {
            store: &store,
            script_state: ScriptState::Completed,
        };

        let outcome = provision_workspace(
            &engine,
            &channel,
            &store,
            &registry,
            &NullReporter,
            fast_wait(),
            request(&manifest),
        )
        .await
        .expect("first provision");
        let first_id = outcome.workspace_id().to_string();

        // Changing the immutable variable is rejected.
        let err = rebuild_workspace(
            &engine,
            &channel,
            &store,
            &registry,
            &NullReporter,
            fast_wait(),
            &first_id,
            &manifest,
            b"manifest",
            BTreeMap::from([("image_tag".to_string(), "1.80".to_string())]),
            CancellationToken::new(),
        )
        .await
        .expect_err("immutable change must fail");
        assert!(err.to_string().contains("image_tag"));

        // Changing a mutable variable rebuilds into a fresh record.
        let outcome = rebuild_workspace(
            &engine,
            &channel,
            &store,
            &registry,
            &NullReporter,
            fast_wait(),
            &first_id,
            &manifest,
            b"manifest",
            BTreeMap::from([("cpu_limit".to_string(), "8".to_string())]),
            CancellationToken::new(),
        )
        .await
        .expect("rebuild should succeed");

        let new_id = outcome.workspace_id().to_string();
        assert_ne!(new_id, first_id, "a fresh attempt gets a fresh record");
        let old = store.load(&first_id).await.unwrap().unwrap();
        assert_eq!(old.phase, LifecyclePhase::Destroyed);
        let new = store.load(&new_id).await.unwrap().unwrap();
        assert_eq!(new.phase, LifecyclePhase::Ready);
        assert_eq!(new.variables["cpu_limit"], "8");
        assert_eq!(new.variables["image_tag"], "latest", "carried forward");
        assert_eq!(engine.destroy_count(), 1);
    }
}
