//! Human-readable terminal renderer.

use atelier_common::{AppSpec, LifecyclePhase, WorkspaceRecord, WorkspaceSummary};

use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the workspace list.
    pub fn render_list(&self, workspaces: &[WorkspaceSummary]) {
        if workspaces.is_empty() {
            if !self.ctx.quiet {
                println!("No workspaces. Create one: atelier up --template template.yaml");
            }
            return;
        }
        println!("{:<22} {:<12} {:<14} {:<6} TEMPLATE", "WORKSPACE", "OWNER", "PHASE", "APPS");
        for ws in workspaces {
            println!(
                "{:<22} {:<12} {:<14} {:<6} {}",
                ws.workspace_id,
                ws.owner,
                phase_display(ws.phase),
                ws.app_count,
                ws.template,
            );
        }
    }

    /// Render one workspace in detail.
    pub fn render_status(&self, rec: &WorkspaceRecord) {
        self.ctx.kv("Workspace:", &rec.workspace_id);
        self.ctx.kv("Owner:", &rec.owner);
        self.ctx.kv("Template:", &rec.template);
        self.ctx.kv("Phase:", phase_display(rec.phase));
        if let Some(resource_id) = &rec.resource_id {
            self.ctx.kv("Resource:", resource_id);
        }
        if let Some(digest) = &rec.template_digest {
            self.ctx.kv("Digest:", &digest[..12.min(digest.len())]);
        }
        if let Some(error) = &rec.last_error {
            self.ctx.error(error);
        }

        if !rec.variables.is_empty() {
            println!();
            self.ctx.header("Variables:");
            for (name, value) in &rec.variables {
                self.ctx.kv(&format!("{name}:"), value);
            }
        }

        if !rec.apps.is_empty() {
            println!();
            self.ctx.header("Apps:");
            self.render_apps(&rec.apps);
        }
    }

    /// Render registered app endpoints.
    pub fn render_apps(&self, apps: &[AppSpec]) {
        if apps.is_empty() {
            if !self.ctx.quiet {
                println!("No apps registered.");
            }
            return;
        }
        for app in apps {
            let marker = if app.subdomain { "  [subdomain]" } else { "" };
            println!("  {:<16} {:<24} {}{marker}", app.slug, app.display_name, app.url);
        }
    }

    /// Render the resolved variable mapping from `atelier validate`.
    pub fn render_resolved(&self, resolved: &std::collections::BTreeMap<String, String>) {
        self.ctx.header("Resolved variables:");
        for (name, value) in resolved {
            self.ctx.kv(&format!("{name}:"), value);
        }
    }
}

/// Convert a lifecycle phase to display string.
#[must_use]
pub fn phase_display(phase: LifecyclePhase) -> &'static str {
    phase.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_display_matches_wire_form() {
        assert_eq!(phase_display(LifecyclePhase::Pending), "pending");
        assert_eq!(phase_display(LifecyclePhase::Provisioning), "provisioning");
        assert_eq!(phase_display(LifecyclePhase::Ready), "ready");
        assert_eq!(phase_display(LifecyclePhase::Destroyed), "destroyed");
    }
}
