// lib/crates/atelier-common/src/template.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{AppSpec, ResourceDescription};

/// Workspace template manifest (`template.yaml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateManifest {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub metadata: TemplateMetadata,
    pub spec: TemplateSpec,
}

/// Metadata section of a template manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub name: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Spec section of a template manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSpec {
    #[serde(default)]
    pub variables: Vec<VariableSpec>,
    pub resource: ResourceDescription,
    pub agent: AgentTemplate,
    #[serde(default)]
    pub apps: Vec<AppSpec>,
}

/// A template variable declaration.
///
/// A variable with neither a default nor a user override fails resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default: Option<String>,
    /// When `false`, the value cannot change across rebuilds of the same
    /// workspace.
    #[serde(default = "default_mutable")]
    pub mutable: bool,
    #[serde(default)]
    pub validation: Option<ValidationRule>,
}

fn default_mutable() -> bool {
    true
}

/// Validation predicate for a variable value.
///
/// Both constraints may be present; a value must satisfy every one given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Regular expression the whole value must match.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Closed set of allowed values.
    #[serde(rename = "oneOf", default)]
    pub one_of: Vec<String>,
}

/// Agent section of a template manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentTemplate {
    pub os: String,
    pub arch: String,
    #[serde(rename = "startupScript", default)]
    pub startup_script: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
apiVersion: atelier/v1
kind: Template
metadata:
  name: rust-dev
  displayName: Rust Development
  description: Containerized Rust workspace
spec:
  variables:
    - name: cpu_limit
      description: CPU cores
      default: "1"
      validation:
        pattern: "^[0-9]+$"
    - name: image_tag
      default: latest
      mutable: false
    - name: region
      default: eu-west
      validation:
        oneOf: [eu-west, us-east]
  resource:
    kind: container
    image: "ghcr.io/acme/rust-dev:${image_tag}"
    cpu: "${cpu_limit}"
    memory: 8G
  agent:
    os: linux
    arch: amd64
    startupScript: |
      cargo --version
    env:
      REGION: "${region}"
  apps:
    - slug: code-server
      display_name: VS Code
      url: "http://localhost:13337"
      subdomain: true
"#;

    #[test]
    fn manifest_deserializes_from_yaml() {
        let manifest: TemplateManifest = serde_yaml_ng::from_str(MANIFEST).unwrap();
        assert_eq!(manifest.api_version, "atelier/v1");
        assert_eq!(manifest.kind, "Template");
        assert_eq!(manifest.metadata.name, "rust-dev");
        assert_eq!(manifest.spec.variables.len(), 3);
        assert_eq!(manifest.spec.resource.kind, "container");
        assert_eq!(manifest.spec.agent.os, "linux");
        assert_eq!(manifest.spec.apps.len(), 1);
        assert!(manifest.spec.apps[0].subdomain);
    }

    #[test]
    fn variable_mutable_defaults_to_true() {
        let manifest: TemplateManifest = serde_yaml_ng::from_str(MANIFEST).unwrap();
        let cpu = &manifest.spec.variables[0];
        assert!(cpu.mutable);
        let tag = &manifest.spec.variables[1];
        assert!(!tag.mutable);
    }

    #[test]
    fn validation_rule_sections_are_optional() {
        let manifest: TemplateManifest = serde_yaml_ng::from_str(MANIFEST).unwrap();
        let tag = &manifest.spec.variables[1];
        assert!(tag.validation.is_none());
        let region = &manifest.spec.variables[2];
        let rule = region.validation.as_ref().unwrap();
        assert!(rule.pattern.is_none());
        assert_eq!(rule.one_of, ["eu-west", "us-east"]);
    }

    #[test]
    fn minimal_manifest_without_variables_or_apps() {
        let yaml = r#"
apiVersion: atelier/v1
kind: Template
metadata:
  name: bare
  displayName: Bare
spec:
  resource:
    kind: container
    image: alpine
  agent:
    os: linux
    arch: amd64
"#;
        let manifest: TemplateManifest = serde_yaml_ng::from_str(yaml).unwrap();
        assert!(manifest.spec.variables.is_empty());
        assert!(manifest.spec.apps.is_empty());
        assert!(manifest.spec.agent.startup_script.is_empty());
        assert!(manifest.spec.agent.env.is_empty());
    }
}
