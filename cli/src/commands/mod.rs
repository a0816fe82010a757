//! Command handlers — one module per subcommand.

pub mod apps;
pub mod config;
pub mod down;
pub mod init;
pub mod list;
pub mod rebuild;
pub mod status;
pub mod up;
pub mod validate;
pub mod version;

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use atelier_common::TemplateManifest;

/// Parse repeated `--var name=value` flags into an override map.
///
/// # Errors
///
/// Returns an error for a flag without `=`.
pub fn parse_vars(vars: &[String]) -> Result<BTreeMap<String, String>> {
    let mut overrides = BTreeMap::new();
    for var in vars {
        let (name, value) = var
            .split_once('=')
            .with_context(|| format!("invalid --var '{var}': expected name=value"))?;
        overrides.insert(name.to_string(), value.to_string());
    }
    Ok(overrides)
}

/// Load and parse a template manifest, returning the parsed manifest and
/// the raw bytes (digested into the workspace record).
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_template(path: &Path) -> Result<(TemplateManifest, Vec<u8>)> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("cannot read template {}", path.display()))?;
    let manifest: TemplateManifest = serde_yaml::from_slice(&bytes)
        .with_context(|| format!("cannot parse template {}", path.display()))?;
    anyhow::ensure!(
        manifest.kind == "Template",
        "{} is not a workspace template (kind: {})",
        path.display(),
        manifest.kind
    );
    Ok((manifest, bytes))
}

/// Resolve the workspace owner: explicit flag, then `$USER`.
#[must_use]
pub fn resolve_owner(flag: Option<&str>) -> String {
    flag.map(str::to_owned)
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_vars_builds_override_map() {
        let overrides =
            parse_vars(&["cpu_limit=4".to_string(), "region=eu-west".to_string()]).unwrap();
        assert_eq!(overrides["cpu_limit"], "4");
        assert_eq!(overrides["region"], "eu-west");
    }

    #[test]
    fn parse_vars_allows_equals_in_value() {
        let overrides = parse_vars(&["startup=FOO=bar".to_string()]).unwrap();
        assert_eq!(overrides["startup"], "FOO=bar");
    }

    #[test]
    fn parse_vars_rejects_missing_equals() {
        assert!(parse_vars(&["cpu_limit".to_string()]).is_err());
    }

    #[test]
    fn resolve_owner_prefers_flag() {
        assert_eq!(resolve_owner(Some("alex")), "alex");
    }
}
