//! Template variable resolution and interpolation.
//!
//! This module is intentionally free of I/O, async, and external layer
//! imports. All functions take data in and return data out; a failed
//! resolution leaves no trace anywhere.

use std::collections::BTreeMap;

use anyhow::Result;

use atelier_common::template::{ValidationRule, VariableSpec};

use crate::domain::error::TemplateError;

/// Variable name the workspace identifier is injected under.
pub const BUILTIN_WORKSPACE_ID: &str = "workspace_id";
/// Variable name the workspace owner is injected under.
pub const BUILTIN_WORKSPACE_OWNER: &str = "workspace_owner";

/// Resolve template variables against user-supplied overrides.
///
/// For each declared variable the override wins over the default; a variable
/// with neither fails. Every resolved value must satisfy the variable's
/// validation rule. Overrides naming undeclared variables are rejected.
/// The builtins `workspace_id` and `workspace_owner` are injected last and
/// shadow any declaration of the same name.
///
/// # Errors
///
/// Returns a [`TemplateError`] naming the offending variable.
pub fn resolve_variables(
    specs: &[VariableSpec],
    overrides: &BTreeMap<String, String>,
    workspace_id: &str,
    owner: &str,
) -> Result<BTreeMap<String, String>, TemplateError> {
    for name in overrides.keys() {
        if !specs.iter().any(|s| &s.name == name) {
            return Err(TemplateError::UnknownOverride {
                variable: name.clone(),
            });
        }
    }

    let mut resolved = BTreeMap::new();
    for spec in specs {
        let value = overrides
            .get(&spec.name)
            .or(spec.default.as_ref())
            .ok_or_else(|| TemplateError::MissingValue {
                variable: spec.name.clone(),
            })?;
        if let Some(rule) = &spec.validation {
            check_rule(&spec.name, value, rule)?;
        }
        resolved.insert(spec.name.clone(), value.clone());
    }

    resolved.insert(BUILTIN_WORKSPACE_ID.to_string(), workspace_id.to_string());
    resolved.insert(BUILTIN_WORKSPACE_OWNER.to_string(), owner.to_string());
    Ok(resolved)
}

/// Check a rebuild's overrides against the previous resolution: a variable
/// declared `mutable: false` must keep its previous value.
///
/// # Errors
///
/// Returns `TemplateError::ImmutableVariable` naming the first violation.
pub fn check_immutable(
    specs: &[VariableSpec],
    previous: &BTreeMap<String, String>,
    resolved: &BTreeMap<String, String>,
) -> Result<(), TemplateError> {
    for spec in specs.iter().filter(|s| !s.mutable) {
        if let (Some(old), Some(new)) = (previous.get(&spec.name), resolved.get(&spec.name))
            && old != new
        {
            return Err(TemplateError::ImmutableVariable {
                variable: spec.name.clone(),
            });
        }
    }
    Ok(())
}

/// Substitute `${name}` references in `input` with resolved values.
///
/// `$${` escapes a literal `${`. A reference to a name absent from
/// `resolved` fails — templates must not ship half-interpolated output.
///
/// # Errors
///
/// Returns `TemplateError::UnresolvedReference` for the first unknown name.
pub fn interpolate(
    input: &str,
    resolved: &BTreeMap<String, String>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find("${") {
        if rest[..pos].ends_with('$') {
            // "$${" — emit a literal "${" and continue after it.
            out.push_str(&rest[..pos - 1]);
            out.push_str("${");
            rest = &rest[pos + 2..];
            continue;
        }
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 2..];
        let Some(end) = after.find('}') else {
            // Unterminated reference: keep the tail verbatim.
            out.push_str(&rest[pos..]);
            return Ok(out);
        };
        let name = &after[..end];
        let value = resolved
            .get(name)
            .ok_or_else(|| TemplateError::UnresolvedReference {
                variable: name.to_string(),
            })?;
        out.push_str(value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Interpolate every value of a string map.
///
/// # Errors
///
/// Returns the first interpolation failure.
pub fn interpolate_map(
    input: &BTreeMap<String, String>,
    resolved: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>, TemplateError> {
    input
        .iter()
        .map(|(k, v)| Ok((k.clone(), interpolate(v, resolved)?)))
        .collect()
}

/// Interpolate a template's resource description into its engine-facing
/// form.
///
/// # Errors
///
/// Returns the first interpolation failure.
pub fn interpolate_resource(
    resource: &atelier_common::ResourceDescription,
    resolved: &BTreeMap<String, String>,
) -> Result<atelier_common::ResourceDescription, TemplateError> {
    let opt = |v: &Option<String>| -> Result<Option<String>, TemplateError> {
        v.as_deref().map(|s| interpolate(s, resolved)).transpose()
    };
    Ok(atelier_common::ResourceDescription {
        kind: resource.kind.clone(),
        image: interpolate(&resource.image, resolved)?,
        cpu: opt(&resource.cpu)?,
        memory: opt(&resource.memory)?,
        disk: opt(&resource.disk)?,
        labels: interpolate_map(&resource.labels, resolved)?,
    })
}

/// Interpolate an app declaration's user-facing fields.
///
/// # Errors
///
/// Returns the first interpolation failure.
pub fn interpolate_app(
    app: &atelier_common::AppSpec,
    resolved: &BTreeMap<String, String>,
) -> Result<atelier_common::AppSpec, TemplateError> {
    Ok(atelier_common::AppSpec {
        slug: app.slug.clone(),
        display_name: interpolate(&app.display_name, resolved)?,
        url: interpolate(&app.url, resolved)?,
        icon: app.icon.clone(),
        subdomain: app.subdomain,
    })
}

fn check_rule(name: &str, value: &str, rule: &ValidationRule) -> Result<(), TemplateError> {
    if let Some(pattern) = &rule.pattern {
        let re = regex::Regex::new(pattern).map_err(|_| TemplateError::ValidationFailed {
            variable: name.to_string(),
            value: value.to_string(),
            reason: format!("invalid validation pattern '{pattern}'"),
        })?;
        if !re.is_match(value) {
            return Err(TemplateError::ValidationFailed {
                variable: name.to_string(),
                value: value.to_string(),
                reason: format!("must match {pattern}"),
            });
        }
    }
    if !rule.one_of.is_empty() && !rule.one_of.iter().any(|v| v == value) {
        return Err(TemplateError::ValidationFailed {
            variable: name.to_string(),
            value: value.to_string(),
            reason: format!("must be one of: {}", rule.one_of.join(", ")),
        });
    }
    Ok(())
}
