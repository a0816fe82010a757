//! App endpoint registration against a ready agent.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use atelier_common::{AppSpec, LifecyclePhase, WorkspaceRecord};

use crate::domain::error::AppError;

const SLUG_MAX_LEN: usize = 40;

/// Validates an app slug.
///
/// Slugs are DNS-label-shaped: lowercase alphanumerics and hyphens, no
/// leading or trailing hyphen, at most 40 characters. They may end up in
/// subdomains, so the shape is not negotiable.
///
/// # Errors
///
/// Returns `AppError::InvalidSlug` if the slug doesn't match.
pub fn validate_slug(slug: &str) -> Result<(), AppError> {
    let bytes = slug.as_bytes();
    let shape_ok = !bytes.is_empty()
        && bytes.len() <= SLUG_MAX_LEN
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && bytes[0] != b'-'
        && bytes[bytes.len() - 1] != b'-';
    if shape_ok {
        Ok(())
    } else {
        Err(AppError::InvalidSlug(slug.to_string()))
    }
}

/// Register an app endpoint against a ready workspace, preserving
/// declaration order.
///
/// # Errors
///
/// Rejects registration when the workspace is not `ready`, when the slug is
/// malformed, or when the slug is already taken (checked here, at
/// registration time — lookups never have to disambiguate).
pub fn register_app(rec: &mut WorkspaceRecord, app: AppSpec) -> Result<(), AppError> {
    if rec.phase != LifecyclePhase::Ready {
        return Err(AppError::AgentNotReady(rec.phase));
    }
    validate_slug(&app.slug)?;
    if rec.apps.iter().any(|a| a.slug == app.slug) {
        return Err(AppError::DuplicateSlug(app.slug));
    }
    rec.apps.push(app);
    Ok(())
}

/// Read-only lookup of a registered app by slug.
#[must_use]
pub fn find_app<'a>(rec: &'a WorkspaceRecord, slug: &str) -> Option<&'a AppSpec> {
    rec.apps.iter().find(|a| a.slug == slug)
}

/// Dry-run the slug uniqueness check over a template's declared apps.
///
/// Used by `atelier validate` so authoring bugs surface before anything is
/// provisioned.
///
/// # Errors
///
/// Returns the first malformed or duplicated slug.
pub fn check_declared_apps(apps: &[AppSpec]) -> Result<(), AppError> {
    for (i, app) in apps.iter().enumerate() {
        validate_slug(&app.slug)?;
        if apps[..i].iter().any(|a| a.slug == app.slug) {
            return Err(AppError::DuplicateSlug(app.slug.clone()));
        }
    }
    Ok(())
}
