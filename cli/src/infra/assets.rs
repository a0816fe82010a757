//! Embedded assets — the starter template written by `atelier init`.

use anyhow::Result;
use include_dir::{Dir, include_dir};

static ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/assets");

/// Get the raw bytes of a single embedded asset.
///
/// # Errors
///
/// Returns an error if the asset does not exist.
pub fn get_asset(name: &str) -> Result<&'static [u8]> {
    ASSETS
        .get_file(name)
        .map(include_dir::File::contents)
        .ok_or_else(|| anyhow::anyhow!("embedded asset not found: {name}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn starter_template_is_embedded_and_parses() {
        let bytes = get_asset("template.yaml").unwrap();
        let manifest: atelier_common::TemplateManifest =
            serde_yaml::from_slice(bytes).unwrap();
        assert_eq!(manifest.kind, "Template");
        assert!(!manifest.spec.variables.is_empty());
    }

    #[test]
    fn unknown_asset_is_an_error() {
        assert!(get_asset("nope.yaml").is_err());
    }
}
