//! Version command.

use anyhow::Result;

/// Entry point for `atelier version`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn run(json_mode: bool) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    if json_mode {
        println!(
            "{}",
            serde_json::json!({ "name": "atelier", "version": version })
        );
    } else {
        println!("atelier v{version}");
    }
    Ok(())
}
