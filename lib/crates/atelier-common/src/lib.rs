pub mod handshake;
pub mod template;
pub mod types;

pub use handshake::{AgentReport, ScriptState};
pub use template::TemplateManifest;
pub use types::*;
