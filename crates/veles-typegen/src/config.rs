//! Generator configuration.

use std::path::PathBuf;

/// Configuration for a generation run.
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Directory the source tree is written into.
    pub out_dir: PathBuf,
    /// Module (and, with a manifest, package) name of the generated code.
    pub module_name: String,
    /// Name of the generated dispatcher type.
    pub dispatcher_name: String,
    /// Emit a Cargo manifest and a `src/` layout instead of a bare module.
    pub emit_manifest: bool,
}

impl GeneratorConfig {
    /// Configuration with default naming for an output directory.
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            module_name: "datacore_generated".to_owned(),
            dispatcher_name: "Dispatcher".to_owned(),
            emit_manifest: false,
        }
    }
}
