//! Type generator for DataCore schemas.
//!
//! Consumes a parsed [`Database`] and emits a Rust source tree: one
//! strongly typed record per struct definition with a deterministic
//! deserialiser, one enum per enum definition with an `Unknown` fallback,
//! a central dispatch table keyed by struct index, and the schema
//! fingerprint constants that couple the generated code to the archive
//! version.
//!
//! Generation is deterministic: the same database bytes produce
//! byte-identical source output, so generated trees can be committed and
//! diffed across schema versions.
//!
//! # Example
//!
//! ```no_run
//! use veles_datacore::Database;
//! use veles_typegen::{Generator, GeneratorConfig};
//!
//! let db = Database::open("Game.dcb")?;
//! let generator = Generator::new(&db);
//!
//! let mut config = GeneratorConfig::new("./generated");
//! config.emit_manifest = true;
//! generator.generate(&config)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod config;
mod emit;
mod names;

use std::path::PathBuf;

use thiserror::Error as ThisError;
use veles_datacore::Database;

pub use config::GeneratorConfig;
pub use names::escape_ident;

/// Errors that can occur during generation.
#[derive(Debug, ThisError)]
pub enum Error {
    /// I/O error while writing the source tree.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A property carries a data-type tag this generator does not know.
    #[error("property {property} has unknown data type {tag:#06x}")]
    UnknownDataType { property: String, tag: u16 },

    /// A property carries a conversion tag this generator does not know.
    #[error("unknown conversion tag {tag}")]
    UnknownConversion { tag: u16 },
}

/// Result type for generator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The rendered source files of one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    /// Enum bindings (`enums.rs`).
    pub enums: String,
    /// Record bindings (`records.rs`).
    pub records: String,
    /// Dispatch table (`dispatch.rs`).
    pub dispatch: String,
    /// Schema constants (`schema.rs`).
    pub schema: String,
    /// Module root (`mod.rs`, or `lib.rs` with a manifest).
    pub module: String,
}

/// Generates typed Rust bindings from a parsed database.
pub struct Generator<'a> {
    database: &'a Database,
}

impl<'a> Generator<'a> {
    /// Create a generator over a database.
    pub fn new(database: &'a Database) -> Self {
        Self { database }
    }

    /// Render all source files without touching the filesystem.
    pub fn render(&self, config: &GeneratorConfig) -> Result<GeneratedSource> {
        Ok(GeneratedSource {
            enums: emit::render_enums(self.database)?,
            records: emit::render_records(self.database)?,
            dispatch: emit::render_dispatch(self.database, &config.dispatcher_name)?,
            schema: emit::render_schema(self.database),
            module: emit::render_module(&config.dispatcher_name),
        })
    }

    /// Render and write the source tree; returns the written paths.
    ///
    /// Without a manifest the files land directly in `out_dir` with a
    /// `mod.rs` root; with `emit_manifest` the layout is a Cargo package
    /// (`Cargo.toml` + `src/lib.rs`).
    pub fn generate(&self, config: &GeneratorConfig) -> Result<Vec<PathBuf>> {
        let source = self.render(config)?;

        let (source_dir, root_name) = if config.emit_manifest {
            (config.out_dir.join("src"), "lib.rs")
        } else {
            (config.out_dir.clone(), "mod.rs")
        };
        std::fs::create_dir_all(&source_dir)?;

        let mut written = Vec::new();
        for (name, content) in [
            (root_name, &source.module),
            ("enums.rs", &source.enums),
            ("records.rs", &source.records),
            ("dispatch.rs", &source.dispatch),
            ("schema.rs", &source.schema),
        ] {
            let path = source_dir.join(name);
            std::fs::write(&path, content)?;
            written.push(path);
        }

        if config.emit_manifest {
            let path = config.out_dir.join("Cargo.toml");
            std::fs::write(&path, emit::render_manifest(&config.module_name))?;
            written.push(path);
        }

        Ok(written)
    }
}
