//! Veles - typed decoder for the DataCore game-data archive.
//!
//! This crate provides a unified interface to the Veles library ecosystem.
//!
//! # Crates
//!
//! - [`veles_common`] - Common utilities (binary cursor, GUID, CRC32C)
//! - [`veles_datacore`] - DataCore database parsing and the typed runtime
//! - [`veles_typegen`] - Typed Rust binding generation from a schema
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use veles::prelude::*;
//!
//! let database = Arc::new(Database::open("Game.dcb")?);
//! println!("Records: {}", database.records().len());
//!
//! // Dump one record as JSON
//! let exporter = JsonExporter::new(&database);
//! if let Some(record) = database.main_records().next() {
//!     println!("{}", exporter.export_record_string(record)?);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

// Re-export all sub-crates
pub use veles_common as common;
pub use veles_datacore as datacore;
pub use veles_typegen as typegen;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use veles_common::{crc, DcGuid, SpanReader};
    pub use veles_datacore::{
        ArchiveBuilder, Database, JsonExporter, LazyRef, Readable, Runtime, TypedRecord,
    };
    pub use veles_typegen::{Generator, GeneratorConfig};
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
