//! DataCore export functionality.
//!
//! Serialises records to JSON by walking raw instances against the schema,
//! resolving internal references inline and stubbing external files and
//! cycles.
//!
//! With the `parallel` feature, whole-database exports fan out over rayon.

mod json;

pub use json::JsonExporter;

#[cfg(feature = "parallel")]
mod parallel;

#[cfg(feature = "parallel")]
pub use parallel::{ExportStats, ParallelJsonExporter};
