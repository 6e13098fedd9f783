//! DataCore binary database reader and typed materialisation runtime.
//!
//! The DataCore archive packs tens of thousands of heterogeneous structured
//! records (items, vehicles, weapons, missions, localisation) behind a
//! schema of struct and enum definitions. This crate parses the archive
//! once and then lets consumers walk it as a typed object graph, with
//! polymorphism, lazy cross-record resolution, and cycle tolerance.
//!
//! # Layers
//!
//! - [`Database`]: parses the archive into schema tables, value pools,
//!   instance regions and the main-record index. Owns all bytes, read-only,
//!   shareable across threads.
//! - [`Runtime`]: materialises typed instances on demand, caches them,
//!   breaks cycles, resolves references and pointers, and parses enums.
//!   Concrete record types come from generated code (see `veles-typegen`)
//!   through the [`Readable`] trait and a dispatch table.
//! - [`LazyRef`]: the deferred wrapper behind reference and pointer fields;
//!   resolution happens on first `value()` access.
//! - [`ArchiveBuilder`]: programmatic construction of archives for tests
//!   and tooling.
//! - [`JsonExporter`]: schema-driven JSON dumps of records.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use veles_datacore::{Database, Runtime};
//!
//! let database = Arc::new(Database::open("Game.dcb")?);
//!
//! // The dispatch table is generated per schema version by veles-typegen;
//! // generated::Dispatcher::dispatch maps struct indices to concrete types.
//! # fn dispatch(_: &veles_datacore::Runtime, _: i32, _: i32)
//! #     -> Option<veles_datacore::Result<Option<veles_datacore::SharedInstance>>> { None }
//! let runtime = Runtime::new(database.clone(), dispatch);
//!
//! for record in database.main_records() {
//!     let typed = runtime.get_from_main_record(record)?;
//!     println!("{} ({})", typed.name, typed.id);
//! }
//! # Ok::<(), veles_datacore::Error>(())
//! ```
//!
//! # Cycles
//!
//! Object graphs in the archive are cyclic. Every handle is backed by a
//! `(struct_index, instance_index)` pair, so cycles reduce to a fixed-point
//! table: the instance cache. A re-entrant read of a key currently being
//! materialised on the same thread yields null instead of recursing
//! forever; dereferencing the same link again after materialisation
//! completes observes the cached value.

mod builder;
mod database;
mod error;
mod lazy;
mod runtime;
mod types;

pub mod export;
pub mod layout;

// Primary API
pub use database::{Database, RecordInfo, MAGIC, VERSION};
pub use error::{Error, IndexKind, Result};
pub use lazy::LazyRef;
pub use runtime::{
    read_erased, DispatchFn, EnumType, Readable, Runtime, SharedInstance, TypedRecord,
};

// Builder API
pub use builder::{ArchiveBuilder, EnumHandle, InstanceHandle, RecordHandle, StructHandle};

// Export types
pub use export::JsonExporter;
#[cfg(feature = "parallel")]
pub use export::{ExportStats, ParallelJsonExporter};

// Low-level types
pub use types::{Conversion, DataType};
