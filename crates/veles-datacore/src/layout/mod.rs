//! On-disk row layouts of the DataCore schema tables.

mod definition;
mod property;
mod record;
mod reference;
mod string_id;

pub use definition::{EnumDefinition, StructDefinition};
pub use property::PropertyDefinition;
pub use record::{RecordEntry, RegionMapping};
pub use reference::{RawPointer, RawReference};
pub use string_id::StringId;
