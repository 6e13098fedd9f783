//! Record index and instance-region mapping rows.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use veles_common::DcGuid;

use super::StringId;

/// An entry in the main-record index.
///
/// Records are the GUID-addressable entry points into the instance data.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct RecordEntry {
    /// String-table offset of the record name.
    pub name_offset: StringId,
    /// String-table offset of the source file name.
    pub file_name_offset: StringId,
    /// Index of the struct type this record is an instance of.
    pub struct_index: i32,
    /// Instance index within the struct type's region.
    pub instance_index: i32,
    /// Unique identifier of this record.
    pub id: DcGuid,
}

/// Mapping of a struct type to its instance region.
///
/// The mapping order defines the order of the regions in the data section.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct RegionMapping {
    /// Index of the struct type.
    pub struct_index: i32,
    /// Number of instances stored for this struct type.
    pub instance_count: u32,
}
