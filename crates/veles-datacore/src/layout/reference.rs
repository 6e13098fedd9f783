//! Raw reference and pointer rows.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use veles_common::DcGuid;

/// An already-resolved link to an instance, stored as an index pair.
///
/// The same layout backs both the strong and the weak pointer pools; the
/// strong/weak distinction is advisory.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, PartialEq, Eq)]
#[repr(C, packed)]
pub struct RawPointer {
    /// Index of the struct type.
    pub struct_index: i32,
    /// Instance index within the struct type's region.
    pub instance_index: i32,
}

impl RawPointer {
    /// The null pointer sentinel.
    pub const NULL: Self = Self {
        struct_index: -1,
        instance_index: -1,
    };

    /// Check if this is a null pointer.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.struct_index == -1 || self.instance_index == -1
    }
}

/// A GUID-keyed link to another record.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, PartialEq, Eq)]
#[repr(C, packed)]
pub struct RawReference {
    /// GUID of the referenced record.
    pub record_id: DcGuid,
    /// Instance index hint carried by the archive (unused by resolution).
    pub instance_index: i32,
}

impl RawReference {
    /// The null reference sentinel.
    pub const NULL: Self = Self {
        record_id: DcGuid::EMPTY,
        instance_index: -1,
    };

    /// Check if this is a null reference.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.record_id.is_empty()
    }
}
