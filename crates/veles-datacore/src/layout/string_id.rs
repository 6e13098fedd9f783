//! String identifiers referencing the string table.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Reference to a string in the string table.
///
/// The id is the byte offset of a null-terminated UTF-8 string; `-1` is the
/// null id.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, PartialEq, Eq, Hash)]
#[repr(C, packed)]
pub struct StringId {
    id: i32,
}

impl StringId {
    /// Create a new string id from a table offset.
    #[inline]
    pub const fn new(offset: i32) -> Self {
        Self { id: offset }
    }

    /// Create a null string id.
    #[inline]
    pub const fn null() -> Self {
        Self { id: -1 }
    }

    /// Check if this is a null/empty string reference.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.id() < 0
    }

    /// Get the offset value.
    #[inline]
    pub fn id(&self) -> i32 {
        self.id
    }
}

impl Default for StringId {
    fn default() -> Self {
        Self::null()
    }
}
