//! Struct and enum definition rows.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::StringId;

/// Definition of a struct type.
///
/// An instance's layout is the concatenation of the ancestor chain's
/// properties in base-to-derived order followed by the struct's own;
/// `instance_size` is the resulting stride.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct StructDefinition {
    /// String-table offset of the struct name.
    pub name_offset: StringId,
    /// Index of the parent struct type (-1 for a root).
    pub parent_index: i32,
    /// Number of properties declared by this struct (not inherited).
    pub property_count: u16,
    /// Index of the first property in the property table.
    pub first_property_index: u16,
    /// Stride of one instance in bytes, inherited properties included.
    pub instance_size: u32,
}

impl StructDefinition {
    /// Check if this struct has a parent.
    #[inline]
    pub fn has_parent(&self) -> bool {
        self.parent_index >= 0
    }
}

/// Definition of an enum type.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct EnumDefinition {
    /// String-table offset of the enum name.
    pub name_offset: StringId,
    /// Number of options in this enum.
    pub option_count: u16,
    /// Index of the first option in the enum-option table.
    pub first_option_index: u16,
}
