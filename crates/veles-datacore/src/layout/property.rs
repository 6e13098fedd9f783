//! Property definition rows.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use super::StringId;
use crate::types::{Conversion, DataType};

/// Definition of a property within a struct.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct PropertyDefinition {
    /// String-table offset of the property name.
    pub name_offset: StringId,
    /// Target index; struct index for Class/Reference/StrongPointer/
    /// WeakPointer, enum index for EnumChoice, unused otherwise.
    pub target_index: u16,
    /// Data-type tag of this property.
    pub data_type: u16,
    /// Conversion tag: 0 = scalar, 1 = array.
    pub conversion: u16,
    /// Padding.
    pub _padding: u16,
}

impl PropertyDefinition {
    /// Get the data type as an enum.
    #[inline]
    pub fn get_data_type(&self) -> Option<DataType> {
        DataType::from_u16(self.data_type)
    }

    /// Get the conversion tag as an enum.
    #[inline]
    pub fn get_conversion(&self) -> Option<Conversion> {
        Conversion::from_u16(self.conversion)
    }

    /// Check if this property is an array.
    #[inline]
    pub fn is_array(&self) -> bool {
        self.conversion == Conversion::Array as u16
    }

    /// Bytes this property occupies in instance storage.
    ///
    /// Embedded classes are excluded; their size comes from the target
    /// struct definition.
    pub fn inline_size(&self) -> usize {
        if self.is_array() {
            8 // count + first_index
        } else {
            self.get_data_type().map_or(0, |dt| dt.inline_size())
        }
    }
}
