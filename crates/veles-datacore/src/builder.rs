//! Archive builder.
//!
//! Programmatic construction of DataCore archives, used by the test suites
//! and by tooling that needs a database to decode. The builder creates new
//! archives; the decoder side of this crate stays read-only.
//!
//! Schema first, data second: declare all structs, properties and enums
//! before creating records or instances, because instance storage is sized
//! from the finished struct layout.
//!
//! # Example
//!
//! ```no_run
//! use veles_datacore::{ArchiveBuilder, DataType};
//!
//! let mut builder = ArchiveBuilder::new();
//!
//! let weapon = builder.add_struct("Weapon", None);
//! builder.add_property(weapon, "name", DataType::String);
//! builder.add_property(weapon, "damage", DataType::Single);
//!
//! let record = builder.add_record("LaserRifle", weapon, "weapons/laser_rifle.xml");
//! let inst = builder.record_instance(record);
//! builder.set_string(inst, "name", "Laser Rifle");
//! builder.set_float(inst, "damage", 150.0);
//!
//! builder.write_to_file("output.dcb")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::io::{self, Write};
use std::path::Path;

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use zerocopy::IntoBytes;

use veles_common::DcGuid;

use crate::database::{MAGIC, VERSION};
use crate::layout::{
    EnumDefinition, PropertyDefinition, RawPointer, RawReference, RecordEntry, RegionMapping,
    StringId, StructDefinition,
};
use crate::types::{Conversion, DataType};

type FxHashMap<K, V> = HashMap<K, V, FxBuildHasher>;

/// Handle to a struct type in the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructHandle(pub u32);

/// Handle to an enum type in the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumHandle(pub u32);

/// Handle to a record in the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHandle(pub u32);

/// Handle to a struct instance in the builder.
///
/// Every record owns one, and free-standing instances back embedded-class
/// arrays and pointer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceHandle {
    pub struct_index: u32,
    pub instance_index: u32,
}

#[derive(Debug, Clone)]
struct StructDef {
    name: String,
    parent_index: i32,
    first_property_index: u16,
    property_count: u16,
    size: u32,
}

#[derive(Debug, Clone)]
struct PropertyDef {
    name: String,
    target_index: u16,
    data_type: DataType,
    conversion: Conversion,
}

#[derive(Debug, Clone)]
struct EnumDef {
    name: String,
    first_option_index: u16,
    option_count: u16,
}

#[derive(Debug, Clone)]
struct RecordDef {
    name: String,
    file_name: String,
    struct_index: u32,
    guid: DcGuid,
    instance_index: u32,
}

/// String table with interning; offsets are stable once handed out.
#[derive(Debug, Default)]
struct StringTable {
    data: Vec<u8>,
    offsets: FxHashMap<String, i32>,
}

impl StringTable {
    fn add(&mut self, s: &str) -> i32 {
        if let Some(&offset) = self.offsets.get(s) {
            return offset;
        }

        let offset = self.data.len() as i32;
        self.data.extend_from_slice(s.as_bytes());
        self.data.push(0);
        self.offsets.insert(s.to_owned(), offset);
        offset
    }

    fn offset_of(&self, s: &str) -> i32 {
        self.offsets.get(s).copied().unwrap_or(-1)
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}

/// Builder for creating DataCore archives.
#[derive(Debug, Default)]
pub struct ArchiveBuilder {
    structs: Vec<StructDef>,
    properties: Vec<PropertyDef>,
    enums: Vec<EnumDef>,
    enum_options: Vec<String>,
    records: Vec<RecordDef>,

    bool_pool: Vec<bool>,
    int8_pool: Vec<i8>,
    int16_pool: Vec<i16>,
    int32_pool: Vec<i32>,
    int64_pool: Vec<i64>,
    uint8_pool: Vec<u8>,
    uint16_pool: Vec<u16>,
    uint32_pool: Vec<u32>,
    uint64_pool: Vec<u64>,
    float_pool: Vec<f32>,
    double_pool: Vec<f64>,
    guid_pool: Vec<DcGuid>,
    string_id_pool: Vec<StringId>,
    locale_pool: Vec<StringId>,
    enum_value_pool: Vec<StringId>,
    reference_pool: Vec<RawReference>,
    strong_pool: Vec<RawPointer>,
    weak_pool: Vec<RawPointer>,

    string_table: StringTable,

    /// Instance bytes per struct index, instances back to back.
    instance_data: Vec<Vec<u8>>,
    instance_counts: Vec<u32>,
}

impl ArchiveBuilder {
    /// Create a new empty archive builder.
    pub fn new() -> Self {
        Self::default()
    }

    // Schema declaration

    /// Add a struct type, optionally inheriting from a parent.
    pub fn add_struct(&mut self, name: &str, parent: Option<StructHandle>) -> StructHandle {
        let index = self.structs.len() as u32;
        let parent_index = parent.map(|h| h.0 as i32).unwrap_or(-1);

        // A derived struct starts where its ancestor chain's layout ends.
        let initial_size = parent.map(|h| self.structs[h.0 as usize].size).unwrap_or(0);

        self.structs.push(StructDef {
            name: name.to_owned(),
            parent_index,
            first_property_index: self.properties.len() as u16,
            property_count: 0,
            size: initial_size,
        });

        self.instance_data.push(Vec::new());
        self.instance_counts.push(0);

        StructHandle(index)
    }

    /// Add a scalar property of a plain data type.
    ///
    /// Properties must be added in order, immediately after creating their
    /// struct.
    pub fn add_property(&mut self, s: StructHandle, name: &str, data_type: DataType) {
        self.push_property(s, name, data_type, 0, Conversion::Scalar);
    }

    /// Add an array property of a plain data type.
    pub fn add_array_property(&mut self, s: StructHandle, name: &str, element_type: DataType) {
        self.push_property(s, name, element_type, 0, Conversion::Array);
    }

    /// Add a scalar property targeting another struct (Class, Reference,
    /// StrongPointer, WeakPointer).
    ///
    /// For an embedded class the target struct's layout must be complete.
    pub fn add_typed_property(
        &mut self,
        s: StructHandle,
        name: &str,
        data_type: DataType,
        target: StructHandle,
    ) {
        self.push_property(s, name, data_type, target.0 as u16, Conversion::Scalar);
    }

    /// Add an array property targeting another struct.
    pub fn add_typed_array_property(
        &mut self,
        s: StructHandle,
        name: &str,
        element_type: DataType,
        target: StructHandle,
    ) {
        self.push_property(s, name, element_type, target.0 as u16, Conversion::Array);
    }

    /// Add a scalar enum-choice property.
    pub fn add_enum_property(&mut self, s: StructHandle, name: &str, target: EnumHandle) {
        self.push_property(s, name, DataType::EnumChoice, target.0 as u16, Conversion::Scalar);
    }

    /// Add an enum-choice array property.
    pub fn add_enum_array_property(&mut self, s: StructHandle, name: &str, target: EnumHandle) {
        self.push_property(s, name, DataType::EnumChoice, target.0 as u16, Conversion::Array);
    }

    fn push_property(
        &mut self,
        s: StructHandle,
        name: &str,
        data_type: DataType,
        target_index: u16,
        conversion: Conversion,
    ) {
        let size = match conversion {
            Conversion::Array => 8,
            Conversion::Scalar if data_type == DataType::Class => {
                self.structs[target_index as usize].size as usize
            }
            Conversion::Scalar => data_type.inline_size(),
        };

        self.properties.push(PropertyDef {
            name: name.to_owned(),
            target_index,
            data_type,
            conversion,
        });

        let def = &mut self.structs[s.0 as usize];
        def.property_count += 1;
        def.size += size as u32;
    }

    /// Add an enum type with its options.
    pub fn add_enum(&mut self, name: &str, options: &[&str]) -> EnumHandle {
        let index = self.enums.len() as u32;
        let first_option_index = self.enum_options.len() as u16;

        for option in options {
            self.enum_options.push((*option).to_owned());
        }

        self.enums.push(EnumDef {
            name: name.to_owned(),
            first_option_index,
            option_count: options.len() as u16,
        });

        EnumHandle(index)
    }

    // Data declaration

    /// Add a zero-filled instance of a struct type.
    pub fn add_instance(&mut self, s: StructHandle) -> InstanceHandle {
        let struct_index = s.0 as usize;
        let instance_index = self.instance_counts[struct_index];
        self.instance_counts[struct_index] += 1;

        let size = self.structs[struct_index].size as usize;
        let data = &mut self.instance_data[struct_index];
        data.resize(data.len() + size, 0);

        InstanceHandle {
            struct_index: s.0,
            instance_index,
        }
    }

    /// Add a record with a fresh GUID.
    pub fn add_record(&mut self, name: &str, s: StructHandle, file_name: &str) -> RecordHandle {
        self.add_record_with_guid(name, s, file_name, DcGuid::random())
    }

    /// Add a record with a specific GUID.
    pub fn add_record_with_guid(
        &mut self,
        name: &str,
        s: StructHandle,
        file_name: &str,
        guid: DcGuid,
    ) -> RecordHandle {
        let record_index = self.records.len() as u32;
        let instance = self.add_instance(s);

        self.records.push(RecordDef {
            name: name.to_owned(),
            file_name: file_name.to_owned(),
            struct_index: s.0,
            guid,
            instance_index: instance.instance_index,
        });

        RecordHandle(record_index)
    }

    /// Get the instance backing a record.
    pub fn record_instance(&self, record: RecordHandle) -> InstanceHandle {
        let def = &self.records[record.0 as usize];
        InstanceHandle {
            struct_index: def.struct_index,
            instance_index: def.instance_index,
        }
    }

    /// Get a record's GUID.
    pub fn record_guid(&self, record: RecordHandle) -> DcGuid {
        self.records[record.0 as usize].guid
    }

    // Scalar setters. Property names may be dotted paths reaching into
    // embedded classes ("transform.x"). Unknown names are ignored.

    pub fn set_bool(&mut self, h: InstanceHandle, property: &str, value: bool) {
        self.set_value(h, property, &[value as u8]);
    }

    pub fn set_i8(&mut self, h: InstanceHandle, property: &str, value: i8) {
        self.set_value(h, property, &value.to_le_bytes());
    }

    pub fn set_i16(&mut self, h: InstanceHandle, property: &str, value: i16) {
        self.set_value(h, property, &value.to_le_bytes());
    }

    pub fn set_i32(&mut self, h: InstanceHandle, property: &str, value: i32) {
        self.set_value(h, property, &value.to_le_bytes());
    }

    pub fn set_i64(&mut self, h: InstanceHandle, property: &str, value: i64) {
        self.set_value(h, property, &value.to_le_bytes());
    }

    pub fn set_u8(&mut self, h: InstanceHandle, property: &str, value: u8) {
        self.set_value(h, property, &[value]);
    }

    pub fn set_u16(&mut self, h: InstanceHandle, property: &str, value: u16) {
        self.set_value(h, property, &value.to_le_bytes());
    }

    pub fn set_u32(&mut self, h: InstanceHandle, property: &str, value: u32) {
        self.set_value(h, property, &value.to_le_bytes());
    }

    pub fn set_u64(&mut self, h: InstanceHandle, property: &str, value: u64) {
        self.set_value(h, property, &value.to_le_bytes());
    }

    pub fn set_float(&mut self, h: InstanceHandle, property: &str, value: f32) {
        self.set_value(h, property, &value.to_le_bytes());
    }

    pub fn set_double(&mut self, h: InstanceHandle, property: &str, value: f64) {
        self.set_value(h, property, &value.to_le_bytes());
    }

    pub fn set_guid(&mut self, h: InstanceHandle, property: &str, value: DcGuid) {
        self.set_value(h, property, value.as_bytes());
    }

    pub fn set_string(&mut self, h: InstanceHandle, property: &str, value: &str) {
        let id = self.string_table.add(value);
        self.set_value(h, property, &id.to_le_bytes());
    }

    pub fn set_locale(&mut self, h: InstanceHandle, property: &str, value: &str) {
        self.set_string(h, property, value);
    }

    /// Set an enum-choice property to an option name.
    pub fn set_enum(&mut self, h: InstanceHandle, property: &str, option: &str) {
        self.set_string(h, property, option);
    }

    /// Set a reference property by target GUID.
    pub fn set_reference(&mut self, h: InstanceHandle, property: &str, target: DcGuid) {
        let raw = RawReference {
            record_id: target,
            instance_index: -1,
        };
        self.set_value(h, property, raw.as_bytes());
    }

    /// Set a strong-pointer property.
    pub fn set_strong_pointer(
        &mut self,
        h: InstanceHandle,
        property: &str,
        target: Option<InstanceHandle>,
    ) {
        let raw = target.map(pointer_to).unwrap_or(RawPointer::NULL);
        self.set_value(h, property, raw.as_bytes());
    }

    /// Set a weak-pointer property.
    pub fn set_weak_pointer(
        &mut self,
        h: InstanceHandle,
        property: &str,
        target: Option<InstanceHandle>,
    ) {
        self.set_strong_pointer(h, property, target);
    }

    // Array setters: push the elements into the matching pool and write the
    // (count, first_index) header inline.

    pub fn set_bool_array(&mut self, h: InstanceHandle, property: &str, values: &[bool]) {
        let first = self.bool_pool.len() as i32;
        self.bool_pool.extend_from_slice(values);
        self.set_array_header(h, property, values.len() as i32, first);
    }

    pub fn set_i32_array(&mut self, h: InstanceHandle, property: &str, values: &[i32]) {
        let first = self.int32_pool.len() as i32;
        self.int32_pool.extend_from_slice(values);
        self.set_array_header(h, property, values.len() as i32, first);
    }

    pub fn set_u32_array(&mut self, h: InstanceHandle, property: &str, values: &[u32]) {
        let first = self.uint32_pool.len() as i32;
        self.uint32_pool.extend_from_slice(values);
        self.set_array_header(h, property, values.len() as i32, first);
    }

    pub fn set_i64_array(&mut self, h: InstanceHandle, property: &str, values: &[i64]) {
        let first = self.int64_pool.len() as i32;
        self.int64_pool.extend_from_slice(values);
        self.set_array_header(h, property, values.len() as i32, first);
    }

    pub fn set_u64_array(&mut self, h: InstanceHandle, property: &str, values: &[u64]) {
        let first = self.uint64_pool.len() as i32;
        self.uint64_pool.extend_from_slice(values);
        self.set_array_header(h, property, values.len() as i32, first);
    }

    pub fn set_float_array(&mut self, h: InstanceHandle, property: &str, values: &[f32]) {
        let first = self.float_pool.len() as i32;
        self.float_pool.extend_from_slice(values);
        self.set_array_header(h, property, values.len() as i32, first);
    }

    pub fn set_double_array(&mut self, h: InstanceHandle, property: &str, values: &[f64]) {
        let first = self.double_pool.len() as i32;
        self.double_pool.extend_from_slice(values);
        self.set_array_header(h, property, values.len() as i32, first);
    }

    pub fn set_guid_array(&mut self, h: InstanceHandle, property: &str, values: &[DcGuid]) {
        let first = self.guid_pool.len() as i32;
        self.guid_pool.extend_from_slice(values);
        self.set_array_header(h, property, values.len() as i32, first);
    }

    pub fn set_string_array(&mut self, h: InstanceHandle, property: &str, values: &[&str]) {
        let first = self.string_id_pool.len() as i32;
        for value in values {
            let id = StringId::new(self.string_table.add(value));
            self.string_id_pool.push(id);
        }
        self.set_array_header(h, property, values.len() as i32, first);
    }

    pub fn set_locale_array(&mut self, h: InstanceHandle, property: &str, values: &[&str]) {
        let first = self.locale_pool.len() as i32;
        for value in values {
            let id = StringId::new(self.string_table.add(value));
            self.locale_pool.push(id);
        }
        self.set_array_header(h, property, values.len() as i32, first);
    }

    /// Set an enum-choice array; one identifier per element in the
    /// enum-value pool.
    pub fn set_enum_array(&mut self, h: InstanceHandle, property: &str, options: &[&str]) {
        let first = self.enum_value_pool.len() as i32;
        for option in options {
            let id = StringId::new(self.string_table.add(option));
            self.enum_value_pool.push(id);
        }
        self.set_array_header(h, property, options.len() as i32, first);
    }

    pub fn set_reference_array(&mut self, h: InstanceHandle, property: &str, targets: &[DcGuid]) {
        let first = self.reference_pool.len() as i32;
        for &target in targets {
            self.reference_pool.push(RawReference {
                record_id: target,
                instance_index: -1,
            });
        }
        self.set_array_header(h, property, targets.len() as i32, first);
    }

    pub fn set_strong_pointer_array(
        &mut self,
        h: InstanceHandle,
        property: &str,
        targets: &[Option<InstanceHandle>],
    ) {
        let first = self.strong_pool.len() as i32;
        for target in targets {
            self.strong_pool
                .push(target.map(pointer_to).unwrap_or(RawPointer::NULL));
        }
        self.set_array_header(h, property, targets.len() as i32, first);
    }

    pub fn set_weak_pointer_array(
        &mut self,
        h: InstanceHandle,
        property: &str,
        targets: &[Option<InstanceHandle>],
    ) {
        let first = self.weak_pool.len() as i32;
        for target in targets {
            self.weak_pool
                .push(target.map(pointer_to).unwrap_or(RawPointer::NULL));
        }
        self.set_array_header(h, property, targets.len() as i32, first);
    }

    /// Set a class array to a run of instances.
    ///
    /// The instances must be consecutive within the target struct's region;
    /// the header stores the first index and the count.
    pub fn set_class_array(&mut self, h: InstanceHandle, property: &str, elements: &[InstanceHandle]) {
        let first = elements.first().map(|e| e.instance_index as i32).unwrap_or(0);
        debug_assert!(elements
            .iter()
            .enumerate()
            .all(|(i, e)| e.instance_index as i32 == first + i as i32));
        self.set_array_header(h, property, elements.len() as i32, first);
    }

    // Output

    /// Build the archive and write it to a file.
    pub fn write_to_file<P: AsRef<Path>>(&mut self, path: P) -> io::Result<()> {
        let data = self.build();
        std::fs::write(path, data)
    }

    /// Build the archive and return the raw bytes.
    pub fn build(&mut self) -> Vec<u8> {
        self.finalize_strings();

        let mut output = Vec::new();
        self.write_to(&mut output)
            .expect("writing to a Vec cannot fail");
        output
    }

    /// Write the archive to a writer. Call [`ArchiveBuilder::build`] unless
    /// the strings have already been finalised.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let struct_defs: Vec<StructDefinition> = self
            .structs
            .iter()
            .map(|s| StructDefinition {
                name_offset: StringId::new(self.string_table.offset_of(&s.name)),
                parent_index: s.parent_index,
                property_count: s.property_count,
                first_property_index: s.first_property_index,
                instance_size: s.size,
            })
            .collect();

        let property_defs: Vec<PropertyDefinition> = self
            .properties
            .iter()
            .map(|p| PropertyDefinition {
                name_offset: StringId::new(self.string_table.offset_of(&p.name)),
                target_index: p.target_index,
                data_type: p.data_type as u16,
                conversion: p.conversion as u16,
                _padding: 0,
            })
            .collect();

        let enum_defs: Vec<EnumDefinition> = self
            .enums
            .iter()
            .map(|e| EnumDefinition {
                name_offset: StringId::new(self.string_table.offset_of(&e.name)),
                option_count: e.option_count,
                first_option_index: e.first_option_index,
            })
            .collect();

        let enum_option_ids: Vec<StringId> = self
            .enum_options
            .iter()
            .map(|s| StringId::new(self.string_table.offset_of(s)))
            .collect();

        let mappings: Vec<RegionMapping> = self
            .structs
            .iter()
            .enumerate()
            .filter(|(i, _)| self.instance_counts[*i] > 0)
            .map(|(i, _)| RegionMapping {
                struct_index: i as i32,
                instance_count: self.instance_counts[i],
            })
            .collect();

        let records: Vec<RecordEntry> = self
            .records
            .iter()
            .map(|r| RecordEntry {
                name_offset: StringId::new(self.string_table.offset_of(&r.name)),
                file_name_offset: StringId::new(self.string_table.offset_of(&r.file_name)),
                struct_index: r.struct_index as i32,
                instance_index: r.instance_index as i32,
                id: r.guid,
            })
            .collect();

        // Header
        writer.write_all(MAGIC)?;
        writer.write_all(&VERSION.to_le_bytes())?;
        for count in [
            struct_defs.len(),
            property_defs.len(),
            enum_defs.len(),
            enum_option_ids.len(),
            self.bool_pool.len(),
            self.int8_pool.len(),
            self.int16_pool.len(),
            self.int32_pool.len(),
            self.int64_pool.len(),
            self.uint8_pool.len(),
            self.uint16_pool.len(),
            self.uint32_pool.len(),
            self.uint64_pool.len(),
            self.float_pool.len(),
            self.double_pool.len(),
            self.guid_pool.len(),
            self.string_id_pool.len(),
            self.locale_pool.len(),
            self.enum_value_pool.len(),
            self.reference_pool.len(),
            self.strong_pool.len(),
            self.weak_pool.len(),
            mappings.len(),
            records.len(),
            self.string_table.len(),
        ] {
            writer.write_all(&(count as u32).to_le_bytes())?;
        }

        // (1) String table
        writer.write_all(&self.string_table.data)?;

        // (2)-(5) Schema tables
        for def in &struct_defs {
            writer.write_all(def.as_bytes())?;
        }
        for def in &property_defs {
            writer.write_all(def.as_bytes())?;
        }
        for def in &enum_defs {
            writer.write_all(def.as_bytes())?;
        }
        for id in &enum_option_ids {
            writer.write_all(id.as_bytes())?;
        }

        // (6) Primitive value pools
        for v in &self.bool_pool {
            writer.write_all(&[*v as u8])?;
        }
        for v in &self.int8_pool {
            writer.write_all(&v.to_le_bytes())?;
        }
        for v in &self.int16_pool {
            writer.write_all(&v.to_le_bytes())?;
        }
        for v in &self.int32_pool {
            writer.write_all(&v.to_le_bytes())?;
        }
        for v in &self.int64_pool {
            writer.write_all(&v.to_le_bytes())?;
        }
        writer.write_all(&self.uint8_pool)?;
        for v in &self.uint16_pool {
            writer.write_all(&v.to_le_bytes())?;
        }
        for v in &self.uint32_pool {
            writer.write_all(&v.to_le_bytes())?;
        }
        for v in &self.uint64_pool {
            writer.write_all(&v.to_le_bytes())?;
        }
        for v in &self.float_pool {
            writer.write_all(&v.to_le_bytes())?;
        }
        for v in &self.double_pool {
            writer.write_all(&v.to_le_bytes())?;
        }
        for v in &self.guid_pool {
            writer.write_all(v.as_bytes())?;
        }
        for v in &self.string_id_pool {
            writer.write_all(v.as_bytes())?;
        }
        for v in &self.locale_pool {
            writer.write_all(v.as_bytes())?;
        }

        // (7) Enum-value pool
        for v in &self.enum_value_pool {
            writer.write_all(v.as_bytes())?;
        }

        // (8)-(10) Reference and pointer pools
        for v in &self.reference_pool {
            writer.write_all(v.as_bytes())?;
        }
        for v in &self.strong_pool {
            writer.write_all(v.as_bytes())?;
        }
        for v in &self.weak_pool {
            writer.write_all(v.as_bytes())?;
        }

        // (11) Instance regions, mapping order
        for mapping in &mappings {
            writer.write_all(mapping.as_bytes())?;
        }
        for mapping in &mappings {
            writer.write_all(&self.instance_data[mapping.struct_index as usize])?;
        }

        // (12) Main-record index
        for record in &records {
            writer.write_all(record.as_bytes())?;
        }

        Ok(())
    }

    // Helpers

    fn set_array_header(&mut self, h: InstanceHandle, property: &str, count: i32, first: i32) {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&count.to_le_bytes());
        bytes[4..].copy_from_slice(&first.to_le_bytes());
        self.set_value(h, property, &bytes);
    }

    fn set_value(&mut self, h: InstanceHandle, property: &str, bytes: &[u8]) {
        let struct_index = h.struct_index as usize;
        let Some(offset) = self.property_offset(struct_index, property) else {
            return;
        };

        let stride = self.structs[struct_index].size as usize;
        let start = h.instance_index as usize * stride + offset;
        let data = &mut self.instance_data[struct_index];
        data[start..start + bytes.len()].copy_from_slice(bytes);
    }

    /// Byte offset of a property (or dotted path) within a struct's layout,
    /// inheritance chain included.
    fn property_offset(&self, struct_index: usize, path: &str) -> Option<usize> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };

        let (offset, prop) = self.own_property_offset(struct_index, head)?;
        match rest {
            None => Some(offset),
            Some(rest) => {
                // Descend into an embedded class.
                if prop.data_type != DataType::Class || prop.conversion != Conversion::Scalar {
                    return None;
                }
                let inner = self.property_offset(prop.target_index as usize, rest)?;
                Some(offset + inner)
            }
        }
    }

    fn own_property_offset(&self, struct_index: usize, name: &str) -> Option<(usize, &PropertyDef)> {
        let def = self.structs.get(struct_index)?;

        // Parent properties occupy the leading bytes of the layout.
        let mut offset = 0;
        if def.parent_index >= 0 {
            let parent_index = def.parent_index as usize;
            if let Some(found) = self.own_property_offset(parent_index, name) {
                return Some(found);
            }
            offset = self.structs[parent_index].size as usize;
        }

        let first = def.first_property_index as usize;
        for prop in &self.properties[first..first + def.property_count as usize] {
            if prop.name == name {
                return Some((offset, prop));
            }
            offset += match prop.conversion {
                Conversion::Array => 8,
                Conversion::Scalar if prop.data_type == DataType::Class => {
                    self.structs[prop.target_index as usize].size as usize
                }
                Conversion::Scalar => prop.data_type.inline_size(),
            };
        }

        None
    }

    fn finalize_strings(&mut self) {
        for i in 0..self.structs.len() {
            self.string_table.add(&self.structs[i].name);
        }
        for i in 0..self.properties.len() {
            self.string_table.add(&self.properties[i].name);
        }
        for i in 0..self.enums.len() {
            self.string_table.add(&self.enums[i].name);
        }
        for i in 0..self.enum_options.len() {
            self.string_table.add(&self.enum_options[i]);
        }
        for i in 0..self.records.len() {
            self.string_table.add(&self.records[i].name);
            self.string_table.add(&self.records[i].file_name);
        }
    }
}

fn pointer_to(h: InstanceHandle) -> RawPointer {
    RawPointer {
        struct_index: h.struct_index as i32,
        instance_index: h.instance_index as i32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_table_interning() {
        let mut table = StringTable::default();
        let a = table.add("hello");
        let b = table.add("world");
        let c = table.add("hello");

        assert_eq!(a, 0);
        assert_eq!(b, 6); // "hello\0" = 6 bytes
        assert_eq!(c, a);
    }

    #[test]
    fn test_builder_basic() {
        let mut builder = ArchiveBuilder::new();

        let weapon = builder.add_struct("Weapon", None);
        builder.add_property(weapon, "name", DataType::String);
        builder.add_property(weapon, "damage", DataType::Single);

        let record = builder.add_record("TestWeapon", weapon, "weapons/test.xml");
        let inst = builder.record_instance(record);
        builder.set_string(inst, "name", "Test Weapon");
        builder.set_float(inst, "damage", 100.0);

        let data = builder.build();
        assert!(!data.is_empty());
        assert_eq!(&data[..4], &MAGIC[..]);
    }

    #[test]
    fn test_inherited_property_offsets() {
        let mut builder = ArchiveBuilder::new();

        let base = builder.add_struct("Base", None);
        builder.add_property(base, "a", DataType::Int32);
        let derived = builder.add_struct("Derived", Some(base));
        builder.add_property(derived, "b", DataType::Int32);

        // Inherited field sits first, own field after the parent's layout.
        assert_eq!(builder.property_offset(derived.0 as usize, "a"), Some(0));
        assert_eq!(builder.property_offset(derived.0 as usize, "b"), Some(4));
    }

    #[test]
    fn test_dotted_path_reaches_embedded_class() {
        let mut builder = ArchiveBuilder::new();

        let inner = builder.add_struct("Inner", None);
        builder.add_property(inner, "x", DataType::Int32);
        builder.add_property(inner, "y", DataType::Int32);

        let outer = builder.add_struct("Outer", None);
        builder.add_property(outer, "tag", DataType::Int32);
        builder.add_typed_property(outer, "inner", DataType::Class, inner);

        assert_eq!(builder.property_offset(outer.0 as usize, "inner.y"), Some(8));
    }
}
