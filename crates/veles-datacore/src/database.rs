//! DataCore database parser.
//!
//! Parses the archive into schema tables, value pools, instance regions and
//! the main-record index. The database owns all bytes (memory-mapped or an
//! owned copy), is read-only after construction, and is safe to share
//! across parallel readers.

use std::path::Path;

use hashbrown::{HashMap, HashSet};
use memmap2::Mmap;
use rustc_hash::FxBuildHasher;
use veles_common::{crc, DcGuid, SpanReader};
use zerocopy::FromBytes;

use crate::layout::*;
use crate::{Error, IndexKind, Result};

type FxHashMap<K, V> = HashMap<K, V, FxBuildHasher>;
type FxHashSet<K> = HashSet<K, FxBuildHasher>;

/// Archive magic bytes.
pub const MAGIC: &[u8; 4] = b"DCDB";

/// Archive format version understood by this reader.
pub const VERSION: u32 = 1;

/// Backing bytes of a database: a memory-mapped file or an owned copy.
enum DataSource {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl DataSource {
    #[inline]
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Mapped(mmap) => mmap,
            Self::Owned(data) => data,
        }
    }
}

/// Offset and element count of one value pool within the archive bytes.
#[derive(Debug, Clone, Copy, Default)]
struct Pool {
    offset: usize,
    count: usize,
}

/// Resolution info for a GUID, returned by [`Database::try_record_info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordInfo {
    /// Struct index of the target record.
    pub struct_index: i32,
    /// Instance index of the target record.
    pub instance_index: i32,
    /// Whether the target is a main record (a file of its own).
    pub is_main: bool,
    /// String-table offset of the target's file name.
    pub file_name_offset: StringId,
}

/// A fully parsed, read-only DataCore database.
pub struct Database {
    source: DataSource,

    // Schema tables (small, copied out for cache locality)
    struct_definitions: Vec<StructDefinition>,
    property_definitions: Vec<PropertyDefinition>,
    enum_definitions: Vec<EnumDefinition>,
    enum_option_table: Vec<StringId>,
    region_mappings: Vec<RegionMapping>,
    records: Vec<RecordEntry>,

    // Value pools, by offset into the archive bytes
    bool_pool: Pool,
    int8_pool: Pool,
    int16_pool: Pool,
    int32_pool: Pool,
    int64_pool: Pool,
    uint8_pool: Pool,
    uint16_pool: Pool,
    uint32_pool: Pool,
    uint64_pool: Pool,
    float_pool: Pool,
    double_pool: Pool,
    guid_pool: Pool,
    string_id_pool: Pool,
    locale_pool: Pool,
    enum_value_pool: Pool,
    reference_pool: Pool,
    strong_pool: Pool,
    weak_pool: Pool,

    // Per-struct instance regions
    region_offsets: Vec<usize>,
    instance_counts: Vec<u32>,

    // Lookup tables
    record_map: FxHashMap<DcGuid, usize>,
    main_records: FxHashSet<DcGuid>,
    string_cache: FxHashMap<i32, Box<str>>,

    // Schema fingerprints, fixed at parse time
    struct_fingerprint: u32,
    enum_fingerprint: u32,
}

impl Database {
    /// Parse from a file path (memory-mapped).
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_source(DataSource::Mapped(mmap))
    }

    /// Parse a database from bytes (copied).
    pub fn parse(data: &[u8]) -> Result<Self> {
        Self::from_source(DataSource::Owned(data.to_vec()))
    }

    fn from_source(source: DataSource) -> Result<Self> {
        let data = source.bytes();
        let mut reader = SpanReader::new(data);

        reader.expect_magic(MAGIC)?;
        let version = reader.read_u32()?;
        if version != VERSION {
            return Err(Error::UnsupportedVersion(version));
        }

        // Section counts, in header order
        let struct_count = reader.read_u32()? as usize;
        let property_count = reader.read_u32()? as usize;
        let enum_count = reader.read_u32()? as usize;
        let enum_option_count = reader.read_u32()? as usize;
        let bool_count = reader.read_u32()? as usize;
        let int8_count = reader.read_u32()? as usize;
        let int16_count = reader.read_u32()? as usize;
        let int32_count = reader.read_u32()? as usize;
        let int64_count = reader.read_u32()? as usize;
        let uint8_count = reader.read_u32()? as usize;
        let uint16_count = reader.read_u32()? as usize;
        let uint32_count = reader.read_u32()? as usize;
        let uint64_count = reader.read_u32()? as usize;
        let float_count = reader.read_u32()? as usize;
        let double_count = reader.read_u32()? as usize;
        let guid_count = reader.read_u32()? as usize;
        let string_id_count = reader.read_u32()? as usize;
        let locale_count = reader.read_u32()? as usize;
        let enum_value_count = reader.read_u32()? as usize;
        let reference_count = reader.read_u32()? as usize;
        let strong_count = reader.read_u32()? as usize;
        let weak_count = reader.read_u32()? as usize;
        let mapping_count = reader.read_u32()? as usize;
        let record_count = reader.read_u32()? as usize;
        let text_length = reader.read_u32()? as usize;

        // (1) String table
        let table = take(&mut reader, text_length)?;
        let string_cache = Self::build_string_cache(table)?;

        // (2)-(5) Schema tables
        let struct_definitions: Vec<StructDefinition> = read_rows(&mut reader, struct_count)?;
        let property_definitions: Vec<PropertyDefinition> =
            read_rows(&mut reader, property_count)?;
        let enum_definitions: Vec<EnumDefinition> = read_rows(&mut reader, enum_count)?;
        let enum_option_table: Vec<StringId> = read_rows(&mut reader, enum_option_count)?;

        // (6) Primitive value pools
        let bool_pool = skip_pool(&mut reader, bool_count, 1)?;
        let int8_pool = skip_pool(&mut reader, int8_count, 1)?;
        let int16_pool = skip_pool(&mut reader, int16_count, 2)?;
        let int32_pool = skip_pool(&mut reader, int32_count, 4)?;
        let int64_pool = skip_pool(&mut reader, int64_count, 8)?;
        let uint8_pool = skip_pool(&mut reader, uint8_count, 1)?;
        let uint16_pool = skip_pool(&mut reader, uint16_count, 2)?;
        let uint32_pool = skip_pool(&mut reader, uint32_count, 4)?;
        let uint64_pool = skip_pool(&mut reader, uint64_count, 8)?;
        let float_pool = skip_pool(&mut reader, float_count, 4)?;
        let double_pool = skip_pool(&mut reader, double_count, 8)?;
        let guid_pool = skip_pool(&mut reader, guid_count, 16)?;
        let string_id_pool = skip_pool(&mut reader, string_id_count, 4)?;
        let locale_pool = skip_pool(&mut reader, locale_count, 4)?;

        // (7) Enum-value pool
        let enum_value_pool = skip_pool(&mut reader, enum_value_count, 4)?;

        // (8)-(10) Reference and pointer pools
        let reference_pool = skip_pool(
            &mut reader,
            reference_count,
            std::mem::size_of::<RawReference>(),
        )?;
        let strong_pool = skip_pool(&mut reader, strong_count, std::mem::size_of::<RawPointer>())?;
        let weak_pool = skip_pool(&mut reader, weak_count, std::mem::size_of::<RawPointer>())?;

        // (11) Instance regions: mapping table, then the regions themselves
        let region_mappings: Vec<RegionMapping> = read_rows(&mut reader, mapping_count)?;

        let mut region_offsets = vec![0usize; struct_count];
        let mut instance_counts = vec![0u32; struct_count];
        for mapping in &region_mappings {
            let struct_index = mapping.struct_index;
            if struct_index < 0 || struct_index as usize >= struct_count {
                return Err(Error::bad_index(IndexKind::Struct, struct_index, struct_count));
            }
            let struct_index = struct_index as usize;
            let stride = struct_definitions[struct_index].instance_size as usize;
            let region_len = stride
                .checked_mul(mapping.instance_count as usize)
                .ok_or_else(|| Error::bad_index(IndexKind::Instance, -1, 0))?;

            region_offsets[struct_index] = reader.position();
            instance_counts[struct_index] = mapping.instance_count;
            take(&mut reader, region_len)?;
        }

        // (12) Main-record index
        let records: Vec<RecordEntry> = read_rows(&mut reader, record_count)?;

        let record_map: FxHashMap<DcGuid, usize> = records
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id, i))
            .collect();

        let main_records = Self::compute_main_records(&records);

        let struct_fingerprint = Self::compute_struct_fingerprint(
            &struct_definitions,
            &property_definitions,
            &string_cache,
        );
        let enum_fingerprint =
            Self::compute_enum_fingerprint(&enum_definitions, &enum_option_table, &string_cache);

        Ok(Self {
            source,
            struct_definitions,
            property_definitions,
            enum_definitions,
            enum_option_table,
            region_mappings,
            records,
            bool_pool,
            int8_pool,
            int16_pool,
            int32_pool,
            int64_pool,
            uint8_pool,
            uint16_pool,
            uint32_pool,
            uint64_pool,
            float_pool,
            double_pool,
            guid_pool,
            string_id_pool,
            locale_pool,
            enum_value_pool,
            reference_pool,
            strong_pool,
            weak_pool,
            region_offsets,
            instance_counts,
            record_map,
            main_records,
            string_cache,
            struct_fingerprint,
            enum_fingerprint,
        })
    }

    // Schema accessors

    #[inline]
    pub fn struct_definitions(&self) -> &[StructDefinition] {
        &self.struct_definitions
    }

    #[inline]
    pub fn property_definitions(&self) -> &[PropertyDefinition] {
        &self.property_definitions
    }

    #[inline]
    pub fn enum_definitions(&self) -> &[EnumDefinition] {
        &self.enum_definitions
    }

    #[inline]
    pub fn region_mappings(&self) -> &[RegionMapping] {
        &self.region_mappings
    }

    #[inline]
    pub fn records(&self) -> &[RecordEntry] {
        &self.records
    }

    /// Resolve a string id against the interned string table.
    #[inline]
    pub fn string(&self, id: StringId) -> Option<&str> {
        self.string_cache.get(&id.id()).map(|s| &**s)
    }

    #[inline]
    pub fn struct_name(&self, index: usize) -> Option<&str> {
        self.struct_definitions
            .get(index)
            .and_then(|s| self.string(s.name_offset))
    }

    #[inline]
    pub fn enum_name(&self, index: usize) -> Option<&str> {
        self.enum_definitions
            .get(index)
            .and_then(|e| self.string(e.name_offset))
    }

    #[inline]
    pub fn property_name(&self, prop: &PropertyDefinition) -> Option<&str> {
        self.string(prop.name_offset)
    }

    #[inline]
    pub fn record_name(&self, record: &RecordEntry) -> Option<&str> {
        self.string(record.name_offset)
    }

    #[inline]
    pub fn record_file_name(&self, record: &RecordEntry) -> Option<&str> {
        self.string(record.file_name_offset)
    }

    /// Option strings of an enum definition, in declaration order.
    pub fn enum_options(&self, enum_def: &EnumDefinition) -> Vec<&str> {
        let start = enum_def.first_option_index as usize;
        let end = start + enum_def.option_count as usize;

        (start..end)
            .filter_map(|i| self.enum_option_table.get(i).and_then(|&id| self.string(id)))
            .collect()
    }

    // Record index

    /// Get a record by GUID.
    pub fn record(&self, guid: &DcGuid) -> Result<&RecordEntry> {
        self.record_map
            .get(guid)
            .map(|&i| &self.records[i])
            .ok_or(Error::UnknownRecord(*guid))
    }

    /// Get a record by its ordinal in the record index.
    pub fn record_by_index(&self, index: usize) -> Result<&RecordEntry> {
        self.records
            .get(index)
            .ok_or_else(|| Error::bad_index(IndexKind::Record, index as i64, self.records.len()))
    }

    /// Resolve a GUID to its target indices; the single entry point for
    /// reference resolution. `None` when the GUID is not in the index.
    pub fn try_record_info(&self, guid: &DcGuid) -> Option<RecordInfo> {
        let record = self.record_map.get(guid).map(|&i| &self.records[i])?;
        Some(RecordInfo {
            struct_index: record.struct_index,
            instance_index: record.instance_index,
            is_main: self.main_records.contains(guid),
            file_name_offset: record.file_name_offset,
        })
    }

    /// Check whether a GUID names a main record.
    #[inline]
    pub fn is_main_record(&self, guid: &DcGuid) -> bool {
        self.main_records.contains(guid)
    }

    /// Iterate over the main records.
    pub fn main_records(&self) -> impl Iterator<Item = &RecordEntry> {
        self.records
            .iter()
            .filter(|r| self.main_records.contains(&r.id))
    }

    // Instance storage

    /// Number of stored instances of a struct type.
    pub fn instance_count(&self, struct_index: usize) -> usize {
        self.instance_counts
            .get(struct_index)
            .copied()
            .unwrap_or(0) as usize
    }

    /// Get a cursor positioned at an instance's first byte, bounded to the
    /// instance's stride.
    pub fn instance_reader(&self, struct_index: i32, instance_index: i32) -> Result<SpanReader<'_>> {
        let struct_count = self.struct_definitions.len();
        if struct_index < 0 || struct_index as usize >= struct_count {
            return Err(Error::bad_index(IndexKind::Struct, struct_index, struct_count));
        }
        let s = struct_index as usize;
        let available = self.instance_counts[s];
        if instance_index < 0 || instance_index as u32 >= available {
            return Err(Error::bad_index(
                IndexKind::Instance,
                instance_index,
                available as usize,
            ));
        }

        let stride = self.struct_definitions[s].instance_size as usize;
        let offset = self.region_offsets[s] + stride * instance_index as usize;
        let data = self.source.bytes();
        if offset + stride > data.len() {
            return Err(veles_common::Error::EndOfBuffer {
                needed: stride,
                available: data.len().saturating_sub(offset),
            }
            .into());
        }
        Ok(SpanReader::new(&data[offset..offset + stride]))
    }

    /// Properties of a struct, ancestor chain first (base-to-derived),
    /// then its own.
    pub fn struct_properties(&self, struct_index: usize) -> Vec<&PropertyDefinition> {
        let mut chain = Vec::new();
        let mut current = struct_index as i32;
        while current >= 0 {
            match self.struct_definitions.get(current as usize) {
                Some(def) => {
                    chain.push(def);
                    current = def.parent_index;
                }
                None => break,
            }
        }

        let mut properties = Vec::new();
        for def in chain.iter().rev() {
            let start = def.first_property_index as usize;
            let end = start + def.property_count as usize;
            properties.extend(self.property_definitions[start..end].iter());
        }
        properties
    }

    // Value pool element accessors

    #[inline]
    pub fn bool_value(&self, index: usize) -> Option<bool> {
        self.pool_elem_bytes(self.bool_pool, 1, index)
            .map(|b| b[0] != 0)
    }

    #[inline]
    pub fn int8_value(&self, index: usize) -> Option<i8> {
        self.pool_elem::<i8>(self.int8_pool, index)
    }

    #[inline]
    pub fn int16_value(&self, index: usize) -> Option<i16> {
        self.pool_elem::<i16>(self.int16_pool, index)
    }

    #[inline]
    pub fn int32_value(&self, index: usize) -> Option<i32> {
        self.pool_elem::<i32>(self.int32_pool, index)
    }

    #[inline]
    pub fn int64_value(&self, index: usize) -> Option<i64> {
        self.pool_elem::<i64>(self.int64_pool, index)
    }

    #[inline]
    pub fn uint8_value(&self, index: usize) -> Option<u8> {
        self.pool_elem_bytes(self.uint8_pool, 1, index).map(|b| b[0])
    }

    #[inline]
    pub fn uint16_value(&self, index: usize) -> Option<u16> {
        self.pool_elem::<u16>(self.uint16_pool, index)
    }

    #[inline]
    pub fn uint32_value(&self, index: usize) -> Option<u32> {
        self.pool_elem::<u32>(self.uint32_pool, index)
    }

    #[inline]
    pub fn uint64_value(&self, index: usize) -> Option<u64> {
        self.pool_elem::<u64>(self.uint64_pool, index)
    }

    #[inline]
    pub fn float_value(&self, index: usize) -> Option<f32> {
        self.pool_elem::<f32>(self.float_pool, index)
    }

    #[inline]
    pub fn double_value(&self, index: usize) -> Option<f64> {
        self.pool_elem::<f64>(self.double_pool, index)
    }

    #[inline]
    pub fn guid_value(&self, index: usize) -> Option<DcGuid> {
        self.pool_elem::<DcGuid>(self.guid_pool, index)
    }

    #[inline]
    pub fn string_id_value(&self, index: usize) -> Option<StringId> {
        self.pool_elem::<StringId>(self.string_id_pool, index)
    }

    #[inline]
    pub fn locale_id_value(&self, index: usize) -> Option<StringId> {
        self.pool_elem::<StringId>(self.locale_pool, index)
    }

    #[inline]
    pub fn enum_value(&self, index: usize) -> Option<StringId> {
        self.pool_elem::<StringId>(self.enum_value_pool, index)
    }

    #[inline]
    pub fn reference_value(&self, index: usize) -> Option<RawReference> {
        self.pool_elem::<RawReference>(self.reference_pool, index)
    }

    #[inline]
    pub fn strong_value(&self, index: usize) -> Option<RawPointer> {
        self.pool_elem::<RawPointer>(self.strong_pool, index)
    }

    #[inline]
    pub fn weak_value(&self, index: usize) -> Option<RawPointer> {
        self.pool_elem::<RawPointer>(self.weak_pool, index)
    }

    // Bounds-checked range copies, used by the array helpers

    pub fn bool_range(&self, first: i32, count: i32) -> Result<Vec<bool>> {
        self.pool_range(self.bool_pool, first, count, |i| self.bool_value(i))
    }

    pub fn int8_range(&self, first: i32, count: i32) -> Result<Vec<i8>> {
        self.pool_range(self.int8_pool, first, count, |i| self.int8_value(i))
    }

    pub fn int16_range(&self, first: i32, count: i32) -> Result<Vec<i16>> {
        self.pool_range(self.int16_pool, first, count, |i| self.int16_value(i))
    }

    pub fn int32_range(&self, first: i32, count: i32) -> Result<Vec<i32>> {
        self.pool_range(self.int32_pool, first, count, |i| self.int32_value(i))
    }

    pub fn int64_range(&self, first: i32, count: i32) -> Result<Vec<i64>> {
        self.pool_range(self.int64_pool, first, count, |i| self.int64_value(i))
    }

    pub fn uint8_range(&self, first: i32, count: i32) -> Result<Vec<u8>> {
        self.pool_range(self.uint8_pool, first, count, |i| self.uint8_value(i))
    }

    pub fn uint16_range(&self, first: i32, count: i32) -> Result<Vec<u16>> {
        self.pool_range(self.uint16_pool, first, count, |i| self.uint16_value(i))
    }

    pub fn uint32_range(&self, first: i32, count: i32) -> Result<Vec<u32>> {
        self.pool_range(self.uint32_pool, first, count, |i| self.uint32_value(i))
    }

    pub fn uint64_range(&self, first: i32, count: i32) -> Result<Vec<u64>> {
        self.pool_range(self.uint64_pool, first, count, |i| self.uint64_value(i))
    }

    pub fn float_range(&self, first: i32, count: i32) -> Result<Vec<f32>> {
        self.pool_range(self.float_pool, first, count, |i| self.float_value(i))
    }

    pub fn double_range(&self, first: i32, count: i32) -> Result<Vec<f64>> {
        self.pool_range(self.double_pool, first, count, |i| self.double_value(i))
    }

    pub fn guid_range(&self, first: i32, count: i32) -> Result<Vec<DcGuid>> {
        self.pool_range(self.guid_pool, first, count, |i| self.guid_value(i))
    }

    pub fn string_id_range(&self, first: i32, count: i32) -> Result<Vec<StringId>> {
        self.pool_range(self.string_id_pool, first, count, |i| {
            self.string_id_value(i)
        })
    }

    pub fn locale_id_range(&self, first: i32, count: i32) -> Result<Vec<StringId>> {
        self.pool_range(self.locale_pool, first, count, |i| self.locale_id_value(i))
    }

    pub fn enum_value_range(&self, first: i32, count: i32) -> Result<Vec<StringId>> {
        self.pool_range(self.enum_value_pool, first, count, |i| self.enum_value(i))
    }

    pub fn reference_range(&self, first: i32, count: i32) -> Result<Vec<RawReference>> {
        self.pool_range(self.reference_pool, first, count, |i| {
            self.reference_value(i)
        })
    }

    pub fn strong_range(&self, first: i32, count: i32) -> Result<Vec<RawPointer>> {
        self.pool_range(self.strong_pool, first, count, |i| self.strong_value(i))
    }

    pub fn weak_range(&self, first: i32, count: i32) -> Result<Vec<RawPointer>> {
        self.pool_range(self.weak_pool, first, count, |i| self.weak_value(i))
    }

    // Fingerprints

    /// Stable hash of the struct table (and its properties) in declaration
    /// order. Value pools and instance bytes do not contribute.
    #[inline]
    pub fn struct_fingerprint(&self) -> u32 {
        self.struct_fingerprint
    }

    /// Stable hash of the enum table (and its option strings) in
    /// declaration order.
    #[inline]
    pub fn enum_fingerprint(&self) -> u32 {
        self.enum_fingerprint
    }

    // Helpers

    #[inline]
    fn pool_elem_bytes(&self, pool: Pool, elem_size: usize, index: usize) -> Option<&[u8]> {
        if index >= pool.count {
            return None;
        }
        let offset = pool.offset + index * elem_size;
        self.source.bytes().get(offset..offset + elem_size)
    }

    #[inline]
    fn pool_elem<T: FromBytes>(&self, pool: Pool, index: usize) -> Option<T> {
        let bytes = self.pool_elem_bytes(pool, std::mem::size_of::<T>(), index)?;
        T::read_from_bytes(bytes).ok()
    }

    fn pool_range<T>(
        &self,
        pool: Pool,
        first: i32,
        count: i32,
        elem: impl Fn(usize) -> Option<T>,
    ) -> Result<Vec<T>> {
        if count <= 0 {
            // An empty array is valid regardless of its first index.
            return Ok(Vec::new());
        }
        if first < 0 || first as usize + count as usize > pool.count {
            return Err(Error::bad_index(IndexKind::Pool, first as i64, pool.count));
        }
        let start = first as usize;
        (start..start + count as usize)
            .map(|i| elem(i).ok_or_else(|| Error::bad_index(IndexKind::Pool, i as i64, pool.count)))
            .collect()
    }

    fn build_string_cache(table: &[u8]) -> Result<FxHashMap<i32, Box<str>>> {
        let mut cache = FxHashMap::default();
        cache.reserve(table.len() / 16);

        let mut offset = 0;
        while offset < table.len() {
            let null_pos = memchr::memchr(0, &table[offset..])
                .map(|p| offset + p)
                .unwrap_or(table.len());

            let s = std::str::from_utf8(&table[offset..null_pos])
                .map_err(veles_common::Error::Utf8)?;
            cache.insert(offset as i32, Box::from(s));

            offset = null_pos + 1;
        }

        Ok(cache)
    }

    fn compute_main_records(records: &[RecordEntry]) -> FxHashSet<DcGuid> {
        // The first record carrying each distinct file name is that file's
        // main record.
        let mut seen_files: FxHashMap<i32, DcGuid> = FxHashMap::default();
        seen_files.reserve(records.len());

        for record in records {
            seen_files
                .entry(record.file_name_offset.id())
                .or_insert(record.id);
        }

        seen_files.into_values().collect()
    }

    fn compute_struct_fingerprint(
        structs: &[StructDefinition],
        properties: &[PropertyDefinition],
        strings: &FxHashMap<i32, Box<str>>,
    ) -> u32 {
        let name_of = |id: StringId| strings.get(&id.id()).map(|s| &**s).unwrap_or("");

        let mut hash = 0u32;
        for def in structs {
            hash = crc::hash_str_with_seed(name_of(def.name_offset), hash);
            hash = crc::hash_bytes_with_seed(&def.parent_index.to_le_bytes(), hash);

            let start = def.first_property_index as usize;
            let end = start + def.property_count as usize;
            for prop in &properties[start..end] {
                hash = crc::hash_str_with_seed(name_of(prop.name_offset), hash);
                hash = crc::hash_bytes_with_seed(&prop.data_type.to_le_bytes(), hash);
                hash = crc::hash_bytes_with_seed(&prop.conversion.to_le_bytes(), hash);
                hash = crc::hash_bytes_with_seed(&prop.target_index.to_le_bytes(), hash);
            }
        }
        hash
    }

    fn compute_enum_fingerprint(
        enums: &[EnumDefinition],
        options: &[StringId],
        strings: &FxHashMap<i32, Box<str>>,
    ) -> u32 {
        let name_of = |id: StringId| strings.get(&id.id()).map(|s| &**s).unwrap_or("");

        let mut hash = 0u32;
        for def in enums {
            hash = crc::hash_str_with_seed(name_of(def.name_offset), hash);

            let start = def.first_option_index as usize;
            let end = start + def.option_count as usize;
            for option in &options[start..end.min(options.len())] {
                hash = crc::hash_str_with_seed(name_of(*option), hash);
            }
        }
        hash
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("structs", &self.struct_definitions.len())
            .field("properties", &self.property_definitions.len())
            .field("enums", &self.enum_definitions.len())
            .field("records", &self.records.len())
            .finish()
    }
}

fn read_rows<T: FromBytes>(reader: &mut SpanReader<'_>, count: usize) -> Result<Vec<T>> {
    let mut rows = Vec::with_capacity(count);
    for _ in 0..count {
        rows.push(reader.read_struct::<T>()?);
    }
    Ok(rows)
}

fn skip_pool(reader: &mut SpanReader<'_>, count: usize, elem_size: usize) -> Result<Pool> {
    let pool = Pool {
        offset: reader.position(),
        count,
    };
    take(reader, count * elem_size)?;
    Ok(pool)
}

fn take<'a>(reader: &mut SpanReader<'a>, len: usize) -> Result<&'a [u8]> {
    Ok(reader.read_bytes(len)?)
}
