//! Typed materialisation runtime.
//!
//! The runtime turns raw instance bytes into typed values on demand. It
//! owns the instance cache (deduplication + cycle break) and the enum
//! cache, resolves references and pointers through a caller-supplied
//! dispatch table, and exposes the scalar and array read helpers the
//! generated deserialisers are written against.
//!
//! The runtime itself never knows a concrete record type; generated code
//! supplies them through [`Readable`] and the dispatch function.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::{FxBuildHasher, FxHashSet};
use veles_common::{DcGuid, SpanReader};

use crate::database::Database;
use crate::layout::{RawPointer, RawReference, RecordEntry, StringId};
use crate::lazy::LazyRef;
use crate::{Error, IndexKind, Result};

/// A materialised instance with its concrete type erased.
pub type SharedInstance = Arc<dyn Any + Send + Sync>;

/// Dispatch function from struct index to a concrete-typed cache read.
///
/// Returns `None` when the table has no entry for the struct index (the
/// runtime maps this to [`Error::NullDispatch`]); the inner `Option` is
/// null for sentinel indices and in-flight cycles.
pub type DispatchFn =
    dyn Fn(&Runtime, i32, i32) -> Option<Result<Option<SharedInstance>>> + Send + Sync;

/// A record type the runtime can materialise.
///
/// Implemented by generated code; `read` performs the property sequence for
/// the exact struct layout, ancestors first.
pub trait Readable: Sized + Send + Sync + 'static {
    /// The struct index this type was generated for.
    const STRUCT_INDEX: i32;

    /// Deserialise one instance from a cursor positioned at its first byte.
    fn read(runtime: &Runtime, cursor: &mut SpanReader<'_>) -> Result<Self>;
}

/// A generated enum type with an `Unknown` fallback.
pub trait EnumType: Copy + Send + Sync + 'static {
    /// The fallback option, matched on parse miss.
    const UNKNOWN: Self;

    /// Look up an option by its string identifier.
    fn from_name(name: &str) -> Option<Self>;
}

/// A materialised main record.
pub struct TypedRecord {
    /// Record name.
    pub name: String,
    /// Source file name.
    pub file_name: String,
    /// Record GUID.
    pub id: DcGuid,
    /// The materialised root object; narrow with a type test.
    pub data: SharedInstance,
}

impl std::fmt::Debug for TypedRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedRecord")
            .field("name", &self.name)
            .field("file_name", &self.file_name)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

thread_local! {
    /// Keys currently being read on this thread; the cycle breaker.
    static IN_FLIGHT: RefCell<FxHashSet<(i32, i32)>> = RefCell::new(FxHashSet::default());
}

/// Removes its key from the in-flight set on every exit path.
struct InFlightGuard {
    key: (i32, i32),
}

impl InFlightGuard {
    /// Enter a key; `None` if the key is already being read on this thread.
    fn enter(key: (i32, i32)) -> Option<Self> {
        let entered = IN_FLIGHT.with(|set| set.borrow_mut().insert(key));
        entered.then_some(Self { key })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        IN_FLIGHT.with(|set| {
            set.borrow_mut().remove(&self.key);
        });
    }
}

/// The typed materialisation runtime.
///
/// Multiple runtimes over the same database are safe; the caches belong to
/// the runtime, the bytes to the database.
pub struct Runtime {
    database: Arc<Database>,
    dispatch: Box<DispatchFn>,
    instances: DashMap<(i32, i32), SharedInstance, FxBuildHasher>,
    enums: DashMap<(TypeId, i32), SharedInstance, FxBuildHasher>,
}

impl Runtime {
    /// Create a runtime over a database with a dispatch table.
    pub fn new<F>(database: Arc<Database>, dispatch: F) -> Self
    where
        F: Fn(&Runtime, i32, i32) -> Option<Result<Option<SharedInstance>>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            database,
            dispatch: Box::new(dispatch),
            instances: DashMap::with_hasher(FxBuildHasher),
            enums: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// The underlying database.
    #[inline]
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// Check generated-code constants against the archive's schema.
    pub fn validate_schema(
        &self,
        struct_count: usize,
        enum_count: usize,
        struct_hash: u32,
        enum_hash: u32,
    ) -> Result<()> {
        let checks: [(&'static str, u64, u64); 4] = [
            (
                "struct count",
                struct_count as u64,
                self.database.struct_definitions().len() as u64,
            ),
            (
                "enum count",
                enum_count as u64,
                self.database.enum_definitions().len() as u64,
            ),
            (
                "struct fingerprint",
                struct_hash as u64,
                self.database.struct_fingerprint() as u64,
            ),
            (
                "enum fingerprint",
                enum_hash as u64,
                self.database.enum_fingerprint() as u64,
            ),
        ];

        for (field, expected, actual) in checks {
            if expected != actual {
                return Err(Error::SchemaMismatch {
                    field,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    /// Materialise a main record into its typed root object.
    pub fn get_from_main_record(&self, record: &RecordEntry) -> Result<TypedRecord> {
        let struct_index = record.struct_index;
        let instance_index = record.instance_index;
        let data = self
            .get_or_read_polymorphic(struct_index, instance_index)?
            .ok_or(Error::NullDispatch { struct_index })?;

        Ok(TypedRecord {
            name: self
                .database
                .record_name(record)
                .unwrap_or_default()
                .to_owned(),
            file_name: self
                .database
                .record_file_name(record)
                .unwrap_or_default()
                .to_owned(),
            id: record.id,
            data,
        })
    }

    /// Cache-aware read of an instance whose concrete type is statically
    /// known.
    ///
    /// Sentinel indices yield `None`. A re-entrant read of a key currently
    /// being read on this thread yields `None` (the cycle break). A cached
    /// value of the wrong concrete type is a [`Error::TypeMismatch`].
    pub fn get_or_read_instance<T: Readable>(
        &self,
        struct_index: i32,
        instance_index: i32,
    ) -> Result<Option<Arc<T>>> {
        if struct_index < 0 || instance_index < 0 {
            return Ok(None);
        }
        let key = (struct_index, instance_index);

        if let Some(cached) = self.instances.get(&key) {
            let shared = cached.value().clone();
            drop(cached);
            return self.downcast::<T>(shared, key).map(Some);
        }

        let Some(_guard) = InFlightGuard::enter(key) else {
            tracing::debug!(struct_index, instance_index, "cycle break on re-entrant read");
            return Ok(None);
        };

        let mut cursor = self.database.instance_reader(struct_index, instance_index)?;
        let value: Arc<T> = Arc::new(T::read(self, &mut cursor)?);

        // Published only after the read returns; when two threads race on
        // the same key, one value is retained and the other discarded.
        let shared = self
            .instances
            .entry(key)
            .or_insert_with(|| value.clone() as SharedInstance)
            .value()
            .clone();

        self.downcast::<T>(shared, key).map(Some)
    }

    /// Cache-aware read resolving the concrete type through dispatch.
    ///
    /// Used by reference and pointer resolution, where the target's dynamic
    /// type may be a subtype of the declared one; consumers narrow the
    /// returned instance with a type test.
    pub fn get_or_read_polymorphic(
        &self,
        struct_index: i32,
        instance_index: i32,
    ) -> Result<Option<SharedInstance>> {
        if struct_index < 0 || instance_index < 0 {
            return Ok(None);
        }
        match (self.dispatch)(self, struct_index, instance_index) {
            Some(result) => result,
            None => Err(Error::NullDispatch { struct_index }),
        }
    }

    /// Parse an enum option from its string identifier, memoised by
    /// `(enum type, string id)`.
    ///
    /// An empty or unknown name yields `fallback`; unknown names are
    /// reported once on the debug channel.
    pub fn enum_parse<T: EnumType>(&self, id: StringId, fallback: T) -> T {
        if id.is_null() {
            return fallback;
        }
        let key = (TypeId::of::<T>(), id.id());

        if let Some(hit) = self.enums.get(&key) {
            if let Some(value) = hit.downcast_ref::<T>() {
                return *value;
            }
            return fallback;
        }

        let name = self.database.string(id).unwrap_or("");
        let value = if name.is_empty() {
            tracing::debug!(string_id = id.id(), "empty enum value");
            fallback
        } else {
            T::from_name(name).unwrap_or_else(|| {
                tracing::debug!(name, string_id = id.id(), "unknown enum option");
                fallback
            })
        };

        self.enums.insert(key, Arc::new(value));
        value
    }

    // Scalar read helpers

    /// Read an inline string id and resolve it.
    pub fn read_string(&self, cursor: &mut SpanReader<'_>) -> Result<String> {
        let id: StringId = cursor.read_struct()?;
        Ok(self.database.string(id).unwrap_or_default().to_owned())
    }

    /// Read an inline locale id and resolve it.
    pub fn read_locale(&self, cursor: &mut SpanReader<'_>) -> Result<String> {
        self.read_string(cursor)
    }

    /// Read an inline enum-choice id and parse it.
    pub fn read_enum<T: EnumType>(&self, cursor: &mut SpanReader<'_>) -> Result<T> {
        let id: StringId = cursor.read_struct()?;
        Ok(self.enum_parse(id, T::UNKNOWN))
    }

    /// Read an inline reference and wrap it lazily.
    pub fn read_reference<T>(&self, cursor: &mut SpanReader<'_>) -> Result<Option<LazyRef<T>>> {
        let raw: RawReference = cursor.read_struct()?;
        Ok(LazyRef::from_reference(raw))
    }

    /// Read an inline strong pointer and wrap it lazily.
    pub fn read_strong_pointer<T>(
        &self,
        cursor: &mut SpanReader<'_>,
    ) -> Result<Option<LazyRef<T>>> {
        let raw: RawPointer = cursor.read_struct()?;
        Ok(LazyRef::from_pointer(raw))
    }

    /// Read an inline weak pointer and wrap it lazily.
    pub fn read_weak_pointer<T>(&self, cursor: &mut SpanReader<'_>) -> Result<Option<LazyRef<T>>> {
        self.read_strong_pointer(cursor)
    }

    // Array read helpers; each reads a (count, first_index) header from the
    // cursor and dereferences the matching pool.

    pub fn read_bool_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<bool>> {
        let (count, first) = read_array_header(cursor)?;
        self.database.bool_range(first, count)
    }

    pub fn read_int8_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<i8>> {
        let (count, first) = read_array_header(cursor)?;
        self.database.int8_range(first, count)
    }

    pub fn read_int16_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<i16>> {
        let (count, first) = read_array_header(cursor)?;
        self.database.int16_range(first, count)
    }

    pub fn read_int32_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<i32>> {
        let (count, first) = read_array_header(cursor)?;
        self.database.int32_range(first, count)
    }

    pub fn read_int64_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<i64>> {
        let (count, first) = read_array_header(cursor)?;
        self.database.int64_range(first, count)
    }

    pub fn read_uint8_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<u8>> {
        let (count, first) = read_array_header(cursor)?;
        self.database.uint8_range(first, count)
    }

    pub fn read_uint16_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<u16>> {
        let (count, first) = read_array_header(cursor)?;
        self.database.uint16_range(first, count)
    }

    pub fn read_uint32_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<u32>> {
        let (count, first) = read_array_header(cursor)?;
        self.database.uint32_range(first, count)
    }

    pub fn read_uint64_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<u64>> {
        let (count, first) = read_array_header(cursor)?;
        self.database.uint64_range(first, count)
    }

    pub fn read_float_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<f32>> {
        let (count, first) = read_array_header(cursor)?;
        self.database.float_range(first, count)
    }

    pub fn read_double_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<f64>> {
        let (count, first) = read_array_header(cursor)?;
        self.database.double_range(first, count)
    }

    pub fn read_guid_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<DcGuid>> {
        let (count, first) = read_array_header(cursor)?;
        self.database.guid_range(first, count)
    }

    pub fn read_string_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<String>> {
        let (count, first) = read_array_header(cursor)?;
        let ids = self.database.string_id_range(first, count)?;
        Ok(self.resolve_strings(ids))
    }

    pub fn read_locale_array(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<String>> {
        let (count, first) = read_array_header(cursor)?;
        let ids = self.database.locale_id_range(first, count)?;
        Ok(self.resolve_strings(ids))
    }

    /// Enum arrays carry one string identifier per element in the
    /// enum-value pool.
    pub fn read_enum_array<T: EnumType>(&self, cursor: &mut SpanReader<'_>) -> Result<Vec<T>> {
        let (count, first) = read_array_header(cursor)?;
        let ids = self.database.enum_value_range(first, count)?;
        Ok(ids
            .into_iter()
            .map(|id| self.enum_parse(id, T::UNKNOWN))
            .collect())
    }

    /// Class arrays materialise eagerly, one cached instance per element at
    /// consecutive instance indices. An element is `None` only when it is
    /// part of an in-flight cycle.
    pub fn read_class_array<T: Readable>(
        &self,
        cursor: &mut SpanReader<'_>,
    ) -> Result<Vec<Option<Arc<T>>>> {
        let (count, first) = read_array_header(cursor)?;
        if count <= 0 {
            return Ok(Vec::new());
        }
        // Widen before the bound so a corrupt header cannot overflow.
        let available = self.database.instance_count(T::STRUCT_INDEX as usize);
        if first < 0 || first as usize + count as usize > available {
            return Err(Error::bad_index(IndexKind::Instance, first as i64, available));
        }
        (first..first + count)
            .map(|i| self.get_or_read_instance::<T>(T::STRUCT_INDEX, i))
            .collect()
    }

    /// Reference arrays wrap lazily without resolving.
    pub fn read_reference_array<T>(
        &self,
        cursor: &mut SpanReader<'_>,
    ) -> Result<Vec<Option<LazyRef<T>>>> {
        let (count, first) = read_array_header(cursor)?;
        let raws = self.database.reference_range(first, count)?;
        Ok(raws.into_iter().map(LazyRef::from_reference).collect())
    }

    /// Strong-pointer arrays wrap lazily without resolving.
    pub fn read_strong_pointer_array<T>(
        &self,
        cursor: &mut SpanReader<'_>,
    ) -> Result<Vec<Option<LazyRef<T>>>> {
        let (count, first) = read_array_header(cursor)?;
        let raws = self.database.strong_range(first, count)?;
        Ok(raws.into_iter().map(LazyRef::from_pointer).collect())
    }

    /// Weak-pointer arrays wrap lazily without resolving.
    pub fn read_weak_pointer_array<T>(
        &self,
        cursor: &mut SpanReader<'_>,
    ) -> Result<Vec<Option<LazyRef<T>>>> {
        let (count, first) = read_array_header(cursor)?;
        let raws = self.database.weak_range(first, count)?;
        Ok(raws.into_iter().map(LazyRef::from_pointer).collect())
    }

    // Helpers

    fn resolve_strings(&self, ids: Vec<StringId>) -> Vec<String> {
        ids.into_iter()
            .map(|id| self.database.string(id).unwrap_or_default().to_owned())
            .collect()
    }

    fn downcast<T: Readable>(&self, shared: SharedInstance, key: (i32, i32)) -> Result<Arc<T>> {
        shared.downcast::<T>().map_err(|_| Error::TypeMismatch {
            struct_index: key.0,
            instance_index: key.1,
            expected: std::any::type_name::<T>(),
        })
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("database", &self.database)
            .field("cached_instances", &self.instances.len())
            .field("cached_enums", &self.enums.len())
            .finish_non_exhaustive()
    }
}

/// Read a `(count, first_index)` array header.
fn read_array_header(cursor: &mut SpanReader<'_>) -> Result<(i32, i32)> {
    let count = cursor.read_i32()?;
    let first = cursor.read_i32()?;
    Ok((count, first))
}

/// Read an instance through the statically-typed cache path and erase it.
///
/// The building block of generated dispatch tables.
pub fn read_erased<T: Readable>(
    runtime: &Runtime,
    struct_index: i32,
    instance_index: i32,
) -> Result<Option<SharedInstance>> {
    Ok(runtime
        .get_or_read_instance::<T>(struct_index, instance_index)?
        .map(|instance| instance as SharedInstance))
}
