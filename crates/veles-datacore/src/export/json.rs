//! JSON export for DataCore records.
//!
//! The walk follows the object graph the typed runtime exposes, with the
//! serialisation contract: a null reference writes `null`; a reference to
//! another main record writes a `{"$ref", "RecordId"}` stub; an internal
//! reference resolves and writes its value inline; a cycle writes a
//! `{"$circularRef": "(structIndex, instanceIndex)"}` placeholder.

use hashbrown::HashSet;
use rustc_hash::FxBuildHasher;
use serde_json::{Map, Value};
use veles_common::SpanReader;

use crate::database::Database;
use crate::layout::{RawPointer, RawReference, RecordEntry, StringId};
use crate::types::DataType;
use crate::{Error, IndexKind, Result};

type FxHashSet<K> = HashSet<K, FxBuildHasher>;

/// JSON exporter for DataCore records.
pub struct JsonExporter<'a> {
    database: &'a Database,
}

impl<'a> JsonExporter<'a> {
    /// Create a new JSON exporter.
    pub fn new(database: &'a Database) -> Self {
        Self { database }
    }

    /// Export a record to a JSON value.
    pub fn export_record(&self, record: &RecordEntry) -> Result<Value> {
        let mut context = ExportContext {
            database: self.database,
            in_flight: FxHashSet::default(),
        };

        let mut root = context.instance_value(record.struct_index, record.instance_index)?;
        if let Value::Object(map) = &mut root {
            map.insert("RecordId".to_owned(), Value::from(record.id.to_string()));
        }
        Ok(root)
    }

    /// Export a record to a pretty-printed JSON string.
    pub fn export_record_string(&self, record: &RecordEntry) -> Result<String> {
        let value = self.export_record(record)?;
        serde_json::to_string_pretty(&value).map_err(|e| Error::Export(e.to_string()))
    }
}

/// Walk state during export.
struct ExportContext<'a> {
    database: &'a Database,
    /// Instances currently on the walk stack; re-entry is a cycle.
    in_flight: FxHashSet<(i32, i32)>,
}

impl ExportContext<'_> {
    fn instance_value(&mut self, struct_index: i32, instance_index: i32) -> Result<Value> {
        let key = (struct_index, instance_index);
        if !self.in_flight.insert(key) {
            return Ok(circular_ref(struct_index, instance_index));
        }

        let mut reader = self.database.instance_reader(struct_index, instance_index)?;
        let value = self.struct_value(struct_index, &mut reader);

        self.in_flight.remove(&key);
        value
    }

    /// Serialise the property sequence of a struct from the cursor,
    /// ancestor chain first.
    fn struct_value(&mut self, struct_index: i32, reader: &mut SpanReader<'_>) -> Result<Value> {
        let db = self.database;
        let mut object = Map::new();

        for prop in db.struct_properties(struct_index as usize) {
            let name = db.property_name(prop).unwrap_or("Unknown").to_owned();
            let data_type = prop
                .get_data_type()
                .ok_or(Error::InvalidDataType(prop.data_type))?;
            let target_index = prop.target_index;

            let value = if prop.is_array() {
                self.array_value(data_type, target_index as i32, reader)?
            } else {
                self.scalar_value(data_type, target_index as i32, reader)?
            };
            object.insert(name, value);
        }

        Ok(Value::Object(object))
    }

    fn scalar_value(
        &mut self,
        data_type: DataType,
        target_index: i32,
        reader: &mut SpanReader<'_>,
    ) -> Result<Value> {
        Ok(match data_type {
            DataType::Boolean => Value::from(reader.read_bool()?),
            DataType::SByte => Value::from(reader.read_i8()?),
            DataType::Int16 => Value::from(reader.read_i16()?),
            DataType::Int32 => Value::from(reader.read_i32()?),
            DataType::Int64 => Value::from(reader.read_i64()?),
            DataType::Byte => Value::from(reader.read_u8()?),
            DataType::UInt16 => Value::from(reader.read_u16()?),
            DataType::UInt32 => Value::from(reader.read_u32()?),
            DataType::UInt64 => Value::from(reader.read_u64()?),
            DataType::Single => Value::from(reader.read_f32()? as f64),
            DataType::Double => Value::from(reader.read_f64()?),
            DataType::Guid => Value::from(reader.read_guid()?.to_string()),
            DataType::String | DataType::Locale | DataType::EnumChoice => {
                let id: StringId = reader.read_struct()?;
                Value::from(self.database.string(id).unwrap_or_default())
            }
            DataType::Class => self.struct_value(target_index, reader)?,
            DataType::StrongPointer => {
                let pointer: RawPointer = reader.read_struct()?;
                self.strong_pointer_value(pointer)?
            }
            DataType::WeakPointer => {
                let pointer: RawPointer = reader.read_struct()?;
                weak_pointer_value(pointer)
            }
            DataType::Reference => {
                let reference: RawReference = reader.read_struct()?;
                self.reference_value(reference)?
            }
        })
    }

    fn array_value(
        &mut self,
        data_type: DataType,
        target_index: i32,
        reader: &mut SpanReader<'_>,
    ) -> Result<Value> {
        let count = reader.read_i32()?;
        let first = reader.read_i32()?;
        let db = self.database;

        let values: Result<Vec<Value>> = match data_type {
            DataType::Boolean => collect(db.bool_range(first, count)?, Value::from),
            DataType::SByte => collect(db.int8_range(first, count)?, Value::from),
            DataType::Int16 => collect(db.int16_range(first, count)?, Value::from),
            DataType::Int32 => collect(db.int32_range(first, count)?, Value::from),
            DataType::Int64 => collect(db.int64_range(first, count)?, Value::from),
            DataType::Byte => collect(db.uint8_range(first, count)?, Value::from),
            DataType::UInt16 => collect(db.uint16_range(first, count)?, Value::from),
            DataType::UInt32 => collect(db.uint32_range(first, count)?, Value::from),
            DataType::UInt64 => collect(db.uint64_range(first, count)?, Value::from),
            DataType::Single => collect(db.float_range(first, count)?, |v| Value::from(v as f64)),
            DataType::Double => collect(db.double_range(first, count)?, Value::from),
            DataType::Guid => collect(db.guid_range(first, count)?, |g| Value::from(g.to_string())),
            DataType::String => collect(db.string_id_range(first, count)?, |id| {
                Value::from(db.string(id).unwrap_or_default())
            }),
            DataType::Locale => collect(db.locale_id_range(first, count)?, |id| {
                Value::from(db.string(id).unwrap_or_default())
            }),
            DataType::EnumChoice => collect(db.enum_value_range(first, count)?, |id| {
                Value::from(db.string(id).unwrap_or_default())
            }),
            DataType::Class => self.class_array_values(target_index, first, count),
            DataType::StrongPointer => {
                let pointers = db.strong_range(first, count)?;
                pointers
                    .into_iter()
                    .map(|p| self.strong_pointer_value(p))
                    .collect()
            }
            DataType::WeakPointer => {
                collect(db.weak_range(first, count)?, weak_pointer_value)
            }
            DataType::Reference => {
                let references = db.reference_range(first, count)?;
                references
                    .into_iter()
                    .map(|r| self.reference_value(r))
                    .collect()
            }
        };

        Ok(Value::Array(values?))
    }

    fn class_array_values(&mut self, struct_index: i32, first: i32, count: i32) -> Result<Vec<Value>> {
        if count <= 0 {
            return Ok(Vec::new());
        }
        // Widen before the bound so a corrupt header cannot overflow.
        let available = self.database.instance_count(struct_index as usize);
        if first < 0 || first as usize + count as usize > available {
            return Err(Error::bad_index(IndexKind::Instance, first as i64, available));
        }
        (first..first + count)
            .map(|i| self.instance_value(struct_index, i))
            .collect()
    }

    fn strong_pointer_value(&mut self, pointer: RawPointer) -> Result<Value> {
        if pointer.is_null() {
            return Ok(Value::Null);
        }
        self.instance_value(pointer.struct_index, pointer.instance_index)
    }

    fn reference_value(&mut self, reference: RawReference) -> Result<Value> {
        if reference.is_null() {
            return Ok(Value::Null);
        }

        let db = self.database;
        let guid = reference.record_id;
        let Some(info) = db.try_record_info(&guid) else {
            tracing::debug!(record_id = %guid, "export of reference to unknown record");
            return Ok(Value::Null);
        };

        if info.is_main {
            // External file: a stub, not the inlined target.
            let path = db.string(info.file_name_offset).unwrap_or_default();
            let mut stub = Map::new();
            stub.insert("$ref".to_owned(), Value::from(path));
            stub.insert("RecordId".to_owned(), Value::from(guid.to_string()));
            return Ok(Value::Object(stub));
        }

        self.instance_value(info.struct_index, info.instance_index)
    }
}

fn collect<T>(items: Vec<T>, f: impl Fn(T) -> Value) -> Result<Vec<Value>> {
    Ok(items.into_iter().map(f).collect())
}

fn circular_ref(struct_index: i32, instance_index: i32) -> Value {
    let mut stub = Map::new();
    stub.insert(
        "$circularRef".to_owned(),
        Value::from(format!("({}, {})", struct_index, instance_index)),
    );
    Value::Object(stub)
}

/// Weak pointers are non-owning; they serialise as a target tag rather than
/// inlining the target a second time.
fn weak_pointer_value(pointer: RawPointer) -> Value {
    if pointer.is_null() {
        return Value::Null;
    }
    let mut stub = Map::new();
    let struct_index = pointer.struct_index;
    let instance_index = pointer.instance_index;
    stub.insert(
        "$weakPointer".to_owned(),
        Value::from(format!("({}, {})", struct_index, instance_index)),
    );
    Value::Object(stub)
}
