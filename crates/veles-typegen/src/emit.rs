//! Source rendering.
//!
//! Every renderer walks the schema tables in declaration order and appends
//! to a string, so the same database bytes always produce byte-identical
//! output.

use std::fmt::Write;

use veles_datacore::layout::PropertyDefinition;
use veles_datacore::{Conversion, Database, DataType};

use crate::names::escape_ident;
use crate::{Error, Result};

const GENERATED_HEADER: &str = "// @generated by veles-typegen - do not edit.\n";

/// Render the enum bindings file.
pub(crate) fn render_enums(db: &Database) -> Result<String> {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push_str("\nuse veles_datacore::EnumType;\n");

    for (index, def) in db.enum_definitions().iter().enumerate() {
        let name = escape_ident(db.enum_name(index).unwrap_or("Unknown"));
        let options = db.enum_options(def);

        let _ = writeln!(out);
        let _ = writeln!(out, "#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]");
        let _ = writeln!(out, "pub enum {} {{", name);
        let _ = writeln!(out, "    /// Fallback for unrecognised options.");
        let _ = writeln!(out, "    Unknown,");
        for option in &options {
            let _ = writeln!(out, "    {},", escape_ident(option));
        }
        let _ = writeln!(out, "}}");

        let _ = writeln!(out);
        let _ = writeln!(out, "impl EnumType for {} {{", name);
        let _ = writeln!(out, "    const UNKNOWN: Self = Self::Unknown;");
        let _ = writeln!(out);
        let _ = writeln!(out, "    fn from_name(name: &str) -> Option<Self> {{");
        let _ = writeln!(out, "        match name {{");
        for option in &options {
            let _ = writeln!(
                out,
                "            {:?} => Some(Self::{}),",
                option,
                escape_ident(option)
            );
        }
        let _ = writeln!(out, "            _ => None,");
        let _ = writeln!(out, "        }}");
        let _ = writeln!(out, "    }}");
        let _ = writeln!(out, "}}");
    }

    Ok(out)
}

/// Render the record bindings file: one value type and one deserialiser per
/// struct definition.
pub(crate) fn render_records(db: &Database) -> Result<String> {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push_str("\nuse std::sync::Arc;\n");
    out.push_str("\nuse veles_common::{DcGuid, SpanReader};\n");
    out.push_str("use veles_datacore::{LazyRef, Readable, Result, Runtime};\n");
    out.push_str("\nuse super::enums::*;\n");

    for (index, def) in db.struct_definitions().iter().enumerate() {
        let name = escape_ident(db.struct_name(index).unwrap_or("Unknown"));
        let parent_index = def.parent_index;
        let parent = (parent_index >= 0)
            .then(|| escape_ident(db.struct_name(parent_index as usize).unwrap_or("Unknown")));

        let start = def.first_property_index as usize;
        let end = start + def.property_count as usize;
        let own: Vec<(String, &PropertyDefinition)> = db.property_definitions()[start..end]
            .iter()
            .map(|p| (escape_ident(db.property_name(p).unwrap_or("Unknown")), p))
            .collect();

        // Value type; the ancestor's properties lead the layout, so a
        // derived struct embeds its parent as the first field.
        let _ = writeln!(out);
        let _ = writeln!(out, "#[derive(Debug, Clone)]");
        let _ = writeln!(out, "pub struct {} {{", name);
        if let Some(parent) = &parent {
            let _ = writeln!(out, "    pub base: {},", parent);
        }
        for (field, prop) in &own {
            let _ = writeln!(out, "    pub {}: {},", field, field_type(db, prop)?);
        }
        let _ = writeln!(out, "}}");

        // Deserialiser
        let _ = writeln!(out);
        let _ = writeln!(out, "impl Readable for {} {{", name);
        let _ = writeln!(out, "    const STRUCT_INDEX: i32 = {};", index);
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "    fn read(runtime: &Runtime, cursor: &mut SpanReader<'_>) -> Result<Self> {{"
        );
        if let Some(parent) = &parent {
            let _ = writeln!(out, "        let base = {}::read(runtime, cursor)?;", parent);
        }
        for (field, prop) in &own {
            let _ = writeln!(out, "        let {} = {};", field, read_expr(db, prop)?);
        }
        let mut fields: Vec<&str> = Vec::new();
        if parent.is_some() {
            fields.push("base");
        }
        fields.extend(own.iter().map(|(field, _)| field.as_str()));
        if fields.is_empty() {
            let _ = writeln!(out, "        Ok(Self {{}})");
        } else {
            let _ = writeln!(out, "        Ok(Self {{ {} }})", fields.join(", "));
        }
        let _ = writeln!(out, "    }}");
        let _ = writeln!(out, "}}");
    }

    Ok(out)
}

/// Render the dispatch table: a flat match from struct index to a
/// concrete-typed cache read.
pub(crate) fn render_dispatch(db: &Database, dispatcher_name: &str) -> Result<String> {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);
    out.push_str("\nuse veles_datacore::{read_erased, Result, Runtime, SharedInstance};\n");
    out.push_str("\nuse super::records::*;\n");
    out.push_str("use super::schema;\n");

    let _ = writeln!(out);
    let _ = writeln!(out, "pub struct {};", dispatcher_name);
    let _ = writeln!(out);
    let _ = writeln!(out, "impl {} {{", dispatcher_name);
    let _ = writeln!(
        out,
        "    /// Dispatch a struct index to its concrete-typed cache read."
    );
    let _ = writeln!(
        out,
        "    pub fn dispatch(\n        runtime: &Runtime,\n        struct_index: i32,\n        instance_index: i32,\n    ) -> Option<Result<Option<SharedInstance>>> {{"
    );
    let _ = writeln!(out, "        match struct_index {{");
    for (index, _) in db.struct_definitions().iter().enumerate() {
        let name = escape_ident(db.struct_name(index).unwrap_or("Unknown"));
        let _ = writeln!(
            out,
            "            {} => Some(read_erased::<{}>(runtime, struct_index, instance_index)),",
            index, name
        );
    }
    let _ = writeln!(out, "            _ => None,");
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "    /// Check the generated constants against a loaded archive."
    );
    let _ = writeln!(out, "    pub fn validate(runtime: &Runtime) -> Result<()> {{");
    let _ = writeln!(out, "        runtime.validate_schema(");
    let _ = writeln!(out, "            schema::STRUCT_COUNT,");
    let _ = writeln!(out, "            schema::ENUM_COUNT,");
    let _ = writeln!(out, "            schema::STRUCT_FINGERPRINT,");
    let _ = writeln!(out, "            schema::ENUM_FINGERPRINT,");
    let _ = writeln!(out, "        )");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");

    Ok(out)
}

/// Render the schema constants coupling generated code to the archive.
pub(crate) fn render_schema(db: &Database) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);

    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "/// Total struct definitions in the source archive."
    );
    let _ = writeln!(
        out,
        "pub const STRUCT_COUNT: usize = {};",
        db.struct_definitions().len()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "/// Total enum definitions in the source archive.");
    let _ = writeln!(
        out,
        "pub const ENUM_COUNT: usize = {};",
        db.enum_definitions().len()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "/// Fingerprint of the struct table.");
    let _ = writeln!(
        out,
        "pub const STRUCT_FINGERPRINT: u32 = {:#010x};",
        db.struct_fingerprint()
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "/// Fingerprint of the enum table.");
    let _ = writeln!(
        out,
        "pub const ENUM_FINGERPRINT: u32 = {:#010x};",
        db.enum_fingerprint()
    );

    out
}

/// Render the module root tying the generated files together.
pub(crate) fn render_module(dispatcher_name: &str) -> String {
    let mut out = String::new();
    out.push_str(GENERATED_HEADER);

    let _ = writeln!(out, "//! Generated DataCore bindings.");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "#![allow(non_snake_case, non_camel_case_types, unused_imports, unused_variables)]"
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "pub mod dispatch;");
    let _ = writeln!(out, "pub mod enums;");
    let _ = writeln!(out, "pub mod records;");
    let _ = writeln!(out, "pub mod schema;");
    let _ = writeln!(out);
    let _ = writeln!(out, "pub use dispatch::{};", dispatcher_name);

    out
}

/// Render the optional Cargo manifest.
pub(crate) fn render_manifest(module_name: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[package]");
    let _ = writeln!(out, "name = {:?}", module_name);
    let _ = writeln!(out, "version = \"0.1.0\"");
    let _ = writeln!(out, "edition = \"2021\"");
    let _ = writeln!(out);
    let _ = writeln!(out, "[dependencies]");
    let _ = writeln!(out, "veles-common = \"0.3\"");
    let _ = writeln!(out, "veles-datacore = \"0.3\"");
    out
}

/// Rust type of a generated field.
fn field_type(db: &Database, prop: &PropertyDefinition) -> Result<String> {
    let data_type = data_type_of(db, prop)?;
    let scalar = match data_type {
        DataType::Boolean => "bool".to_owned(),
        DataType::SByte => "i8".to_owned(),
        DataType::Int16 => "i16".to_owned(),
        DataType::Int32 => "i32".to_owned(),
        DataType::Int64 => "i64".to_owned(),
        DataType::Byte => "u8".to_owned(),
        DataType::UInt16 => "u16".to_owned(),
        DataType::UInt32 => "u32".to_owned(),
        DataType::UInt64 => "u64".to_owned(),
        DataType::Single => "f32".to_owned(),
        DataType::Double => "f64".to_owned(),
        DataType::Guid => "DcGuid".to_owned(),
        DataType::String | DataType::Locale => "String".to_owned(),
        DataType::EnumChoice => enum_target(db, prop),
        DataType::Class => struct_target(db, prop),
        DataType::Reference | DataType::StrongPointer | DataType::WeakPointer => {
            format!("Option<LazyRef<{}>>", struct_target(db, prop))
        }
    };

    Ok(match conversion_of(prop)? {
        Conversion::Scalar => scalar,
        Conversion::Array => match data_type {
            // Class arrays hold cached instances; an element is None only
            // under an in-flight cycle.
            DataType::Class => format!("Vec<Option<Arc<{}>>>", struct_target(db, prop)),
            _ => format!("Vec<{}>", scalar),
        },
    })
}

/// Read expression of a generated field.
fn read_expr(db: &Database, prop: &PropertyDefinition) -> Result<String> {
    let data_type = data_type_of(db, prop)?;

    Ok(match conversion_of(prop)? {
        Conversion::Scalar => match data_type {
            DataType::Boolean => "cursor.read_bool()?".to_owned(),
            DataType::SByte => "cursor.read_i8()?".to_owned(),
            DataType::Int16 => "cursor.read_i16()?".to_owned(),
            DataType::Int32 => "cursor.read_i32()?".to_owned(),
            DataType::Int64 => "cursor.read_i64()?".to_owned(),
            DataType::Byte => "cursor.read_u8()?".to_owned(),
            DataType::UInt16 => "cursor.read_u16()?".to_owned(),
            DataType::UInt32 => "cursor.read_u32()?".to_owned(),
            DataType::UInt64 => "cursor.read_u64()?".to_owned(),
            DataType::Single => "cursor.read_f32()?".to_owned(),
            DataType::Double => "cursor.read_f64()?".to_owned(),
            DataType::Guid => "cursor.read_guid()?".to_owned(),
            DataType::String => "runtime.read_string(cursor)?".to_owned(),
            DataType::Locale => "runtime.read_locale(cursor)?".to_owned(),
            DataType::EnumChoice => {
                format!("runtime.read_enum::<{}>(cursor)?", enum_target(db, prop))
            }
            DataType::Class => format!("{}::read(runtime, cursor)?", struct_target(db, prop)),
            DataType::Reference => format!(
                "runtime.read_reference::<{}>(cursor)?",
                struct_target(db, prop)
            ),
            DataType::StrongPointer => format!(
                "runtime.read_strong_pointer::<{}>(cursor)?",
                struct_target(db, prop)
            ),
            DataType::WeakPointer => format!(
                "runtime.read_weak_pointer::<{}>(cursor)?",
                struct_target(db, prop)
            ),
        },
        Conversion::Array => match data_type {
            DataType::Boolean => "runtime.read_bool_array(cursor)?".to_owned(),
            DataType::SByte => "runtime.read_int8_array(cursor)?".to_owned(),
            DataType::Int16 => "runtime.read_int16_array(cursor)?".to_owned(),
            DataType::Int32 => "runtime.read_int32_array(cursor)?".to_owned(),
            DataType::Int64 => "runtime.read_int64_array(cursor)?".to_owned(),
            DataType::Byte => "runtime.read_uint8_array(cursor)?".to_owned(),
            DataType::UInt16 => "runtime.read_uint16_array(cursor)?".to_owned(),
            DataType::UInt32 => "runtime.read_uint32_array(cursor)?".to_owned(),
            DataType::UInt64 => "runtime.read_uint64_array(cursor)?".to_owned(),
            DataType::Single => "runtime.read_float_array(cursor)?".to_owned(),
            DataType::Double => "runtime.read_double_array(cursor)?".to_owned(),
            DataType::Guid => "runtime.read_guid_array(cursor)?".to_owned(),
            DataType::String => "runtime.read_string_array(cursor)?".to_owned(),
            DataType::Locale => "runtime.read_locale_array(cursor)?".to_owned(),
            DataType::EnumChoice => {
                format!("runtime.read_enum_array::<{}>(cursor)?", enum_target(db, prop))
            }
            DataType::Class => format!(
                "runtime.read_class_array::<{}>(cursor)?",
                struct_target(db, prop)
            ),
            DataType::Reference => format!(
                "runtime.read_reference_array::<{}>(cursor)?",
                struct_target(db, prop)
            ),
            DataType::StrongPointer => format!(
                "runtime.read_strong_pointer_array::<{}>(cursor)?",
                struct_target(db, prop)
            ),
            DataType::WeakPointer => format!(
                "runtime.read_weak_pointer_array::<{}>(cursor)?",
                struct_target(db, prop)
            ),
        },
    })
}

fn data_type_of(db: &Database, prop: &PropertyDefinition) -> Result<DataType> {
    prop.get_data_type().ok_or_else(|| Error::UnknownDataType {
        property: db.property_name(prop).unwrap_or("Unknown").to_owned(),
        tag: prop.data_type,
    })
}

fn conversion_of(prop: &PropertyDefinition) -> Result<Conversion> {
    prop.get_conversion().ok_or_else(|| Error::UnknownConversion {
        tag: prop.conversion,
    })
}

fn struct_target(db: &Database, prop: &PropertyDefinition) -> String {
    escape_ident(db.struct_name(prop.target_index as usize).unwrap_or("Unknown"))
}

fn enum_target(db: &Database, prop: &PropertyDefinition) -> String {
    escape_ident(db.enum_name(prop.target_index as usize).unwrap_or("Unknown"))
}
