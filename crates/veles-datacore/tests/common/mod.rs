//! Shared test fixture: a small synthetic archive and its typed bindings.
//!
//! The record types and the dispatch table below are written exactly the
//! way `veles-typegen` emits them, so the runtime is exercised against the
//! same shapes generated code produces.

#![allow(dead_code)]

use std::sync::Arc;

use veles_common::{DcGuid, SpanReader};
use veles_datacore::{
    read_erased, ArchiveBuilder, DataType, EnumType, InstanceHandle, LazyRef, Readable, Result,
    Runtime, SharedInstance,
};

// Struct indices of the fixture schema.
pub const POINT: i32 = 0;
pub const BASE: i32 = 1;
pub const DERIVED: i32 = 2;
pub const NODE: i32 = 3;
pub const ITEM: i32 = 4;
pub const BAG: i32 = 5;
pub const HOLDER: i32 = 6;
pub const REF_HOLDER: i32 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Fallback for unrecognised options.
    Unknown,
    Alpha,
    Beta,
}

impl EnumType for Kind {
    const UNKNOWN: Self = Self::Unknown;

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "Alpha" => Some(Self::Alpha),
            "Beta" => Some(Self::Beta),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Readable for Point {
    const STRUCT_INDEX: i32 = POINT;

    fn read(_runtime: &Runtime, cursor: &mut SpanReader<'_>) -> Result<Self> {
        let x = cursor.read_i32()?;
        let y = cursor.read_i32()?;
        Ok(Self { x, y })
    }
}

#[derive(Debug, Clone)]
pub struct Base {
    pub a: u8,
}

impl Readable for Base {
    const STRUCT_INDEX: i32 = BASE;

    fn read(_runtime: &Runtime, cursor: &mut SpanReader<'_>) -> Result<Self> {
        let a = cursor.read_u8()?;
        Ok(Self { a })
    }
}

#[derive(Debug, Clone)]
pub struct Derived {
    pub base: Base,
    pub b: String,
}

impl Readable for Derived {
    const STRUCT_INDEX: i32 = DERIVED;

    fn read(runtime: &Runtime, cursor: &mut SpanReader<'_>) -> Result<Self> {
        let base = Base::read(runtime, cursor)?;
        let b = runtime.read_string(cursor)?;
        Ok(Self { base, b })
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub next: Option<LazyRef<Node>>,
}

impl Readable for Node {
    const STRUCT_INDEX: i32 = NODE;

    fn read(runtime: &Runtime, cursor: &mut SpanReader<'_>) -> Result<Self> {
        let name = runtime.read_string(cursor)?;
        let next = runtime.read_reference::<Node>(cursor)?;
        Ok(Self { name, next })
    }
}

#[derive(Debug, Clone)]
pub struct Item {
    pub value: i32,
}

impl Readable for Item {
    const STRUCT_INDEX: i32 = ITEM;

    fn read(_runtime: &Runtime, cursor: &mut SpanReader<'_>) -> Result<Self> {
        let value = cursor.read_i32()?;
        Ok(Self { value })
    }
}

#[derive(Debug, Clone)]
pub struct Bag {
    pub items: Vec<Option<Arc<Item>>>,
}

impl Readable for Bag {
    const STRUCT_INDEX: i32 = BAG;

    fn read(runtime: &Runtime, cursor: &mut SpanReader<'_>) -> Result<Self> {
        let items = runtime.read_class_array::<Item>(cursor)?;
        Ok(Self { items })
    }
}

#[derive(Debug, Clone)]
pub struct Holder {
    pub kind: Kind,
    pub kinds: Vec<Kind>,
    pub tags: Vec<String>,
    pub flags: Vec<bool>,
    pub weights: Vec<f32>,
    pub counts: Vec<u64>,
    pub origin: DcGuid,
    pub strong: Option<LazyRef<Point>>,
    pub weak: Option<LazyRef<Point>>,
}

impl Readable for Holder {
    const STRUCT_INDEX: i32 = HOLDER;

    fn read(runtime: &Runtime, cursor: &mut SpanReader<'_>) -> Result<Self> {
        let kind = runtime.read_enum::<Kind>(cursor)?;
        let kinds = runtime.read_enum_array::<Kind>(cursor)?;
        let tags = runtime.read_string_array(cursor)?;
        let flags = runtime.read_bool_array(cursor)?;
        let weights = runtime.read_float_array(cursor)?;
        let counts = runtime.read_uint64_array(cursor)?;
        let origin = cursor.read_guid()?;
        let strong = runtime.read_strong_pointer::<Point>(cursor)?;
        let weak = runtime.read_weak_pointer::<Point>(cursor)?;
        Ok(Self {
            kind,
            kinds,
            tags,
            flags,
            weights,
            counts,
            origin,
            strong,
            weak,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RefHolder {
    pub r: Option<LazyRef<Base>>,
}

impl Readable for RefHolder {
    const STRUCT_INDEX: i32 = REF_HOLDER;

    fn read(runtime: &Runtime, cursor: &mut SpanReader<'_>) -> Result<Self> {
        let r = runtime.read_reference::<Base>(cursor)?;
        Ok(Self { r })
    }
}

/// Dispatch table over the fixture schema, in the generated shape.
pub fn dispatch(
    runtime: &Runtime,
    struct_index: i32,
    instance_index: i32,
) -> Option<Result<Option<SharedInstance>>> {
    match struct_index {
        POINT => Some(read_erased::<Point>(runtime, struct_index, instance_index)),
        BASE => Some(read_erased::<Base>(runtime, struct_index, instance_index)),
        DERIVED => Some(read_erased::<Derived>(runtime, struct_index, instance_index)),
        NODE => Some(read_erased::<Node>(runtime, struct_index, instance_index)),
        ITEM => Some(read_erased::<Item>(runtime, struct_index, instance_index)),
        BAG => Some(read_erased::<Bag>(runtime, struct_index, instance_index)),
        HOLDER => Some(read_erased::<Holder>(runtime, struct_index, instance_index)),
        REF_HOLDER => Some(read_erased::<RefHolder>(runtime, struct_index, instance_index)),
        _ => None,
    }
}

/// GUIDs of the records the tests resolve.
pub struct FixtureIds {
    pub point: DcGuid,
    pub derived: DcGuid,
    pub n0: DcGuid,
    pub n1: DcGuid,
    pub bag: DcGuid,
    pub empty_bag: DcGuid,
    pub corrupt_bag: DcGuid,
    pub holder: DcGuid,
    pub holder_empty: DcGuid,
    pub ref_to_derived: DcGuid,
    pub ref_to_nowhere: DcGuid,
    pub missing: DcGuid,
}

/// Build the fixture archive and return its bytes with the record GUIDs.
pub fn build_fixture() -> (Vec<u8>, FixtureIds) {
    let mut builder = ArchiveBuilder::new();

    // Schema
    let point = builder.add_struct("Point", None);
    builder.add_property(point, "x", DataType::Int32);
    builder.add_property(point, "y", DataType::Int32);

    let base = builder.add_struct("Base", None);
    builder.add_property(base, "a", DataType::Byte);

    let derived = builder.add_struct("Derived", Some(base));
    builder.add_property(derived, "b", DataType::String);

    let node = builder.add_struct("Node", None);
    builder.add_property(node, "name", DataType::String);
    builder.add_typed_property(node, "next", DataType::Reference, node);

    let item = builder.add_struct("Item", None);
    builder.add_property(item, "value", DataType::Int32);

    let bag = builder.add_struct("Bag", None);
    builder.add_typed_array_property(bag, "items", DataType::Class, item);

    let kind = builder.add_enum("Kind", &["Alpha", "Beta"]);

    let holder = builder.add_struct("Holder", None);
    builder.add_enum_property(holder, "kind", kind);
    builder.add_enum_array_property(holder, "kinds", kind);
    builder.add_array_property(holder, "tags", DataType::String);
    builder.add_array_property(holder, "flags", DataType::Boolean);
    builder.add_array_property(holder, "weights", DataType::Single);
    builder.add_array_property(holder, "counts", DataType::UInt64);
    builder.add_property(holder, "origin", DataType::Guid);
    builder.add_typed_property(holder, "strong", DataType::StrongPointer, point);
    builder.add_typed_property(holder, "weak", DataType::WeakPointer, point);

    let ref_holder = builder.add_struct("RefHolder", None);
    builder.add_typed_property(ref_holder, "r", DataType::Reference, base);

    // Data
    let point_record = builder.add_record("P", point, "fixtures/point.xml");
    let point_inst = builder.record_instance(point_record);
    builder.set_i32(point_inst, "x", 3);
    builder.set_i32(point_inst, "y", -4);

    let derived_record = builder.add_record("D", derived, "fixtures/derived.xml");
    let derived_inst = builder.record_instance(derived_record);
    builder.set_u8(derived_inst, "a", 7);
    builder.set_string(derived_inst, "b", "hello");

    let n0 = builder.add_record("N0", node, "fixtures/n0.xml");
    let n1 = builder.add_record("N1", node, "fixtures/n1.xml");
    let n0_inst = builder.record_instance(n0);
    let n1_inst = builder.record_instance(n1);
    builder.set_string(n0_inst, "name", "zero");
    builder.set_reference(n0_inst, "next", builder.record_guid(n1));
    builder.set_string(n1_inst, "name", "one");
    builder.set_reference(n1_inst, "next", builder.record_guid(n0));

    let items: Vec<_> = [10, 20, 30]
        .iter()
        .map(|&value| {
            let inst = builder.add_instance(item);
            builder.set_i32(inst, "value", value);
            inst
        })
        .collect();

    let bag_record = builder.add_record("B", bag, "fixtures/bag.xml");
    let bag_inst = builder.record_instance(bag_record);
    builder.set_class_array(bag_inst, "items", &items);

    let empty_bag_record = builder.add_record("BE", bag, "fixtures/bag_empty.xml");
    let empty_bag_inst = builder.record_instance(empty_bag_record);
    builder.set_class_array(empty_bag_inst, "items", &[]);

    // A deliberately corrupt class-array header: first/count land far past
    // the item region, with first + count overflowing i32.
    let corrupt_bag_record = builder.add_record("BX", bag, "fixtures/bag_corrupt.xml");
    let corrupt_bag_inst = builder.record_instance(corrupt_bag_record);
    let bogus: Vec<InstanceHandle> = (0..3)
        .map(|i| InstanceHandle {
            struct_index: item.0,
            instance_index: (i32::MAX - 2 + i) as u32,
        })
        .collect();
    builder.set_class_array(corrupt_bag_inst, "items", &bogus);

    let holder_record = builder.add_record("H", holder, "fixtures/holder.xml");
    let holder_inst = builder.record_instance(holder_record);
    builder.set_enum(holder_inst, "kind", "Gamma"); // not an option of Kind
    builder.set_enum_array(holder_inst, "kinds", &["Beta", "Alpha", "Beta"]);
    builder.set_string_array(holder_inst, "tags", &["alpha", "beta"]);
    builder.set_bool_array(holder_inst, "flags", &[true, false, true]);
    builder.set_float_array(holder_inst, "weights", &[0.5, 1.5]);
    builder.set_u64_array(holder_inst, "counts", &[u64::MAX, 1]);
    let origin: DcGuid = "12345678-abcd-ef01-2345-6789abcdef01".parse().unwrap();
    builder.set_guid(holder_inst, "origin", origin);
    builder.set_strong_pointer(holder_inst, "strong", Some(point_inst));
    builder.set_weak_pointer(holder_inst, "weak", None);

    let holder_empty_record = builder.add_record("HZ", holder, "fixtures/holder_empty.xml");
    let holder_empty_inst = builder.record_instance(holder_empty_record);
    builder.set_enum(holder_empty_inst, "kind", "");

    let ref_record = builder.add_record("R", ref_holder, "fixtures/ref.xml");
    let ref_inst = builder.record_instance(ref_record);
    builder.set_reference(ref_inst, "r", builder.record_guid(derived_record));

    let missing: DcGuid = "fedcba98-7654-3210-fedc-ba9876543210".parse().unwrap();
    let dangling_record = builder.add_record("RN", ref_holder, "fixtures/ref_nowhere.xml");
    let dangling_inst = builder.record_instance(dangling_record);
    builder.set_reference(dangling_inst, "r", missing);

    let ids = FixtureIds {
        point: builder.record_guid(point_record),
        derived: builder.record_guid(derived_record),
        n0: builder.record_guid(n0),
        n1: builder.record_guid(n1),
        bag: builder.record_guid(bag_record),
        empty_bag: builder.record_guid(empty_bag_record),
        corrupt_bag: builder.record_guid(corrupt_bag_record),
        holder: builder.record_guid(holder_record),
        holder_empty: builder.record_guid(holder_empty_record),
        ref_to_derived: builder.record_guid(ref_record),
        ref_to_nowhere: builder.record_guid(dangling_record),
        missing,
    };

    (builder.build(), ids)
}
