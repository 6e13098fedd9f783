//! Database parsing and fingerprint tests.

mod common;

use common::build_fixture;
use veles_common::DcGuid;
use veles_datacore::{ArchiveBuilder, Database, DataType, Error};

#[test]
fn parse_recovers_schema_and_records() {
    let (data, ids) = build_fixture();
    let db = Database::parse(&data).unwrap();

    assert_eq!(db.struct_definitions().len(), 8);
    assert_eq!(db.enum_definitions().len(), 1);
    assert_eq!(db.struct_name(0), Some("Point"));
    assert_eq!(db.struct_name(2), Some("Derived"));
    assert_eq!(db.enum_name(0), Some("Kind"));
    assert_eq!(db.enum_options(&db.enum_definitions()[0]), ["Alpha", "Beta"]);

    let record = db.record(&ids.point).unwrap();
    assert_eq!(db.record_name(record), Some("P"));
    assert_eq!(db.record_file_name(record), Some("fixtures/point.xml"));
}

#[test]
fn open_and_parse_agree() {
    let (data, ids) = build_fixture();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fixture.dcb");
    std::fs::write(&path, &data).unwrap();

    let mapped = Database::open(&path).unwrap();
    let owned = Database::parse(&data).unwrap();

    assert_eq!(mapped.struct_fingerprint(), owned.struct_fingerprint());
    assert_eq!(mapped.enum_fingerprint(), owned.enum_fingerprint());
    assert_eq!(
        mapped.try_record_info(&ids.point),
        owned.try_record_info(&ids.point)
    );
}

#[test]
fn unknown_guid_is_unknown_record() {
    let (data, _ids) = build_fixture();
    let db = Database::parse(&data).unwrap();

    let missing: DcGuid = "fedcba98-7654-3210-fedc-ba9876543211".parse().unwrap();
    assert!(matches!(db.record(&missing), Err(Error::UnknownRecord(_))));
    assert!(db.try_record_info(&missing).is_none());
}

#[test]
fn record_by_index_is_bounds_checked() {
    let (data, _ids) = build_fixture();
    let db = Database::parse(&data).unwrap();

    assert!(db.record_by_index(0).is_ok());
    assert!(matches!(
        db.record_by_index(1000),
        Err(Error::BadIndex { .. })
    ));
}

#[test]
fn instance_reader_is_bounds_checked_and_positioned() {
    let (data, ids) = build_fixture();
    let db = Database::parse(&data).unwrap();

    let info = db.try_record_info(&ids.point).unwrap();
    let mut reader = db
        .instance_reader(info.struct_index, info.instance_index)
        .unwrap();
    assert_eq!(reader.read_i32().unwrap(), 3);
    assert_eq!(reader.read_i32().unwrap(), -4);
    // The cursor is bounded to one stride.
    assert!(reader.is_empty());

    assert!(matches!(
        db.instance_reader(0, 5),
        Err(Error::BadIndex { .. })
    ));
    assert!(matches!(
        db.instance_reader(77, 0),
        Err(Error::BadIndex { .. })
    ));
    assert!(matches!(
        db.instance_reader(-1, 0),
        Err(Error::BadIndex { .. })
    ));
}

#[test]
fn first_record_per_file_is_the_main_record() {
    let mut builder = ArchiveBuilder::new();
    let s = builder.add_struct("Thing", None);
    builder.add_property(s, "v", DataType::Int32);

    let a = builder.add_record("A", s, "shared/file.xml");
    let b = builder.add_record("B", s, "shared/file.xml");
    let c = builder.add_record("C", s, "other/file.xml");

    let (ga, gb, gc) = (
        builder.record_guid(a),
        builder.record_guid(b),
        builder.record_guid(c),
    );
    let db = Database::parse(&builder.build()).unwrap();

    assert!(db.is_main_record(&ga));
    assert!(!db.is_main_record(&gb));
    assert!(db.is_main_record(&gc));
    assert_eq!(db.main_records().count(), 2);

    assert!(db.try_record_info(&ga).unwrap().is_main);
    assert!(!db.try_record_info(&gb).unwrap().is_main);
}

#[test]
fn bad_magic_and_version_are_rejected() {
    let (mut data, _ids) = build_fixture();

    let mut scrambled = data.clone();
    scrambled[0] = b'X';
    assert!(matches!(
        Database::parse(&scrambled),
        Err(Error::Common(veles_common::Error::InvalidMagic { .. }))
    ));

    // Version field sits right after the magic.
    data[4] = 99;
    assert!(matches!(
        Database::parse(&data),
        Err(Error::UnsupportedVersion(99))
    ));
}

#[test]
fn truncated_archive_is_an_error() {
    let (data, _ids) = build_fixture();
    assert!(Database::parse(&data[..data.len() / 2]).is_err());
    assert!(Database::parse(&data[..10]).is_err());
}

#[test]
fn pool_ranges_are_bounds_checked() {
    let (data, _ids) = build_fixture();
    let db = Database::parse(&data).unwrap();

    // Empty ranges ignore their first index entirely.
    assert!(db.int32_range(9999, 0).unwrap().is_empty());
    assert!(db.int32_range(-5, 0).unwrap().is_empty());

    assert!(matches!(
        db.bool_range(0, 1_000_000),
        Err(Error::BadIndex { .. })
    ));
    assert!(matches!(db.bool_range(-1, 1), Err(Error::BadIndex { .. })));
}

/// Two schema-identical archives with different pool contents fingerprint
/// the same; reordering struct definitions does not.
#[test]
fn fingerprints_are_schema_pure() {
    fn schema(builder: &mut ArchiveBuilder) {
        let a = builder.add_struct("Alpha", None);
        builder.add_property(a, "x", DataType::Int32);
        builder.add_array_property(a, "xs", DataType::Int32);
        let b = builder.add_struct("Beta", Some(a));
        builder.add_property(b, "y", DataType::Single);
        builder.add_enum("Mode", &["On", "Off"]);
    }

    let mut one = ArchiveBuilder::new();
    schema(&mut one);
    one.add_struct("Gamma", None);

    let mut two = ArchiveBuilder::new();
    schema(&mut two);
    let s2 = two.add_struct("Gamma", None);
    two.add_property(s2, "pad", DataType::Int32);
    let r = two.add_record("G", s2, "g.xml");
    let inst = two.record_instance(r);
    two.set_i32(inst, "pad", 42);

    let db_one = Database::parse(&one.build()).unwrap();
    let db_two = Database::parse(&two.build()).unwrap();

    // Gamma differs (a property was added), so struct hashes differ, while
    // the untouched enum table hashes the same.
    assert_ne!(db_one.struct_fingerprint(), db_two.struct_fingerprint());
    assert_eq!(db_one.enum_fingerprint(), db_two.enum_fingerprint());

    // Identical schema, different pool/record data: equal fingerprints.
    let mut three = ArchiveBuilder::new();
    schema(&mut three);
    let s3 = three.add_struct("Gamma", None);
    three.add_property(s3, "pad", DataType::Int32);
    let r3 = three.add_record("OtherName", s3, "elsewhere.xml");
    let inst3 = three.record_instance(r3);
    three.set_i32(inst3, "pad", 7);

    let db_three = Database::parse(&three.build()).unwrap();
    assert_eq!(db_two.struct_fingerprint(), db_three.struct_fingerprint());
    assert_eq!(db_two.enum_fingerprint(), db_three.enum_fingerprint());

    // Reordering struct declarations moves the hash.
    let mut swapped = ArchiveBuilder::new();
    let b = swapped.add_struct("Beta", None);
    swapped.add_property(b, "y", DataType::Single);
    let a = swapped.add_struct("Alpha", None);
    swapped.add_property(a, "x", DataType::Int32);
    swapped.add_array_property(a, "xs", DataType::Int32);
    swapped.add_enum("Mode", &["On", "Off"]);

    let db_swapped = Database::parse(&swapped.build()).unwrap();
    assert_ne!(db_one.struct_fingerprint(), db_swapped.struct_fingerprint());

    // Enum option changes move the enum hash only.
    let mut renamed = ArchiveBuilder::new();
    schema(&mut renamed);
    let dbr = Database::parse(&renamed.build()).unwrap();
    let mut altered = ArchiveBuilder::new();
    let a = altered.add_struct("Alpha", None);
    altered.add_property(a, "x", DataType::Int32);
    altered.add_array_property(a, "xs", DataType::Int32);
    let b = altered.add_struct("Beta", Some(a));
    altered.add_property(b, "y", DataType::Single);
    altered.add_enum("Mode", &["On", "Standby"]);
    let dba = Database::parse(&altered.build()).unwrap();

    assert_eq!(dbr.struct_fingerprint(), dba.struct_fingerprint());
    assert_ne!(dbr.enum_fingerprint(), dba.enum_fingerprint());
}
