//! Generator output tests over synthetic schemas.

use veles_datacore::{ArchiveBuilder, Database, DataType};
use veles_typegen::{escape_ident, Generator, GeneratorConfig};

fn build_schema() -> ArchiveBuilder {
    let mut builder = ArchiveBuilder::new();

    let base = builder.add_struct("WeaponBase", None);
    builder.add_property(base, "mass", DataType::Single);

    let weapon = builder.add_struct("Weapon", Some(base));
    builder.add_property(weapon, "name", DataType::String);
    builder.add_property(weapon, "damage", DataType::Single);
    builder.add_property(weapon, "type", DataType::Int32); // keyword field
    builder.add_typed_property(weapon, "ammo", DataType::Reference, base);
    builder.add_array_property(weapon, "tags", DataType::String);

    let mode = builder.add_enum("FireMode", &["Single", "Burst", "Auto"]);
    builder.add_enum_property(weapon, "mode", mode);
    builder.add_enum_array_property(weapon, "modes", mode);

    let mag = builder.add_struct("Magazine", None);
    builder.add_property(mag, "capacity", DataType::Int32);
    builder.add_typed_array_property(weapon, "magazines", DataType::Class, mag);
    builder.add_typed_property(weapon, "chamber", DataType::Class, mag);
    builder.add_typed_property(weapon, "rack", DataType::StrongPointer, mag);
    builder.add_typed_property(weapon, "sibling", DataType::WeakPointer, weapon);

    builder
}

fn render(builder: &mut ArchiveBuilder) -> veles_typegen::GeneratedSource {
    let db = Database::parse(&builder.build()).unwrap();
    let generator = Generator::new(&db);
    generator.render(&GeneratorConfig::new("unused")).unwrap()
}

#[test]
fn generation_is_deterministic() {
    let first = render(&mut build_schema());
    let second = render(&mut build_schema());
    assert_eq!(first, second);
}

#[test]
fn pool_contents_do_not_affect_output() {
    let mut plain = build_schema();

    let mut populated = build_schema();
    let weapon_struct = veles_datacore::StructHandle(1);
    let record = populated.add_record("Gun", weapon_struct, "weapons/gun.xml");
    let inst = populated.record_instance(record);
    populated.set_string(inst, "name", "Gun");
    populated.set_float(inst, "damage", 12.0);
    populated.set_string_array(inst, "tags", &["kinetic", "ballistic"]);

    assert_eq!(render(&mut plain), render(&mut populated));
}

#[test]
fn records_embed_parent_and_follow_declaration_order() {
    let source = render(&mut build_schema());

    assert!(source.records.contains("pub struct WeaponBase {\n    pub mass: f32,\n}"));
    assert!(source
        .records
        .contains("pub struct Weapon {\n    pub base: WeaponBase,\n    pub name: String,"));

    // The deserialiser reads the ancestor chain first.
    let read_pos = source
        .records
        .find("let base = WeaponBase::read(runtime, cursor)?;")
        .unwrap();
    let name_pos = source
        .records
        .find("let name = runtime.read_string(cursor)?;")
        .unwrap();
    assert!(read_pos < name_pos);
}

#[test]
fn field_types_match_their_data_types() {
    let source = render(&mut build_schema());

    assert!(source.records.contains("pub ammo: Option<LazyRef<WeaponBase>>,"));
    assert!(source.records.contains("pub tags: Vec<String>,"));
    assert!(source.records.contains("pub mode: FireMode,"));
    assert!(source.records.contains("pub modes: Vec<FireMode>,"));
    assert!(source.records.contains("pub magazines: Vec<Option<Arc<Magazine>>>,"));
    assert!(source.records.contains("pub chamber: Magazine,"));
    assert!(source.records.contains("pub rack: Option<LazyRef<Magazine>>,"));
    assert!(source.records.contains("pub sibling: Option<LazyRef<Weapon>>,"));

    assert!(source
        .records
        .contains("let chamber = Magazine::read(runtime, cursor)?;"));
    assert!(source
        .records
        .contains("let magazines = runtime.read_class_array::<Magazine>(cursor)?;"));
    assert!(source
        .records
        .contains("let mode = runtime.read_enum::<FireMode>(cursor)?;"));
}

#[test]
fn keyword_fields_are_escaped() {
    let source = render(&mut build_schema());
    assert!(source.records.contains("pub type_: i32,"));
    assert!(source.records.contains("let type_ = cursor.read_i32()?;"));
}

#[test]
fn enums_carry_an_unknown_fallback() {
    let source = render(&mut build_schema());

    assert!(source.enums.contains("pub enum FireMode {"));
    assert!(source.enums.contains("    Unknown,\n    Single,\n    Burst,\n    Auto,"));
    assert!(source.enums.contains("const UNKNOWN: Self = Self::Unknown;"));
    assert!(source.enums.contains("\"Burst\" => Some(Self::Burst),"));
}

#[test]
fn dispatch_covers_every_struct_index() {
    let mut builder = build_schema();
    let db = Database::parse(&builder.build()).unwrap();
    let generator = Generator::new(&db);
    let source = generator.render(&GeneratorConfig::new("unused")).unwrap();

    for (index, _) in db.struct_definitions().iter().enumerate() {
        let arm = format!("            {} => Some(read_erased::<", index);
        assert!(source.dispatch.contains(&arm), "missing arm for {}", index);
    }
    assert!(source.dispatch.contains("_ => None,"));
    assert!(source.dispatch.contains("pub struct Dispatcher;"));
}

#[test]
fn schema_constants_mirror_the_database() {
    let mut builder = build_schema();
    let db = Database::parse(&builder.build()).unwrap();
    let generator = Generator::new(&db);
    let source = generator.render(&GeneratorConfig::new("unused")).unwrap();

    assert!(source.schema.contains(&format!(
        "pub const STRUCT_COUNT: usize = {};",
        db.struct_definitions().len()
    )));
    assert!(source.schema.contains(&format!(
        "pub const ENUM_COUNT: usize = {};",
        db.enum_definitions().len()
    )));
    assert!(source.schema.contains(&format!(
        "pub const STRUCT_FINGERPRINT: u32 = {:#010x};",
        db.struct_fingerprint()
    )));
    assert!(source.schema.contains(&format!(
        "pub const ENUM_FINGERPRINT: u32 = {:#010x};",
        db.enum_fingerprint()
    )));
}

#[test]
fn dispatcher_name_comes_from_config() {
    let mut builder = build_schema();
    let db = Database::parse(&builder.build()).unwrap();
    let generator = Generator::new(&db);

    let mut config = GeneratorConfig::new("unused");
    config.dispatcher_name = "GameDispatch".to_owned();
    let source = generator.render(&config).unwrap();

    assert!(source.dispatch.contains("pub struct GameDispatch;"));
    assert!(source.dispatch.contains("impl GameDispatch {"));
    assert!(source.module.contains("pub use dispatch::GameDispatch;"));
}

#[test]
fn generate_writes_a_module_tree() {
    let mut builder = build_schema();
    let db = Database::parse(&builder.build()).unwrap();
    let generator = Generator::new(&db);

    let dir = tempfile::tempdir().unwrap();
    let config = GeneratorConfig::new(dir.path());
    let written = generator.generate(&config).unwrap();

    assert_eq!(written.len(), 5);
    for name in ["mod.rs", "enums.rs", "records.rs", "dispatch.rs", "schema.rs"] {
        assert!(dir.path().join(name).is_file(), "missing {}", name);
    }
}

#[test]
fn generate_with_manifest_writes_a_package() {
    let mut builder = build_schema();
    let db = Database::parse(&builder.build()).unwrap();
    let generator = Generator::new(&db);

    let dir = tempfile::tempdir().unwrap();
    let mut config = GeneratorConfig::new(dir.path());
    config.emit_manifest = true;
    config.module_name = "game_bindings".to_owned();
    generator.generate(&config).unwrap();

    assert!(dir.path().join("Cargo.toml").is_file());
    assert!(dir.path().join("src/lib.rs").is_file());
    assert!(dir.path().join("src/records.rs").is_file());

    let manifest = std::fs::read_to_string(dir.path().join("Cargo.toml")).unwrap();
    assert!(manifest.contains("name = \"game_bindings\""));
    assert!(manifest.contains("veles-datacore"));
}

#[test]
fn schema_names_escape_to_rust_identifiers() {
    assert_eq!(escape_ident("EntityClassDefinition.Weapon"), "EntityClassDefinition_Weapon");
    assert_eq!(escape_ident("match"), "match_");

    let mut builder = ArchiveBuilder::new();
    let s = builder.add_struct("Entity.Part", None);
    builder.add_property(s, "loop", DataType::Boolean);

    let db = Database::parse(&builder.build()).unwrap();
    let source = Generator::new(&db)
        .render(&GeneratorConfig::new("unused"))
        .unwrap();

    assert!(source.records.contains("pub struct Entity_Part {"));
    assert!(source.records.contains("pub loop_: bool,"));
}
