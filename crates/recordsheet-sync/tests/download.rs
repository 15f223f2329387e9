use std::sync::Arc;

use recordsheet_common::{InstanceId, Table, Value};
use recordsheet_schema::{KindRegistry, RegistryDoc};
use recordsheet_sync::{InstanceStore, MemoryStore, SyncMode, SyncState, download};

fn registry() -> Arc<KindRegistry> {
    let yaml = include_str!("../../recordsheet-schema/tests/fixtures/cards.yaml");
    let doc = RegistryDoc::from_yaml_str(yaml).expect("fixture parses");
    Arc::new(KindRegistry::new(doc).expect("fixture binds"))
}

fn table(rows: &[&[&str]]) -> Table {
    Table::from_text_rows(
        rows.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect(),
    )
}

fn run_download(table: &mut Table, registry: &Arc<KindRegistry>, store: &mut MemoryStore) {
    let mut state = SyncState::new(SyncMode::Download, registry, store);
    download(table, &mut state).expect("download succeeds");
}

#[test]
fn blocks_span_until_the_next_identity_cell() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());
    let mut sheet = table(&[
        &["Card", "", ""],
        &["Name", "Cost", "Damage"],
        &["Alpha", "1", "2.5"],
        &["", "", ""],
        &["", "", ""],
        &["Beta", "2", ""],
    ]);
    run_download(&mut sheet, &registry, &mut store);

    let card = registry.resolve("Card").unwrap();
    assert_eq!(store.instances_of(card).len(), 2);

    let alpha = store.get(store.lookup(card, "Alpha").unwrap());
    assert_eq!(alpha.field(1), &Value::Int(1));
    assert_eq!(alpha.field(2), &Value::Float(2.5));
    // The first block runs through the two blank rows, so its terminal row
    // index is 2; the second block is the single row 3.
    assert_eq!(alpha.order(), Some(2));
    let beta = store.get(store.lookup(card, "Beta").unwrap());
    assert_eq!(beta.order(), Some(3));
}

#[test]
fn duplicate_names_resolve_to_the_first_instance() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());
    let mut sheet = table(&[
        &["Card", ""],
        &["Name", "Cost"],
        &["Alpha", "1"],
        &["Alpha", "2"],
    ]);
    run_download(&mut sheet, &registry, &mut store);

    let card = registry.resolve("Card").unwrap();
    assert_eq!(store.instances_of(card).len(), 1);
    // Only the first block's fields apply; the duplicate is a reference.
    let alpha = store.get(store.lookup(card, "Alpha").unwrap());
    assert_eq!(alpha.field(1), &Value::Int(1));
}

#[test]
fn downloading_twice_changes_nothing() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());
    let rows: &[&[&str]] = &[
        &["Card", "", ""],
        &["Name", "Cost", "Traits"],
        &["Alpha", "1", "Flying, Swift"],
        &["Beta", "2", ""],
    ];
    let mut sheet = table(rows);
    run_download(&mut sheet, &registry, &mut store);
    let first_pass: Vec<_> = snapshot(&store);

    let mut sheet = table(rows);
    run_download(&mut sheet, &registry, &mut store);
    assert_eq!(snapshot(&store), first_pass);
    assert_eq!(store.len(), 2);
}

fn snapshot(store: &MemoryStore) -> Vec<(String, Option<usize>, Vec<Value>)> {
    (0..store.len() as u32)
        .map(|i| {
            let inst = store.get(InstanceId(i));
            (
                inst.name().to_owned(),
                inst.order(),
                inst.fields().to_vec(),
            )
        })
        .collect()
}

#[test]
fn child_rows_build_the_parent_array() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());
    let mut sheet = table(&[
        &["Card", "", "Effect:Card.Effects", ""],
        &["Name", "Cost", "Title", "Power"],
        &["Fireball", "3", "Burn", "4"],
        &["", "", "Lingering", "1"],
        &["Shield", "1", "Block", "2"],
    ]);
    run_download(&mut sheet, &registry, &mut store);

    let card = registry.resolve("Card").unwrap();
    let fireball = store.get(store.lookup(card, "Fireball").unwrap());
    let Value::Array(effects) = fireball.field(6) else {
        panic!("expected effect array");
    };
    assert_eq!(effects.len(), 2);
    let titles: Vec<_> = effects
        .iter()
        .map(|v| match v {
            Value::Ref(id) => store.get(*id).field(0).clone(),
            other => panic!("expected ref, got {other:?}"),
        })
        .collect();
    assert_eq!(
        titles,
        vec![Value::Text("Burn".into()), Value::Text("Lingering".into())]
    );
    // Terminal rows: Fireball's block covers data rows 0-1.
    assert_eq!(fireball.order(), Some(1));

    let shield = store.get(store.lookup(card, "Shield").unwrap());
    let Value::Array(effects) = shield.field(6) else {
        panic!("expected effect array");
    };
    assert_eq!(effects.len(), 1);
}

#[test]
fn typed_cells_land_on_the_instance() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());
    let card = registry.resolve("Card").unwrap();
    let slash = store.insert(card, "Slash");
    let heavy = store.insert(card, "Heavy Slash");

    let mut sheet = table(&[
        &["Card", "", "", "", "", ""],
        &["Name", "Traits", "Rarity", "Upgrades", "OnPlay", "Damage"],
        &[
            "Alpha",
            "Flying Armored",
            "Epic",
            "Slash, Heavy Slash",
            "Burst{power:5;duration:1.5;origin:1,2,3}",
            "0.75",
        ],
    ]);
    run_download(&mut sheet, &registry, &mut store);

    let alpha = store.get(store.lookup(card, "Alpha").unwrap());
    assert_eq!(alpha.field(3), &Value::Enum(0b011));
    assert_eq!(alpha.field(4), &Value::Enum(2));
    assert_eq!(
        alpha.field(5),
        &Value::Array(vec![Value::Ref(slash), Value::Ref(heavy)])
    );
    assert_eq!(alpha.field(2), &Value::Float(0.75));

    let Value::Record(on_play) = alpha.field(7) else {
        panic!("expected nested payload");
    };
    assert_eq!(on_play.kind, registry.resolve("Burst").unwrap());
    assert_eq!(on_play.fields[0], Value::Int(5));
    assert_eq!(on_play.fields[1], Value::Float(1.5));
    assert_eq!(on_play.fields[2], Value::Vec3([1.0, 2.0, 3.0]));
}

#[test]
fn dangling_reference_clears_the_field_without_creating() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());
    let mut sheet = table(&[
        &["Card", ""],
        &["Name", "Upgrades"],
        &["Alpha", "Ghost"],
    ]);
    run_download(&mut sheet, &registry, &mut store);

    let card = registry.resolve("Card").unwrap();
    // Only Alpha itself was created; the dangling name allocated nothing and
    // its slot in the array came through unset.
    assert_eq!(store.len(), 1);
    let alpha = store.get(store.lookup(card, "Alpha").unwrap());
    assert_eq!(alpha.field(5), &Value::Array(vec![Value::Empty]));
}

#[test]
fn unknown_kind_header_is_a_no_op() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());
    let mut sheet = table(&[
        &["Ghost", ""],
        &["Name", "Cost"],
        &["Alpha", "1"],
    ]);
    run_download(&mut sheet, &registry, &mut store);
    assert!(store.is_empty());
}
