use std::sync::Arc;

use recordsheet_common::{KindId, Table, Value};
use recordsheet_schema::{KindRegistry, RegistryDoc};
use recordsheet_sync::{InstanceStore, MemoryStore, SyncMode, SyncState, download, upload};

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

fn run_upload(table: &mut Table, registry: &Arc<KindRegistry>, store: &mut MemoryStore) {
    let mut state = SyncState::new(SyncMode::Upload, registry, store);
    upload(table, &mut state).expect("upload succeeds");
}

fn seed_card(store: &mut MemoryStore, card: KindId, name: &str, cost: i32) {
    let id = store.insert(card, name);
    store
        .set_field(id, 0, Value::Text(name.to_owned()))
        .unwrap();
    store.set_field(id, 1, Value::Int(cost)).unwrap();
}

#[test]
fn refresh_marks_only_changed_cells() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());
    let card = registry.resolve("Card").unwrap();
    seed_card(&mut store, card, "Alpha", 7);

    let mut sheet = table(&[
        &["Card", ""],
        &["Name", "Cost"],
        &["Alpha", "1"],
    ]);
    run_upload(&mut sheet, &registry, &mut store);

    let row = &sheet.rows()[2];
    assert_eq!(row[0].text(), "Alpha");
    assert!(!row[0].is_modified());
    assert_eq!(row[1].text(), "7");
    assert!(row[1].is_modified());
}

#[test]
fn missing_instances_append_after_existing_rows() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());
    let card = registry.resolve("Card").unwrap();
    seed_card(&mut store, card, "Alpha", 1);
    seed_card(&mut store, card, "Beta", 2);

    let mut sheet = table(&[
        &["Card", ""],
        &["Name", "Cost"],
        &["Alpha", "1"],
    ]);
    run_upload(&mut sheet, &registry, &mut store);

    // Alpha is already represented, so exactly one row arrives for Beta.
    assert_eq!(sheet.row_count(), 4);
    assert_eq!(sheet.rows()[2][0].text(), "Alpha");
    let appended = &sheet.rows()[3];
    assert_eq!(appended[0].text(), "Beta");
    assert_eq!(appended[1].text(), "2");
    assert!(appended[0].is_modified());
    assert!(appended[1].is_modified());
}

#[test]
fn blank_identity_rows_realign_to_backing_instances() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());
    let headers: [&[&str]; 2] = [
        &["Card", "", "Effect:Card.Effects", ""],
        &["Name", "Cost", "Title", "Power"],
    ];
    let mut seeded = table(&[
        headers[0],
        headers[1],
        &["Fireball", "3", "Burn", "4"],
        &["", "", "Lingering", "1"],
    ]);
    run_download(&mut seeded, &registry, &mut store);
    assert_eq!(store.len(), 3);

    // The upload copy lost its child identity cells and holds stale powers.
    let mut sheet = table(&[
        headers[0],
        headers[1],
        &["Fireball", "9", "", "5"],
        &["", "", "", "9"],
    ]);
    run_upload(&mut sheet, &registry, &mut store);

    // Each row realigned to the correspondingly indexed effect, index by
    // index, rather than collapsing onto the last one.
    let first = &sheet.rows()[2];
    assert_eq!(first[1].text(), "3");
    assert_eq!(first[2].text(), "Burn");
    assert_eq!(first[3].text(), "4");
    let second = &sheet.rows()[3];
    assert_eq!(second[2].text(), "Lingering");
    assert_eq!(second[3].text(), "1");
    assert!(second[3].is_modified());
    // Realignment resolved, never created.
    assert_eq!(store.len(), 3);
}

#[test]
fn exhausted_backing_keeps_a_multi_row_block_together() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());
    let headers: [&[&str]; 2] = [
        &["Card", "", "Effect:Card.Effects", ""],
        &["Name", "Cost", "Title", "Power"],
    ];
    let mut seeded = table(&[
        headers[0],
        headers[1],
        &["Fireball", "3", "Burn", "4"],
    ]);
    run_download(&mut seeded, &registry, &mut store);

    let mut sheet = table(&[
        headers[0],
        headers[1],
        &["Fireball", "3", "", ""],
        &["", "", "", ""],
    ]);
    run_upload(&mut sheet, &registry, &mut store);

    // One backing effect, two blank rows: the block stays whole, the single
    // effect refreshes the first row, and the trailing row is untouched.
    let first = &sheet.rows()[2];
    assert_eq!(first[2].text(), "Burn");
    assert_eq!(first[3].text(), "4");
    let second = &sheet.rows()[3];
    assert!(!second[2].is_modified());
    assert!(!second[3].is_modified());
    assert!(second[2].is_empty());
    assert_eq!(store.len(), 2);
}

#[test]
fn appended_rows_carry_no_child_rows() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());
    let headers: [&[&str]; 2] = [
        &["Card", "", "Effect:Card.Effects", ""],
        &["Name", "Cost", "Title", "Power"],
    ];
    let mut seeded = table(&[
        headers[0],
        headers[1],
        &["Fireball", "3", "Burn", "4"],
    ]);
    run_download(&mut seeded, &registry, &mut store);

    // A sheet that lost its data rows gets the card back as one flat row;
    // child rows only ever round-trip through existing blocks.
    let mut sheet = table(&[headers[0], headers[1]]);
    run_upload(&mut sheet, &registry, &mut store);

    assert_eq!(sheet.row_count(), 3);
    let appended = &sheet.rows()[2];
    assert_eq!(appended[0].text(), "Fireball");
    assert_eq!(appended[1].text(), "3");
    assert!(appended[2].is_empty());
    assert!(appended[3].is_empty());
}

#[test]
fn unknown_row_names_are_left_untouched() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());

    let mut sheet = table(&[
        &["Card", ""],
        &["Name", "Cost"],
        &["Mystery", "9"],
    ]);
    run_upload(&mut sheet, &registry, &mut store);

    let row = &sheet.rows()[2];
    assert_eq!(row[0].text(), "Mystery");
    assert_eq!(row[1].text(), "9");
    assert!(!row[1].is_modified());
    // Upload never allocates instances for unknown rows.
    assert!(store.is_empty());
    assert_eq!(sheet.row_count(), 3);
}

#[test]
fn zero_enum_refreshes_to_a_blank_cell() {
    let registry = registry();
    let mut store = MemoryStore::new(registry.clone());
    let card = registry.resolve("Card").unwrap();
    seed_card(&mut store, card, "Alpha", 1);

    let mut sheet = table(&[
        &["Card", ""],
        &["Name", "Traits"],
        &["Alpha", "Flying"],
    ]);
    run_upload(&mut sheet, &registry, &mut store);

    let row = &sheet.rows()[2];
    assert!(row[1].is_empty());
    assert!(row[1].is_modified());
}
