use partmap::store::categories::UNCATEGORIZED;
use partmap::{
    CancelToken, CategoryRule, ComponentRecord, Materializer, MappingEngine, RuleStore, StoreConfig, TableConfig,
};

fn mk_record(symbol: &str, footprint: &str, description: &str) -> ComponentRecord {
    ComponentRecord::new()
        .with("Symbol", symbol)
        .with("Footprint", footprint)
        .with("Description", description)
        .with("Manufacturer", "Acme")
}

fn count(store: &Materializer, sql: &str) -> i64 {
    store.connection().query_row(sql, [], |r| r.get(0)).unwrap()
}

///3 mappings in 2 categories.
///expected: 3 rows, both categories present next to Uncategorized.
#[test]
fn three_mappings_in_two_categories_make_three_rows() {
    let mut rules = RuleStore::new();
    rules.add_category_rule(CategoryRule::new("*resistor*", "Passive", "Resistors", &[])).unwrap();
    rules.add_category_rule(CategoryRule::new("*diode*", "Discrete", "Diodes", &[])).unwrap();
    let engine = MappingEngine::new(rules);

    let records = vec![
        mk_record("RES", "0603", "10k resistor"),
        mk_record("RES", "0805", "1k resistor"),
        mk_record("D", "SOD-123", "switching diode"),
    ];
    let mapped = engine.map_table("parts", &records, &TableConfig::default(), &CancelToken::new());
    let tables = vec![mapped];

    let store = Materializer::open_in_memory(StoreConfig::default()).unwrap();
    store.create_schema().unwrap();
    let ids = store.populate_categories(&tables).unwrap();
    let stats = store.materialize(&tables, &ids).unwrap();

    assert_eq!(stats.inserted, 3);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM components"), 3);
    assert!(ids.get("Passive").is_some());
    assert!(ids.get("Discrete").is_some());
    assert!(ids.get(UNCATEGORIZED).is_some());

    let used = count(&store, "SELECT COUNT(DISTINCT category_id) FROM components");
    assert_eq!(used, 2);
    let passive = count(&store, "SELECT COUNT(*) FROM components c JOIN categories k ON c.category_id = k.id WHERE k.name = 'Passive'");
    assert_eq!(passive, 2);
}

#[test]
fn category_ids_always_resolve() {
    let engine = MappingEngine::default();
    let records = vec![mk_record("X", "", "mystery part"), mk_record("R", "0603", "resistor")];
    let tables = vec![engine.map_table("t", &records, &TableConfig::default(), &CancelToken::new())];

    let store = Materializer::open_in_memory(StoreConfig::default()).unwrap();
    store.create_schema().unwrap();
    let ids = store.populate_categories(&tables).unwrap();
    store.materialize(&tables, &ids).unwrap();

    let orphans = count(
        &store,
        "SELECT COUNT(*) FROM components WHERE category_id IS NULL OR category_id NOT IN (SELECT id FROM categories)",
    );
    assert_eq!(orphans, 0);

    let uncategorized = count(&store, "SELECT c.category_id FROM components c WHERE c.original_raw_symbol = 'X'");
    assert_eq!(uncategorized, ids.uncategorized());
}

#[test]
fn views_pick_up_their_kind() {
    let engine = MappingEngine::default();
    let records = vec![
        mk_record("RES", "0603", "10k resistor"),
        mk_record("CAP", "0603", "100nF capacitor"),
        mk_record("Q", "SOT-23", "N-channel MOSFET"),
    ];
    let tables = vec![engine.map_table("t", &records, &TableConfig::default(), &CancelToken::new())];

    let store = Materializer::open_in_memory(StoreConfig::default()).unwrap();
    store.create_schema().unwrap();
    let ids = store.populate_categories(&tables).unwrap();
    store.materialize(&tables, &ids).unwrap();

    assert_eq!(count(&store, "SELECT COUNT(*) FROM resistors WHERE original_raw_symbol = 'RES'"), 1);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM capacitors WHERE original_raw_symbol = 'CAP'"), 1);
    assert_eq!(count(&store, "SELECT COUNT(*) FROM transistors WHERE original_raw_symbol = 'Q'"), 1);
}

#[test]
fn generate_writes_every_artifact() {
    let engine = MappingEngine::default();
    let records = vec![mk_record("RES", "0603", "10k resistor"), mk_record("???", "", "")];
    let tables = vec![engine.map_table("t", &records, &TableConfig::default(), &CancelToken::new())];

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("library");
    let files = Materializer::generate(&out, StoreConfig { batch_size: 1, ..StoreConfig::default() }, &tables).unwrap();

    assert!(files.database.exists());
    assert!(files.descriptor.exists());
    let report = files.report.clone().unwrap();
    assert!(report.exists());
    assert_eq!(files.stats.inserted, 2);

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["migration_summary"]["total_components"], 2);
    assert_eq!(json["table_details"]["t"]["missing_symbols"][0], "???");

    let dbl: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&files.descriptor).unwrap()).unwrap();
    assert!(dbl["source"]["connection_string"].as_str().unwrap().contains("components.db"));
}
