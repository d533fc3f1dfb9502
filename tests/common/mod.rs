#![allow(dead_code)]

use autoinc::*;

pub const TRACKERS: &str = "identitycounters";

pub fn connection() -> Connection<MemoryTrackerStore> {
    Connection::new(MemoryTrackerStore::new())
}

/// Schema with a numeric `_id`, a numeric `seq` and a text `name`.
pub fn order_schema() -> Schema {
    Schema::new()
        .field(ID_FIELD, FieldType::Number)
        .field("seq", FieldType::Number)
        .field("name", FieldType::String)
}

/// An `Order` model counting `seq` from `start_at` in steps of `increment_by`.
pub fn seq_model(
    conn: &Connection<MemoryTrackerStore>,
    start_at: i64,
    increment_by: i64,
) -> Model<MemoryTrackerStore> {
    let mut schema = order_schema();
    auto_increment_id(
        &mut schema,
        AutoIncrementIdOptions {
            field: "seq".to_string(),
            start_at,
            increment_by,
            ..AutoIncrementIdOptions::default()
        },
    )
    .unwrap();
    Model::new(conn, "Order", schema)
}

pub fn tracker_count(conn: &Connection<MemoryTrackerStore>, key: &TrackerKey) -> Option<i64> {
    conn.backend()
        .records(TRACKERS)
        .into_iter()
        .find(|r| &r.key() == key)
        .map(|r| r.count)
}
