use sqlx::PgPool;

use crate::error::StoreError;

/// Execute the tracker DDL (CREATE TABLE / CREATE UNIQUE INDEX IF NOT EXISTS)
/// for the given collection.
pub async fn migrate_trackers(pool: &PgPool, collection: &str) -> Result<(), StoreError> {
    let ddl = table_sql(include_str!("../../sql/tracker_schema.sql"), collection)?;
    sqlx::raw_sql(&ddl).execute(pool).await?;
    Ok(())
}

/// Substitute a collection name into a statement template.
///
/// Table names cannot be bound as parameters, so only plain identifiers are
/// accepted.
pub(crate) fn table_sql(template: &str, collection: &str) -> Result<String, StoreError> {
    let mut chars = collection.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    // Leave room for the "_key_idx" suffix within Postgres' 63-byte limit.
    if !valid || collection.len() > 54 {
        return Err(StoreError::InvalidCollection(collection.to_string()));
    }
    Ok(template.replace("{table}", collection))
}
