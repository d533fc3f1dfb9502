use sqlx::{PgPool, Row};

use super::migrate::{migrate_trackers, table_sql};
use crate::error::StoreError;
use crate::tracker::{TrackerBackend, TrackerKey, TrackerRecord};

/// SQLSTATE raised when `count + by` leaves the bigint range.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

/// Tracker collections stored as Postgres tables.
///
/// Each collection is a table with a unique index over the tracker key. The
/// atomic increment is a single `UPDATE … RETURNING` statement (or an
/// `INSERT … ON CONFLICT DO UPDATE` when upserting), so concurrent increments of
/// one key are serialized by the row lock.
#[derive(Debug, Clone)]
pub struct PgTrackerStore {
    pool: PgPool,
}

impl PgTrackerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl TrackerBackend for PgTrackerStore {
    async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        migrate_trackers(&self.pool, collection).await
    }

    async fn find_one(
        &self,
        collection: &str,
        key: &TrackerKey,
    ) -> Result<Option<TrackerRecord>, StoreError> {
        let sql = table_sql(include_str!("../../sql/find_tracker.sql"), collection)?;
        let row = sqlx::query(&sql)
            .bind(&key.field)
            .bind(&key.model_name)
            .bind(key.prefix.as_deref())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(TrackerRecord {
                model_name: row.try_get("model_name")?,
                field: row.try_get("field")?,
                count: row.try_get("count")?,
                prefix: row.try_get("prefix")?,
            })),
            None => Ok(None),
        }
    }

    async fn create(&self, collection: &str, record: &TrackerRecord) -> Result<(), StoreError> {
        let sql = table_sql(include_str!("../../sql/insert_tracker.sql"), collection)?;
        let result = sqlx::query(&sql)
            .bind(&record.field)
            .bind(&record.model_name)
            .bind(record.prefix.as_deref())
            .bind(record.count)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(StoreError::DuplicateKey(record.key()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn find_one_and_increment(
        &self,
        collection: &str,
        key: &TrackerKey,
        by: i64,
        upsert: bool,
    ) -> Result<Option<i64>, StoreError> {
        let template = if upsert {
            include_str!("../../sql/upsert_increment_tracker.sql")
        } else {
            include_str!("../../sql/increment_tracker.sql")
        };
        let sql = table_sql(template, collection)?;
        let result = sqlx::query_scalar::<_, i64>(&sql)
            .bind(&key.field)
            .bind(&key.model_name)
            .bind(key.prefix.as_deref())
            .bind(by)
            .fetch_optional(&self.pool)
            .await;

        match result {
            Ok(count) => Ok(count),
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE) => {
                Err(StoreError::CountOverflow(key.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
