use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::{TrackerBackend, TrackerKey, TrackerRecord};
use crate::error::StoreError;

/// In-process tracker storage.
///
/// Every operation yields to the scheduler before touching state, so concurrent
/// saves interleave at the same points they would against a remote store.
#[derive(Debug, Default)]
pub struct MemoryTrackerStore {
    collections: Mutex<HashMap<String, HashMap<TrackerKey, i64>>>,
}

impl MemoryTrackerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All records of a collection, sorted by key.
    pub fn records(&self, collection: &str) -> Vec<TrackerRecord> {
        let collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        let mut records: Vec<TrackerRecord> = collections
            .get(collection)
            .into_iter()
            .flatten()
            .map(|(key, count)| TrackerRecord::seed(key, *count))
            .collect();
        records.sort_by(|a, b| {
            (&a.model_name, &a.field, &a.prefix).cmp(&(&b.model_name, &b.field, &b.prefix))
        });
        records
    }

    fn with_collection<T>(
        &self,
        collection: &str,
        f: impl FnOnce(&mut HashMap<TrackerKey, i64>) -> T,
    ) -> T {
        let mut collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        f(collections.entry(collection.to_string()).or_default())
    }
}

impl TrackerBackend for MemoryTrackerStore {
    async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        self.with_collection(collection, |_| ());
        Ok(())
    }

    async fn find_one(
        &self,
        collection: &str,
        key: &TrackerKey,
    ) -> Result<Option<TrackerRecord>, StoreError> {
        tokio::task::yield_now().await;
        Ok(self.with_collection(collection, |rows| {
            rows.get(key).map(|count| TrackerRecord::seed(key, *count))
        }))
    }

    async fn create(&self, collection: &str, record: &TrackerRecord) -> Result<(), StoreError> {
        tokio::task::yield_now().await;
        let key = record.key();
        self.with_collection(collection, |rows| {
            if rows.contains_key(&key) {
                return Err(StoreError::DuplicateKey(key));
            }
            rows.insert(key, record.count);
            Ok(())
        })
    }

    async fn find_one_and_increment(
        &self,
        collection: &str,
        key: &TrackerKey,
        by: i64,
        upsert: bool,
    ) -> Result<Option<i64>, StoreError> {
        tokio::task::yield_now().await;
        self.with_collection(collection, |rows| match rows.get_mut(key) {
            Some(count) => match count.checked_add(by) {
                Some(next) => {
                    *count = next;
                    Ok(Some(next))
                }
                None => Err(StoreError::CountOverflow(key.clone())),
            },
            None if upsert => {
                rows.insert(key.clone(), by);
                Ok(Some(by))
            }
            None => Ok(None),
        })
    }
}
