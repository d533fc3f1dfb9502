pub mod memory;

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::error::StoreError;

pub use memory::MemoryTrackerStore;

/// Identifies one counter series. Unique across a tracker collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackerKey {
    #[serde(rename = "modelName")]
    pub model_name: String,
    pub field: String,
    pub prefix: Option<String>,
}

impl TrackerKey {
    pub fn new(
        model_name: impl Into<String>,
        field: impl Into<String>,
        prefix: Option<String>,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            field: field.into(),
            prefix,
        }
    }
}

impl fmt::Display for TrackerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" field \"{}\"", self.model_name, self.field)?;
        match &self.prefix {
            Some(prefix) => write!(f, " prefix \"{prefix}\""),
            None => Ok(()),
        }
    }
}

/// One row of a tracker collection. `count` is the last issued value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerRecord {
    #[serde(rename = "modelName")]
    pub model_name: String,
    pub field: String,
    pub count: i64,
    pub prefix: Option<String>,
}

impl TrackerRecord {
    pub fn seed(key: &TrackerKey, count: i64) -> Self {
        Self {
            model_name: key.model_name.clone(),
            field: key.field.clone(),
            count,
            prefix: key.prefix.clone(),
        }
    }

    pub fn key(&self) -> TrackerKey {
        TrackerKey::new(&self.model_name, &self.field, self.prefix.clone())
    }
}

/// Storage for tracker collections.
///
/// Implementations must reject a second record with the same [`TrackerKey`]
/// in [`create`](TrackerBackend::create) with [`StoreError::DuplicateKey`], and
/// must apply [`find_one_and_increment`](TrackerBackend::find_one_and_increment)
/// atomically per key.
pub trait TrackerBackend: Send + Sync + 'static {
    /// Create the collection and its uniqueness constraint if missing.
    fn ensure_collection(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Point-in-time read, no locking.
    fn find_one(
        &self,
        collection: &str,
        key: &TrackerKey,
    ) -> impl Future<Output = Result<Option<TrackerRecord>, StoreError>> + Send;

    fn create(
        &self,
        collection: &str,
        record: &TrackerRecord,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Add `by` to the count and return the post-increment value.
    ///
    /// With `upsert`, a missing record is created with `count = by`. Returns
    /// `None` when nothing matched and nothing was created.
    fn find_one_and_increment(
        &self,
        collection: &str,
        key: &TrackerKey,
        by: i64,
        upsert: bool,
    ) -> impl Future<Output = Result<Option<i64>, StoreError>> + Send;
}

/// Shared store handle. Cheap to clone.
#[derive(Debug)]
pub struct Connection<B> {
    inner: Arc<ConnectionInner<B>>,
}

#[derive(Debug)]
struct ConnectionInner<B> {
    backend: B,
    /// tracker model name -> collection
    models: Mutex<HashMap<String, String>>,
    /// Set once a collection's DDL has run. Concurrent first declarations wait
    /// on the same cell.
    ensured: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
}

impl<B> Clone for Connection<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: TrackerBackend> Connection<B> {
    pub fn new(backend: B) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                backend,
                models: Mutex::new(HashMap::new()),
                ensured: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// Declare or obtain the tracker accessor registered under `name`.
    ///
    /// The first declaration ensures the collection exists, once per collection
    /// even under concurrent callers. A name stays bound to the collection it
    /// was first declared with.
    pub async fn tracker_model(
        &self,
        name: &str,
        collection: &str,
    ) -> Result<TrackerModel<'_, B>, StoreError> {
        let existing = self.registered(name);
        match existing {
            Some(existing) if existing != collection => {
                return Err(StoreError::ModelOverwrite {
                    name: name.to_string(),
                    existing,
                    requested: collection.to_string(),
                });
            }
            Some(_) => {}
            None => {
                self.ensure_collection(collection).await?;
                let mut models = self.inner.models.lock().unwrap_or_else(PoisonError::into_inner);
                let bound = models
                    .entry(name.to_string())
                    .or_insert_with(|| collection.to_string());
                if bound.as_str() != collection {
                    return Err(StoreError::ModelOverwrite {
                        name: name.to_string(),
                        existing: bound.clone(),
                        requested: collection.to_string(),
                    });
                }
                tracing::debug!(model = name, collection, "registered tracker model");
            }
        }

        Ok(TrackerModel {
            backend: &self.inner.backend,
            collection: collection.to_string(),
        })
    }

    /// Runs the backend DDL for `collection` at most once. A failed attempt
    /// leaves the cell empty so the next caller retries.
    async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
        let cell = {
            let mut ensured = self.inner.ensured.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(ensured.entry(collection.to_string()).or_default())
        };
        cell.get_or_try_init(|| self.inner.backend.ensure_collection(collection))
            .await?;
        Ok(())
    }

    fn registered(&self, name: &str) -> Option<String> {
        let models = self.inner.models.lock().unwrap_or_else(PoisonError::into_inner);
        models.get(name).cloned()
    }
}

/// Typed accessor for one tracker collection.
#[derive(Debug)]
pub struct TrackerModel<'a, B> {
    backend: &'a B,
    collection: String,
}

impl<B: TrackerBackend> TrackerModel<'_, B> {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn find_one(&self, key: &TrackerKey) -> Result<Option<TrackerRecord>, StoreError> {
        self.backend.find_one(&self.collection, key).await
    }

    pub async fn create(&self, record: &TrackerRecord) -> Result<(), StoreError> {
        self.backend.create(&self.collection, record).await
    }

    pub async fn find_one_and_increment(
        &self,
        key: &TrackerKey,
        by: i64,
        upsert: bool,
    ) -> Result<Option<i64>, StoreError> {
        self.backend
            .find_one_and_increment(&self.collection, key, by, upsert)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn key_display_includes_prefix_only_when_set() {
        let plain = TrackerKey::new("Order", "seq", None);
        assert_eq!(plain.to_string(), "\"Order\" field \"seq\"");

        let prefixed = TrackerKey::new("Order", "seq", Some("eu".to_string()));
        assert_eq!(prefixed.to_string(), "\"Order\" field \"seq\" prefix \"eu\"");
    }

    #[test]
    fn record_serializes_with_model_name_wire_key() {
        let record = TrackerRecord::seed(&TrackerKey::new("Order", "seq", None), 7);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["modelName"], "Order");
        assert_eq!(json["field"], "seq");
        assert_eq!(json["count"], 7);
        assert!(json["prefix"].is_null());
    }

    #[tokio::test]
    async fn tracker_model_name_stays_bound_to_its_collection() {
        let conn = Connection::new(MemoryTrackerStore::new());
        conn.tracker_model("identitycounter", "identitycounters").await.unwrap();
        conn.tracker_model("identitycounter", "identitycounters").await.unwrap();

        let err = conn
            .tracker_model("identitycounter", "othercounters")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ModelOverwrite { .. }));
    }

    /// Counts DDL runs and fails the first `failures` of them.
    #[derive(Debug, Default)]
    struct CountingStore {
        inner: MemoryTrackerStore,
        ensures: AtomicUsize,
        failures: usize,
    }

    impl TrackerBackend for CountingStore {
        async fn ensure_collection(&self, collection: &str) -> Result<(), StoreError> {
            let run = self.ensures.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            if run < self.failures {
                return Err(StoreError::InvalidCollection(collection.to_string()));
            }
            self.inner.ensure_collection(collection).await
        }

        async fn find_one(
            &self,
            collection: &str,
            key: &TrackerKey,
        ) -> Result<Option<TrackerRecord>, StoreError> {
            self.inner.find_one(collection, key).await
        }

        async fn create(&self, collection: &str, record: &TrackerRecord) -> Result<(), StoreError> {
            self.inner.create(collection, record).await
        }

        async fn find_one_and_increment(
            &self,
            collection: &str,
            key: &TrackerKey,
            by: i64,
            upsert: bool,
        ) -> Result<Option<i64>, StoreError> {
            self.inner.find_one_and_increment(collection, key, by, upsert).await
        }
    }

    #[tokio::test]
    async fn concurrent_declarations_create_the_collection_once() {
        let conn = Connection::new(CountingStore::default());
        let (a, b, c, d) = tokio::join!(
            conn.tracker_model("identitycounter", "identitycounters"),
            conn.tracker_model("identitycounter", "identitycounters"),
            conn.tracker_model("identitycounter", "identitycounters"),
            conn.tracker_model("identitycounter", "identitycounters"),
        );
        for model in [a, b, c, d] {
            assert_eq!(model.unwrap().collection(), "identitycounters");
        }
        assert_eq!(conn.backend().ensures.load(Ordering::SeqCst), 1);

        // A second model name over the same collection reuses the finished DDL.
        conn.tracker_model("othercounter", "identitycounters").await.unwrap();
        assert_eq!(conn.backend().ensures.load(Ordering::SeqCst), 1);

        conn.tracker_model("othercounter2", "othercounters").await.unwrap();
        assert_eq!(conn.backend().ensures.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_collection_setup_is_retried() {
        let conn = Connection::new(CountingStore {
            failures: 1,
            ..CountingStore::default()
        });
        let err = conn
            .tracker_model("identitycounter", "identitycounters")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidCollection(_)));

        conn.tracker_model("identitycounter", "identitycounters").await.unwrap();
        assert_eq!(conn.backend().ensures.load(Ordering::SeqCst), 2);
    }
}
