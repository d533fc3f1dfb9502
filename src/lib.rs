pub mod db;
pub mod document;
pub mod error;
pub mod id;
pub mod model;
pub mod options;
pub mod schema;
pub mod simple;
pub mod tracker;

pub use document::Document;
pub use error::{SaveError, SetupError, StoreError};
pub use id::{AutoIncrementId, auto_increment_id};
pub use model::Model;
pub use options::{AutoIncrementIdOptions, AutoIncrementSimpleOptions, ModelNameOverride};
pub use schema::{FieldType, ID_FIELD, Schema};
pub use simple::{AutoIncrementSimple, auto_increment_simple};
pub use tracker::{Connection, MemoryTrackerStore, TrackerBackend, TrackerKey, TrackerRecord};
