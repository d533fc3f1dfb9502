use thiserror::Error;

use crate::tracker::TrackerKey;

/// Raised while attaching a plugin to a schema. The plugin is not attached.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SetupError {
    #[error("options with at least one field are required")]
    NoFields,

    #[error("field \"{0}\" does not exist on the schema")]
    FieldMissing(String),

    #[error("field \"{0}\" is not a number field")]
    FieldNotNumeric(String),

    /// Prefixed counters repeat values across prefixes, which an identifier cannot do.
    #[error("cannot use the identity field \"{0}\" when a prefix is configured")]
    PrefixOnIdField(String),

    #[error("increment must be at least 1, got {0}")]
    InvalidIncrement(i64),
}

/// Errors surfaced by a tracker backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A tracker for this key already exists. Concurrent first saves of the same
    /// key can hit this; the save fails and is not retried.
    #[error("duplicate tracker for {0}")]
    DuplicateKey(TrackerKey),

    #[error(
        "tracker model \"{name}\" is bound to collection \"{existing}\", not \"{requested}\""
    )]
    ModelOverwrite {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("count for {0} is out of range")]
    CountOverflow(TrackerKey),

    #[error("invalid tracker collection name \"{0}\"")]
    InvalidCollection(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Raised by a pre-save hook. The save is aborted.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("model name override for \"{0}\" returned an empty name")]
    EmptyModelName(String),

    #[error("incrementing count failed for \"{model_name}\" on field \"{field}\"")]
    IncrementFailed { model_name: String, field: String },

    #[error("field \"{0}\" holds a non-numeric value")]
    FieldNotNumeric(String),

    #[error("incrementing field \"{0}\" is out of range")]
    FieldOverflow(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SaveError {
    /// True when the save lost a race to seed a new tracker.
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, SaveError::Store(StoreError::DuplicateKey(_)))
    }
}
