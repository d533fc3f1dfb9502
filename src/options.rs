use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use crate::document::Document;
use crate::schema::{ID_FIELD, Schema};

pub const DEFAULT_INCREMENT: i64 = 1;

/// Computes the tracker model name from the record type's own name and schema.
pub type ModelNameFn = Arc<dyn Fn(&str, &Schema) -> String + Send + Sync>;
/// Produces the counter partition for a save. `None` means unpartitioned.
pub type PrefixFn = Arc<dyn Fn() -> Option<String> + Send + Sync>;
/// Called with the record after its counter field was assigned.
pub type PostIncrementFn = Arc<dyn Fn(&mut Document) + Send + Sync>;

/// One field enrolled in the simple incrementer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoIncrementSimpleOptions {
    /// Field to increment on every save of an existing record.
    pub field: String,
    /// Defaults to [`DEFAULT_INCREMENT`].
    #[serde(default)]
    pub increment_by: Option<i64>,
}

impl AutoIncrementSimpleOptions {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            increment_by: None,
        }
    }

    pub fn increment_by(mut self, by: i64) -> Self {
        self.increment_by = Some(by);
        self
    }
}

/// A single enrollment passes wherever a list of them is accepted.
impl IntoIterator for AutoIncrementSimpleOptions {
    type Item = AutoIncrementSimpleOptions;
    type IntoIter = std::iter::Once<AutoIncrementSimpleOptions>;

    fn into_iter(self) -> Self::IntoIter {
        std::iter::once(self)
    }
}

/// What to store as the tracker's model name.
#[derive(Clone)]
pub enum ModelNameOverride {
    Literal(String),
    Computed(ModelNameFn),
}

impl fmt::Debug for ModelNameOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelNameOverride::Literal(name) => f.debug_tuple("Literal").field(name).finish(),
            ModelNameOverride::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for ModelNameOverride {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(ModelNameOverride::Literal)
    }
}

/// Options for the id tracker.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoIncrementIdOptions {
    /// Field receiving the counter value.
    pub field: String,
    pub increment_by: i64,
    /// Collection holding the tracker records.
    pub tracker_collection: String,
    /// Name the tracker accessor is registered under on the connection.
    pub tracker_model_name: String,
    /// First value issued for a new counter.
    pub start_at: i64,
    /// Defaults to the saving record's model name. An empty literal counts as unset.
    pub overwrite_model_name: Option<ModelNameOverride>,
    #[serde(skip)]
    pub prefix: Option<PrefixFn>,
    #[serde(skip)]
    pub post_increment: Option<PostIncrementFn>,
}

impl Default for AutoIncrementIdOptions {
    fn default() -> Self {
        Self {
            field: ID_FIELD.to_string(),
            increment_by: DEFAULT_INCREMENT,
            tracker_collection: "identitycounters".to_string(),
            tracker_model_name: "identitycounter".to_string(),
            start_at: 0,
            overwrite_model_name: None,
            prefix: None,
            post_increment: None,
        }
    }
}

impl AutoIncrementIdOptions {
    pub fn with_model_name(mut self, name: impl Into<String>) -> Self {
        self.overwrite_model_name = Some(ModelNameOverride::Literal(name.into()));
        self
    }

    pub fn with_model_name_fn(
        mut self,
        f: impl Fn(&str, &Schema) -> String + Send + Sync + 'static,
    ) -> Self {
        self.overwrite_model_name = Some(ModelNameOverride::Computed(Arc::new(f)));
        self
    }

    pub fn with_prefix(mut self, f: impl Fn() -> Option<String> + Send + Sync + 'static) -> Self {
        self.prefix = Some(Arc::new(f));
        self
    }

    pub fn with_post_increment(
        mut self,
        f: impl Fn(&mut Document) + Send + Sync + 'static,
    ) -> Self {
        self.post_increment = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for AutoIncrementIdOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoIncrementIdOptions")
            .field("field", &self.field)
            .field("increment_by", &self.increment_by)
            .field("tracker_collection", &self.tracker_collection)
            .field("tracker_model_name", &self.tracker_model_name)
            .field("start_at", &self.start_at)
            .field("overwrite_model_name", &self.overwrite_model_name)
            .field("prefix", &self.prefix.is_some())
            .field("post_increment", &self.post_increment.is_some())
            .finish()
    }
}
