use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An in-memory record.
///
/// Only the field map is serialized; the persistence flag and the skip marker
/// live on this instance alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: Map<String, Value>,

    #[serde(skip)]
    persisted: bool,

    #[serde(skip)]
    skip_id: bool,
}

impl Document {
    /// A record that has never been saved.
    pub fn new() -> Self {
        Self::default()
    }

    /// A record loaded from the store.
    pub fn hydrated(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            persisted: true,
            skip_id: false,
        }
    }

    pub fn is_new(&self) -> bool {
        !self.persisted
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.fields.get(field).and_then(Value::as_i64)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Suppress id assignment on this record's next save.
    pub fn set_skip_id(&mut self, skip: bool) -> &mut Self {
        self.skip_id = skip;
        self
    }

    pub fn skip_id(&self) -> bool {
        self.skip_id
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.persisted = true;
    }
}
