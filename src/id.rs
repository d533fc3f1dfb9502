use std::fmt;

use crate::document::Document;
use crate::error::{SaveError, SetupError};
use crate::options::{AutoIncrementIdOptions, ModelNameOverride, PostIncrementFn, PrefixFn};
use crate::schema::{ID_FIELD, PreSaveHook, Schema};
use crate::tracker::{Connection, TrackerBackend, TrackerKey, TrackerRecord};

/// Assigns counter values from a shared tracker collection on save.
///
/// The first save observed for a (model name, field, prefix) key seeds the
/// tracker at `start_at` and assigns that value. Every later save of a new
/// record increments the tracker atomically and assigns the result. Saves of
/// existing records leave both untouched.
///
/// Seeding is a lookup followed by an insert. Two first saves racing on the
/// same key both miss the lookup; the store's uniqueness constraint rejects the
/// second insert and that save fails with a duplicate key error.
#[derive(Clone)]
pub struct AutoIncrementId {
    field: String,
    increment_by: i64,
    tracker_collection: String,
    tracker_model_name: String,
    start_at: i64,
    overwrite_model_name: Option<ModelNameOverride>,
    prefix: Option<PrefixFn>,
    post_increment: Option<PostIncrementFn>,
}

/// Attach the id tracker to `schema`.
pub fn auto_increment_id(
    schema: &mut Schema,
    options: AutoIncrementIdOptions,
) -> Result<(), SetupError> {
    let hook = AutoIncrementId::new(schema, options)?;
    tracing::info!(options = ?hook, "initializing id auto-increment");
    schema.push_hook(PreSaveHook::Id(hook));
    Ok(())
}

impl AutoIncrementId {
    fn new(schema: &Schema, options: AutoIncrementIdOptions) -> Result<Self, SetupError> {
        if options.prefix.is_some() && options.field == ID_FIELD {
            return Err(SetupError::PrefixOnIdField(options.field));
        }
        schema.require_number(&options.field)?;
        if options.increment_by < 1 {
            return Err(SetupError::InvalidIncrement(options.increment_by));
        }

        // An empty literal behaves like no override at all.
        let overwrite_model_name = match options.overwrite_model_name {
            Some(ModelNameOverride::Literal(name)) if name.is_empty() => None,
            other => other,
        };

        Ok(Self {
            field: options.field,
            increment_by: options.increment_by,
            tracker_collection: options.tracker_collection,
            tracker_model_name: options.tracker_model_name,
            start_at: options.start_at,
            overwrite_model_name,
            prefix: options.prefix,
            post_increment: options.post_increment,
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// The model name the tracker is keyed by for records of `model_name`.
    fn tracker_model_for(&self, model_name: &str, schema: &Schema) -> Result<String, SaveError> {
        match &self.overwrite_model_name {
            Some(ModelNameOverride::Computed(f)) => {
                let name = f(model_name, schema);
                if name.is_empty() {
                    return Err(SaveError::EmptyModelName(model_name.to_string()));
                }
                Ok(name)
            }
            Some(ModelNameOverride::Literal(name)) => Ok(name.clone()),
            None => Ok(model_name.to_string()),
        }
    }

    fn assign(&self, doc: &mut Document, count: i64) {
        tracing::debug!(field = %self.field, count, "assigning counter");
        doc.set(self.field.as_str(), count);
        if let Some(post_increment) = &self.post_increment {
            post_increment(doc);
        }
    }

    pub(crate) async fn pre_save<B: TrackerBackend>(
        &self,
        model_name: &str,
        schema: &Schema,
        conn: &Connection<B>,
        doc: &mut Document,
    ) -> Result<(), SaveError> {
        let prefix = self.prefix.as_ref().and_then(|f| f());
        let trackers = conn
            .tracker_model(&self.tracker_model_name, &self.tracker_collection)
            .await?;
        let key = TrackerKey::new(self.tracker_model_for(model_name, schema)?, &self.field, prefix);

        if trackers.find_one(&key).await?.is_none() {
            tracing::debug!(key = %key, start_at = self.start_at, "seeding tracker");
            trackers.create(&TrackerRecord::seed(&key, self.start_at)).await?;
            self.assign(doc, self.start_at);
            return Ok(());
        }

        if !doc.is_new() {
            tracing::debug!(key = %key, "document is not new, not incrementing");
            return Ok(());
        }

        if doc.skip_id() {
            tracing::debug!(key = %key, "skip marker set, not incrementing");
            return Ok(());
        }

        // Upsert covers a tracker removed between the lookup and here.
        let count = trackers
            .find_one_and_increment(&key, self.increment_by, true)
            .await?
            .ok_or_else(|| SaveError::IncrementFailed {
                model_name: key.model_name.clone(),
                field: key.field.clone(),
            })?;
        self.assign(doc, count);
        Ok(())
    }
}

impl fmt::Debug for AutoIncrementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoIncrementId")
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
