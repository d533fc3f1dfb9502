use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::SaveError;
use crate::schema::{PreSaveHook, Schema};
use crate::tracker::{Connection, TrackerBackend};

/// A named record type bound to a connection.
#[derive(Debug)]
pub struct Model<B> {
    name: String,
    schema: Schema,
    conn: Connection<B>,
}

impl<B> Clone for Model<B> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            schema: self.schema.clone(),
            conn: self.conn.clone(),
        }
    }
}

impl<B: TrackerBackend> Model<B> {
    pub fn new(conn: &Connection<B>, name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
            conn: conn.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn connection(&self) -> &Connection<B> {
        &self.conn
    }

    /// A new, unsaved record.
    pub fn document(&self) -> Document {
        Document::new()
    }

    /// A record as loaded from the store.
    pub fn hydrate(&self, fields: Map<String, Value>) -> Document {
        Document::hydrated(fields)
    }

    /// Run every pre-save hook in attachment order, then mark the record persisted.
    ///
    /// The first failing hook aborts the save; the record stays new and keeps
    /// whatever earlier hooks assigned.
    pub async fn save(&self, doc: &mut Document) -> Result<(), SaveError> {
        for hook in self.schema.hooks() {
            match hook {
                PreSaveHook::Simple(simple) => simple.pre_save(&self.name, doc)?,
                PreSaveHook::Id(id) => {
                    id.pre_save(&self.name, &self.schema, &self.conn, doc)
                        .await?
                }
            }
        }
        doc.mark_persisted();
        tracing::debug!(model = %self.name, "saved");
        Ok(())
    }
}
