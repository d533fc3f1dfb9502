use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::AutoIncrementId;
use crate::simple::AutoIncrementSimple;

/// Name of the identity field every schema carries.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Number,
    String,
    Boolean,
    Date,
    ObjectId,
    Mixed,
}

/// A behavior run on every save, before the record is persisted.
#[derive(Debug, Clone)]
pub(crate) enum PreSaveHook {
    Simple(AutoIncrementSimple),
    Id(AutoIncrementId),
}

/// Field declarations of a record type plus its attached pre-save hooks.
#[derive(Debug, Clone)]
pub struct Schema {
    fields: BTreeMap<String, FieldType>,
    hooks: Vec<PreSaveHook>,
}

impl Schema {
    /// A schema with only the identity field, typed as an object id.
    pub fn new() -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(ID_FIELD.to_string(), FieldType::ObjectId);
        Self {
            fields,
            hooks: Vec::new(),
        }
    }

    /// Declare a field, replacing any earlier declaration of the same name.
    pub fn field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.insert(name.into(), ty);
        self
    }

    pub fn path(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldType)> {
        self.fields.iter().map(|(name, ty)| (name.as_str(), *ty))
    }

    /// Check that `name` is declared as a number.
    pub(crate) fn require_number(&self, name: &str) -> Result<(), crate::SetupError> {
        match self.path(name) {
            None => Err(crate::SetupError::FieldMissing(name.to_string())),
            Some(FieldType::Number) => Ok(()),
            Some(_) => Err(crate::SetupError::FieldNotNumeric(name.to_string())),
        }
    }

    pub(crate) fn push_hook(&mut self, hook: PreSaveHook) {
        self.hooks.push(hook);
    }

    pub(crate) fn hooks(&self) -> &[PreSaveHook] {
        &self.hooks
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SetupError;

    #[test]
    fn new_schema_declares_object_id() {
        let schema = Schema::new();
        assert_eq!(schema.path(ID_FIELD), Some(FieldType::ObjectId));
        assert_eq!(schema.fields().count(), 1);
    }

    #[test]
    fn redeclaring_id_as_number_replaces_it() {
        let schema = Schema::new().field(ID_FIELD, FieldType::Number);
        assert_eq!(schema.path(ID_FIELD), Some(FieldType::Number));
    }

    #[test]
    fn require_number_distinguishes_missing_and_wrong_type() {
        let schema = Schema::new()
            .field("seq", FieldType::Number)
            .field("name", FieldType::String);
        assert_eq!(schema.require_number("seq"), Ok(()));
        assert_eq!(
            schema.require_number("name"),
            Err(SetupError::FieldNotNumeric("name".to_string()))
        );
        assert_eq!(
            schema.require_number("nope"),
            Err(SetupError::FieldMissing("nope".to_string()))
        );
    }
}
