use serde_json::Value;

use crate::document::Document;
use crate::error::{SaveError, SetupError};
use crate::options::{AutoIncrementSimpleOptions, DEFAULT_INCREMENT};
use crate::schema::{PreSaveHook, Schema};

/// Adds a fixed step to numeric fields on every save of an existing record.
#[derive(Debug, Clone)]
pub struct AutoIncrementSimple {
    /// (field, increment) in enrollment order.
    fields: Vec<(String, i64)>,
}

/// Attach the simple incrementer to `schema`.
///
/// Every field must be declared as a number. Fails without attaching anything
/// if no fields are given.
pub fn auto_increment_simple(
    schema: &mut Schema,
    options: impl IntoIterator<Item = AutoIncrementSimpleOptions>,
) -> Result<(), SetupError> {
    let options: Vec<AutoIncrementSimpleOptions> = options.into_iter().collect();
    tracing::info!(fields = options.len(), "initializing simple auto-increment");

    if options.is_empty() {
        return Err(SetupError::NoFields);
    }

    let mut fields = Vec::with_capacity(options.len());
    for opt in options {
        schema.require_number(&opt.field)?;
        let by = opt.increment_by.unwrap_or_else(|| {
            tracing::info!(
                field = %opt.field,
                "no increment given, defaulting to {DEFAULT_INCREMENT}"
            );
            DEFAULT_INCREMENT
        });
        fields.push((opt.field, by));
    }

    schema.push_hook(PreSaveHook::Simple(AutoIncrementSimple { fields }));
    Ok(())
}

impl AutoIncrementSimple {
    pub(crate) fn pre_save(&self, model_name: &str, doc: &mut Document) -> Result<(), SaveError> {
        if doc.is_new() {
            return Ok(());
        }

        tracing::debug!(model = model_name, "incrementing simple fields");
        for (field, by) in &self.fields {
            let next = match doc.get(field) {
                None | Some(Value::Null) => Value::from(*by),
                Some(Value::Number(n)) => match (n.as_i64(), n.as_f64()) {
                    (Some(current), _) => current
                        .checked_add(*by)
                        .map(Value::from)
                        .ok_or_else(|| SaveError::FieldOverflow(field.clone()))?,
                    (None, Some(current)) => {
                        let sum = current + *by as f64;
                        if !sum.is_finite() {
                            return Err(SaveError::FieldOverflow(field.clone()));
                        }
                        Value::from(sum)
                    }
                    (None, None) => return Err(SaveError::FieldOverflow(field.clone())),
                },
                Some(_) => return Err(SaveError::FieldNotNumeric(field.clone())),
            };
            tracing::debug!(field = %field, by, "incrementing");
            doc.set(field.as_str(), next);
        }
        Ok(())
    }
}
