//! Shared helpers for command handlers.

use std::path::Path;

use serde_json::Value;

use schoolsync_core::Document;

use crate::error::CliError;

/// Read and parse a JSON file.
pub fn read_json_file(path: &Path) -> Result<Value, CliError> {
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(|e| CliError::Validation {
        field: path.display().to_string(),
        reason: format!("invalid JSON: {e}"),
    })
}

/// Interpret an exported collection as documents.
///
/// Accepts either an array of objects that each carry an `"id"` field, or
/// an object keyed by document id. Array order is kept; object entries come
/// out sorted by id.
pub fn documents_from_export(value: Value, field: &str) -> Result<Vec<Document>, CliError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                let id = match item.get("id") {
                    Some(Value::String(s)) if !s.is_empty() => s.clone(),
                    Some(Value::Number(n)) => n.to_string(),
                    _ => {
                        return Err(CliError::Validation {
                            field: field.into(),
                            reason: format!("entry {index} has no \"id\""),
                        });
                    }
                };
                Ok(Document::from_value(id, item))
            })
            .collect(),
        Value::Object(map) => Ok(map
            .into_iter()
            .map(|(id, fields)| Document::from_value(id, fields))
            .collect()),
        _ => Err(CliError::Validation {
            field: field.into(),
            reason: "expected a JSON array or object".into(),
        }),
    }
}
