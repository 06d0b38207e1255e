// ── Raw remote documents ──
//
// A Document is what the remote store hands us: an id plus a flat map of
// loosely-typed fields. The accessors here never fail; a missing or
// mistyped field reads as the type's default so one bad document can't
// take down a whole collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::entity_id::EntityId;

/// Field map of a single document.
pub type Fields = Map<String, Value>;

/// One document as delivered by the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: EntityId,
    #[serde(default)]
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<EntityId>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Build a document from a JSON object. Non-object values yield an
    /// empty field map.
    pub fn from_value(id: impl Into<EntityId>, value: Value) -> Self {
        let fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self::new(id, fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// String field, or `""` when missing. Numbers and bools are rendered.
    pub fn string(&self, field: &str) -> String {
        self.opt_string(field).unwrap_or_default()
    }

    pub fn opt_string(&self, field: &str) -> Option<String> {
        match self.fields.get(field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// Integer field, or `0`. Accepts numeric strings and truncates floats.
    pub fn int(&self, field: &str) -> i64 {
        self.opt_int(field).unwrap_or(0)
    }

    #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
    pub fn opt_int(&self, field: &str) -> Option<i64> {
        match self.fields.get(field)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Non-negative integer field clamped into `u32`.
    pub fn count(&self, field: &str) -> u32 {
        u32::try_from(self.int(field).max(0)).unwrap_or(u32::MAX)
    }

    pub fn float(&self, field: &str) -> f64 {
        match self.fields.get(field) {
            Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn boolean(&self, field: &str) -> bool {
        match self.fields.get(field) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// Timestamp field. Accepts RFC 3339 strings or epoch milliseconds.
    pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        match self.fields.get(field)? {
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        }
    }

    /// Array-of-strings field; non-string elements are skipped.
    pub fn string_list(&self, field: &str) -> Vec<String> {
        match self.fields.get(field) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_owned))
                .collect(),
            _ => Vec::new(),
        }
    }
}
