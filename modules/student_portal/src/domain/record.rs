//! Raw rows of the user data table and the shape normalization applied to
//! their loosely-typed fields.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::contract::model::JsonObject;

/// One row as stored upstream. Columns are not enforced, so the row is kept
/// as a JSON object and read through typed accessors.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRecord(JsonObject);

impl UserRecord {
    pub fn new(fields: JsonObject) -> Self {
        Self(fields)
    }

    /// Rows that are not JSON objects are rejected.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn as_object(&self) -> &JsonObject {
        &self.0
    }

    /// Raw `user_id` column, `Value::Null` when missing.
    pub fn user_id(&self) -> Value {
        self.0.get("user_id").cloned().unwrap_or(Value::Null)
    }

    /// `user_id` as text; numeric ids are rendered in decimal.
    pub fn user_id_text(&self) -> Option<String> {
        match self.0.get("user_id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// `profile`, only when it is an object.
    pub fn profile(&self) -> Option<&JsonObject> {
        self.0.get("profile").and_then(Value::as_object)
    }

    pub fn field(&self, name: &str) -> FieldValue<'_> {
        FieldValue::from_raw(self.0.get(name))
    }

    /// Non-empty `updated_at` string.
    pub fn updated_at(&self) -> Option<&str> {
        self.0
            .get("updated_at")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

impl From<JsonObject> for UserRecord {
    fn from(fields: JsonObject) -> Self {
        Self::new(fields)
    }
}

/// A collection field after shape normalization.
///
/// Upstream rows hold either nothing, a lone item or a list under the same
/// column; everything downstream works on [`FieldValue::items`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Absent,
    One(&'a Value),
    Many(&'a [Value]),
}

impl<'a> FieldValue<'a> {
    pub fn from_raw(raw: Option<&'a Value>) -> Self {
        match raw {
            None | Some(Value::Null) => FieldValue::Absent,
            Some(Value::Array(items)) => FieldValue::Many(items),
            Some(other) => FieldValue::One(other),
        }
    }

    pub fn items(self) -> &'a [Value] {
        match self {
            FieldValue::Absent => &[],
            FieldValue::One(v) => std::slice::from_ref(v),
            FieldValue::Many(items) => items,
        }
    }

    pub fn is_absent(self) -> bool {
        matches!(self, FieldValue::Absent)
    }
}
