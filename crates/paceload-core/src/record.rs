use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A unit of data the writer hands to a sink.
///
/// The writer never looks inside a record. It only needs the natural key for
/// logging and failure reports; sinks use the same key to upsert.
pub trait Record: Send + Sync + fmt::Debug {
    fn natural_key(&self) -> &str;
}

/// A typed row with a natural key and an ordered set of named fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    key_field: String,
    key: String,
    fields: Map<String, Value>,
}

impl Row {
    pub fn new(key_field: impl Into<String>, key: impl Into<String>) -> Self {
        let key_field = key_field.into();
        let key = key.into();
        let mut fields = Map::new();
        fields.insert(key_field.clone(), Value::String(key.clone()));

        Self {
            key_field,
            key,
            fields,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set a field. Setting the key field also updates the natural key,
    /// using the JSON text of non-string values.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();

        if name == self.key_field {
            self.key = match value {
                Value::String(ref key) => key.clone(),
                ref other => other.to_string(),
            };
        }

        self.fields.insert(name, value);
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// The row's fields as a JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

impl Record for Row {
    fn natural_key(&self) -> &str {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_creation() {
        let row = Row::new("title", "Heat").with_field("vote_count", 1200);

        assert_eq!(row.natural_key(), "Heat");
        assert_eq!(row.get("title"), Some(&json!("Heat")));
        assert_eq!(row.get("vote_count"), Some(&json!(1200)));
    }

    #[test]
    fn test_insert_key_field_updates_key() {
        let mut row = Row::new("title", "Heat");
        row.insert("title", "Ronin");

        assert_eq!(row.natural_key(), "Ronin");
    }

    #[test]
    fn test_non_string_key_value_is_stringified() {
        let mut row = Row::new("id", "7");
        row.insert("id", 42);

        assert_eq!(row.key_field(), "id");
        assert_eq!(row.natural_key(), "42");
        assert_eq!(row.get("id"), Some(&json!(42)));
    }

    #[test]
    fn test_field_order_is_preserved() {
        let row = Row::new("title", "Heat")
            .with_field("overview", "A heist")
            .with_field("popularity", 12.5);

        let names: Vec<&str> = row.column_names().collect();
        assert_eq!(names, vec!["title", "overview", "popularity"]);
        assert_eq!(
            row.to_json(),
            json!({"title": "Heat", "overview": "A heist", "popularity": 12.5})
        );
    }
}
