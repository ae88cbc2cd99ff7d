//! Flat annotation records.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;

/// Ordered field name to cell value mapping.
///
/// Field order is insertion order and becomes the output column order.
/// Setting an existing field replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationRecord {
    fields: Vec<(String, Value)>,
}

impl AnnotationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Field names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Number of fields with a non-null value
    pub fn populated(&self) -> usize {
        self.fields.iter().filter(|(_, v)| !v.is_null()).count()
    }
}

impl Serialize for AnnotationRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Text for a table cell; null becomes the empty string.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
