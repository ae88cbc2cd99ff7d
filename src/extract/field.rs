//! Defensive decoding of partially-shaped JSON fields.

use serde_json::{Map, Value};

/// Suffix marking a derived "length of list" field
pub const COUNT_SUFFIX: &str = "_count";

/// A response field decoded into one of three shapes.
///
/// Objects have no flat representation and decode as [`FieldValue::Missing`].
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Absent, null, or not representable in a flat record
    Missing,
    /// String, number, or boolean
    Scalar(Value),
    /// Array of values
    List(Vec<Value>),
}

impl FieldValue {
    /// Decode an optional JSON value.
    pub fn decode(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) | Some(Value::Object(_)) => FieldValue::Missing,
            Some(Value::Array(items)) => FieldValue::List(items.clone()),
            Some(scalar) => FieldValue::Scalar(scalar.clone()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Number of list elements; `None` unless this is a list.
    pub fn len(&self) -> Option<usize> {
        match self {
            FieldValue::List(items) => Some(items.len()),
            _ => None,
        }
    }

    /// Flatten to a value for one table cell.
    ///
    /// Lists are joined with `,`; nested structures inside a list are dropped.
    pub fn into_cell(self) -> Value {
        match self {
            FieldValue::Missing => Value::Null,
            FieldValue::Scalar(value) => value,
            FieldValue::List(items) => {
                let parts: Vec<String> = items.iter().filter_map(scalar_text).collect();
                if parts.is_empty() {
                    Value::Null
                } else {
                    Value::String(parts.join(","))
                }
            }
        }
    }
}

/// Text of a scalar, without JSON quoting.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Whether `object` can supply `key`, directly or as a count of its base list.
pub fn provides(object: &Map<String, Value>, key: &str) -> bool {
    if object.contains_key(key) {
        return true;
    }
    key.strip_suffix(COUNT_SUFFIX)
        .is_some_and(|base| !base.is_empty() && object.contains_key(base))
}

/// Project one configured key out of `object`.
///
/// A key present in the object is copied. Otherwise a key ending in
/// `_count` is the length of the list under its base name; if that field
/// is absent or not a list the result is `Missing`, never zero.
pub fn project(object: &Map<String, Value>, key: &str) -> FieldValue {
    if let Some(value) = object.get(key) {
        return FieldValue::decode(Some(value));
    }

    match key.strip_suffix(COUNT_SUFFIX) {
        Some(base) if !base.is_empty() => match FieldValue::decode(object.get(base)).len() {
            Some(n) => FieldValue::Scalar(Value::from(n)),
            None => FieldValue::Missing,
        },
        _ => FieldValue::Missing,
    }
}

/// First object in `value` able to supply every key in `keys`.
///
/// Accepts a list of objects (non-objects are skipped) or a single object.
pub fn find_colocated<'a, S: AsRef<str>>(
    value: &'a Value,
    keys: &[S],
) -> Option<&'a Map<String, Value>> {
    let satisfies = |object: &Map<String, Value>| keys.iter().all(|k| provides(object, k.as_ref()));

    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .find(|object| satisfies(*object)),
        Value::Object(object) if satisfies(object) => Some(object),
        _ => None,
    }
}

/// First object of a field that may be a list of objects or one object.
pub fn first_object(value: &Value) -> Option<&Map<String, Value>> {
    match value {
        Value::Array(items) => items.first().and_then(Value::as_object),
        Value::Object(object) => Some(object),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_decode_shapes() {
        assert_eq!(FieldValue::decode(None), FieldValue::Missing);
        assert_eq!(FieldValue::decode(Some(&Value::Null)), FieldValue::Missing);
        assert_eq!(FieldValue::decode(Some(&json!({"a": 1}))), FieldValue::Missing);
        assert_eq!(
            FieldValue::decode(Some(&json!("HIGH"))),
            FieldValue::Scalar(json!("HIGH"))
        );
        assert_eq!(
            FieldValue::decode(Some(&json!([1, 2]))),
            FieldValue::List(vec![json!(1), json!(2)])
        );
    }

    #[test]
    fn test_into_cell() {
        assert_eq!(FieldValue::Missing.into_cell(), Value::Null);
        assert_eq!(FieldValue::Scalar(json!(-1)).into_cell(), json!(-1));
        assert_eq!(
            FieldValue::List(vec![json!("missense_variant"), json!("splice_region_variant")])
                .into_cell(),
            json!("missense_variant,splice_region_variant")
        );
        assert_eq!(FieldValue::List(vec![]).into_cell(), Value::Null);
        assert_eq!(
            FieldValue::List(vec![json!({"db": "Pfam"})]).into_cell(),
            Value::Null
        );
    }

    #[test]
    fn test_project_count_suffix() {
        let obj = object(json!({"domains": [{"db": "Pfam"}, {"db": "Gene3D"}], "pubmed": 7}));
        assert_eq!(project(&obj, "domains_count"), FieldValue::Scalar(json!(2)));
        // Base field is not a list
        assert_eq!(project(&obj, "pubmed_count"), FieldValue::Missing);
        // Base field absent: omitted, not zero
        assert_eq!(project(&obj, "flags_count"), FieldValue::Missing);
        assert_eq!(project(&obj, "_count"), FieldValue::Missing);
    }

    #[test]
    fn test_project_literal_count_field_wins() {
        let obj = object(json!({"allele_count": 12, "allele": ["A"]}));
        assert_eq!(project(&obj, "allele_count"), FieldValue::Scalar(json!(12)));
    }

    #[test]
    fn test_find_colocated_in_list() {
        let colocated = json!([
            {"id": "COSV1", "somatic": 1},
            "junk",
            {"id": "rs699", "clin_sig_allele": "G:benign", "pubmed": [1, 2]},
            {"id": "rs700", "clin_sig_allele": "A:pathogenic", "pubmed": [3]}
        ]);
        let keys = ["id", "clin_sig_allele", "pubmed_count"];
        let found = find_colocated(&colocated, &keys).unwrap();
        assert_eq!(found.get("id"), Some(&json!("rs699")));
    }

    #[test]
    fn test_find_colocated_single_object() {
        let colocated = json!({"id": "rs699", "clin_sig_allele": "G:benign"});
        assert!(find_colocated(&colocated, &["id", "clin_sig_allele"]).is_some());
        assert!(find_colocated(&colocated, &["id", "pubmed_count"]).is_none());
    }

    #[test]
    fn test_find_colocated_other_shapes() {
        assert!(find_colocated(&json!("rs1"), &["id"]).is_none());
        assert!(find_colocated(&Value::Null, &["id"]).is_none());
        assert!(find_colocated(&json!([]), &["id"]).is_none());
    }

    #[test]
    fn test_first_object() {
        assert!(first_object(&json!([{"a": 1}, {"b": 2}])).unwrap().contains_key("a"));
        assert!(first_object(&json!({"a": 1})).is_some());
        assert!(first_object(&json!([])).is_none());
        assert!(first_object(&json!(["x"])).is_none());
    }
}
