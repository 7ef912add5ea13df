//! serde_json <-> Firestore value conversion.
//!
//! Documents in this system are deeply nested (content bundles, chat
//! histories, quiz questions), so models are serialized through serde_json
//! and bridged to Firestore's value model here instead of mapping fields by
//! hand.

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{ArrayValue, Document, MapValue, Value};

/// Convert a serde_json value to a Firestore value.
pub fn json_to_value(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::NullValue(()),
        JsonValue::Bool(b) => Value::BooleanValue(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::IntegerValue(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Value::IntegerValue(u.to_string())
            } else {
                Value::DoubleValue(n.as_f64().unwrap_or(0.0))
            }
        }
        JsonValue::String(s) => Value::StringValue(s.clone()),
        JsonValue::Array(items) => Value::ArrayValue(ArrayValue {
            values: Some(items.iter().map(json_to_value).collect()),
        }),
        JsonValue::Object(map) => Value::MapValue(MapValue {
            fields: Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), json_to_value(v)))
                    .collect(),
            ),
        }),
    }
}

/// Convert a Firestore value back to serde_json.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::NullValue(()) => JsonValue::Null,
        Value::BooleanValue(b) => JsonValue::Bool(*b),
        Value::IntegerValue(s) => s
            .parse::<i64>()
            .map(JsonValue::from)
            .unwrap_or_else(|_| JsonValue::String(s.clone())),
        Value::DoubleValue(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        // Timestamps come back as RFC 3339 strings, which chrono's serde
        // deserializes directly.
        Value::TimestampValue(s) => JsonValue::String(s.clone()),
        Value::StringValue(s) => JsonValue::String(s.clone()),
        Value::BytesValue(s) => JsonValue::String(s.clone()),
        Value::ReferenceValue(s) => JsonValue::String(s.clone()),
        Value::GeoPointValue(p) => serde_json::json!({
            "latitude": p.latitude,
            "longitude": p.longitude,
        }),
        Value::ArrayValue(arr) => JsonValue::Array(
            arr.values
                .as_deref()
                .unwrap_or_default()
                .iter()
                .map(value_to_json)
                .collect(),
        ),
        Value::MapValue(map) => JsonValue::Object(
            map.fields
                .as_ref()
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), value_to_json(v)))
                        .collect()
                })
                .unwrap_or_default(),
        ),
    }
}

/// Serialize a model into Firestore document fields.
pub fn to_document_fields<T: Serialize>(model: &T) -> FirestoreResult<HashMap<String, Value>> {
    let json = serde_json::to_value(model)?;
    match json {
        JsonValue::Object(map) => Ok(map
            .iter()
            .map(|(k, v)| (k.clone(), json_to_value(v)))
            .collect()),
        other => Err(FirestoreError::serialization(format!(
            "Expected a JSON object for document fields, got {}",
            other
        ))),
    }
}

/// Deserialize a Firestore document into a model.
pub fn from_document<T: DeserializeOwned>(doc: &Document) -> FirestoreResult<T> {
    let fields = doc.fields.as_ref().ok_or_else(|| {
        FirestoreError::serialization("Document has no fields".to_string())
    })?;
    from_fields(fields)
}

/// Deserialize Firestore fields into a model.
pub fn from_fields<T: DeserializeOwned>(fields: &HashMap<String, Value>) -> FirestoreResult<T> {
    let json = JsonValue::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), value_to_json(v)))
            .collect(),
    );
    Ok(serde_json::from_value(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Nested {
        name: String,
        tags: Vec<String>,
        score: f64,
        count: u64,
        enabled: bool,
        inner: Option<Inner>,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Inner {
        value: i64,
    }

    #[test]
    fn test_nested_model_roundtrip() {
        let model = Nested {
            name: "graphs".to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
            score: 0.75,
            count: 3,
            enabled: true,
            inner: Some(Inner { value: -4 }),
        };

        let fields = to_document_fields(&model).unwrap();
        let doc = Document::new(fields);
        let back: Nested = from_document(&doc).unwrap();
        assert_eq!(back, model);
    }

    #[test]
    fn test_integer_stored_as_string() {
        let fields = to_document_fields(&serde_json::json!({"n": 42})).unwrap();
        assert!(matches!(fields.get("n"), Some(Value::IntegerValue(s)) if s == "42"));
    }

    #[test]
    fn test_timestamp_value_decodes_to_string() {
        let v = Value::TimestampValue("2024-01-15T00:00:00Z".to_string());
        assert_eq!(
            value_to_json(&v),
            JsonValue::String("2024-01-15T00:00:00Z".to_string())
        );
    }

    #[test]
    fn test_non_object_model_rejected() {
        let result = to_document_fields(&serde_json::json!([1, 2, 3]));
        assert!(matches!(
            result,
            Err(FirestoreError::SerializationError(_))
        ));
    }
}
