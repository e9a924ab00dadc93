//! Opaque payload values carried by infections.
//!
//! The gossip layer never inspects values; it only moves them between
//! stores. [`Value`] is a closed tagged union so any node can decode and
//! re-encode a payload without knowing what the application put in it.
//!
//! The JSON view reserves [`TAG_KEY`] and [`DATA_KEY`]: an object with
//! exactly those two keys, a string tag and an array of bytes is read back
//! as [`Value::Bytes`] or [`Value::Tagged`], never as a map.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Application data disseminated by an infection: key to opaque value.
pub type Payload = BTreeMap<String, Value>;

/// JSON key marking an escaped value when converting to `serde_json`.
pub const TAG_KEY: &str = "$tag";

/// JSON key holding the escaped bytes when converting to `serde_json`.
pub const DATA_KEY: &str = "$data";

/// Tag used for [`Value::Bytes`] in the JSON escape form.
const BYTES_TAG: &str = "bytes";

/// A payload value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer above `i64::MAX`
    UInt(u64),
    /// Floating point number
    Float(f64),
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Ordered sequence
    List(Vec<Value>),
    /// Nested mapping
    Map(BTreeMap<String, Value>),
    /// Escape hatch for values with no native representation: an
    /// application-defined type tag plus its own encoding of the value.
    Tagged {
        /// Application type tag
        tag: String,
        /// Application-encoded bytes
        data: Vec<u8>,
    },
}

impl Value {
    /// Build a tagged value.
    pub fn tagged(tag: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Value::Tagged {
            tag: tag.into(),
            data: data.into(),
        }
    }

    /// Borrow the text, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value, if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Convert to JSON.
    ///
    /// `Bytes` and `Tagged` become `{"$tag": .., "$data": [..]}` objects,
    /// which [`From<serde_json::Value>`] turns back into the same shape.
    /// Non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::UInt(u) => Json::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Text(s) => Json::String(s.clone()),
            Value::Bytes(bytes) => escaped(BYTES_TAG, bytes),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Value::Tagged { tag, data } => escaped(tag, data),
        }
    }
}

fn escaped(tag: &str, data: &[u8]) -> serde_json::Value {
    let mut obj = serde_json::Map::new();
    obj.insert(TAG_KEY.to_string(), serde_json::Value::from(tag));
    obj.insert(DATA_KEY.to_string(), serde_json::Value::from(data.to_vec()));
    serde_json::Value::Object(obj)
}

/// Recognise the `{"$tag", "$data"}` escape form.
fn unescape(obj: &serde_json::Map<String, serde_json::Value>) -> Option<Value> {
    if obj.len() != 2 {
        return None;
    }
    let tag = obj.get(TAG_KEY)?.as_str()?;
    let data = obj
        .get(DATA_KEY)?
        .as_array()?
        .iter()
        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect::<Option<Vec<u8>>>()?;

    if tag == BYTES_TAG {
        Some(Value::Bytes(data))
    } else {
        Some(Value::tagged(tag, data))
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Json::String(s) => Value::Text(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(obj) => match unescape(&obj) {
                Some(value) => value,
                None => Value::Map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect()),
            },
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        match i64::try_from(u) {
            Ok(i) => Value::Int(i),
            Err(_) => Value::UInt(u),
        }
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Map(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_nested_structure_survives() {
        let original = json!({
            "name": "alpha",
            "count": 3,
            "ratio": 0.5,
            "tags": ["a", "b", null],
            "nested": {"ok": true}
        });

        let value = Value::from(original.clone());
        assert_eq!(value.to_json(), original);
    }

    #[test]
    fn bytes_escape_through_json() {
        let value = Value::Bytes(vec![0, 1, 255]);
        let json = value.to_json();

        assert_eq!(json[TAG_KEY], "bytes");
        assert_eq!(Value::from(json), value);
    }

    #[test]
    fn tagged_escape_through_json() {
        let value = Value::tagged("uuid", vec![7u8; 16]);
        assert_eq!(Value::from(value.to_json()), value);
    }

    #[test]
    fn escape_form_requires_byte_data() {
        let json = json!({"$tag": "x", "$data": [1, 300]});
        assert!(matches!(Value::from(json), Value::Map(_)));
    }

    #[test]
    fn objects_with_extra_keys_stay_maps() {
        let json = json!({"$tag": "x", "$data": [1], "other": 1});
        assert!(matches!(Value::from(json), Value::Map(_)));
    }

    #[test]
    fn large_unsigned_keeps_precision() {
        let json = json!(u64::MAX);
        let value = Value::from(json.clone());

        assert_eq!(value, Value::UInt(u64::MAX));
        assert_eq!(value.to_json(), json);
        assert_eq!(value.as_i64(), None);
        assert_eq!(Value::from(7u64), Value::Int(7));
    }

    #[test]
    fn reserved_keys_are_read_as_escape() {
        let json = json!({"$tag": "user", "$data": [1, 2]});
        assert_eq!(Value::from(json), Value::tagged("user", vec![1u8, 2]));
    }

    #[test]
    fn non_finite_float_becomes_null() {
        assert_eq!(Value::Float(f64::INFINITY).to_json(), serde_json::Value::Null);
    }

    #[test]
    fn primitive_conversions() {
        assert_eq!(Value::from("v").as_str(), Some("v"));
        assert_eq!(Value::from(2i64).as_i64(), Some(2));
        assert_eq!(Value::from(2i32), Value::Int(2));
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(vec![1u8, 2]), Value::Bytes(vec![1, 2]));
    }

    #[test]
    fn msgpack_preserves_every_variant() {
        let mut map = BTreeMap::new();
        map.insert("inner".to_string(), Value::Int(-4));
        let value = Value::List(vec![
            Value::Null,
            Value::Bool(false),
            Value::Float(1.25),
            Value::UInt(u64::MAX),
            Value::Text("t".into()),
            Value::Bytes(vec![9]),
            Value::Map(map),
            Value::tagged("decimal", b"1.10".to_vec()),
        ]);

        let bytes = rmp_serde::to_vec(&value).unwrap();
        let restored: Value = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(restored, value);
    }
}
