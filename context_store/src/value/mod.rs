//! Value tree - the typed payload stored in context nodes.
//!
//! Values are a tagged tree: scalars, ordered sequences, ordered mappings and
//! nested [`Content`] nodes. Paths are navigated explicitly and conversions to
//! Rust types report errors at the read site.

mod path;

pub use path::{split_path, PATH_SEPARATOR};
pub(crate) use path::{insert, insert_below, lookup, remove};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

use crate::content::Content;
use crate::error::ContentError;

/// Ordered mapping from keys to values.
pub type Map = BTreeMap<String, Value>;

/// A node in the value tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<Value>),
    Object(Map),
    /// A nested context node owned by this value.
    Content(Box<Content>),
}

impl Value {
    /// Convert any serializable type into a value tree.
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self, ContentError> {
        Ok(serde_json::to_value(value)?.into())
    }

    /// Parse strings holding a JSON object into a mapping.
    ///
    /// Every other value, including strings that are valid JSON scalars or
    /// arrays, is returned unchanged.
    pub fn structuralize(self) -> Self {
        match self {
            Value::String(text) => {
                match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&text) {
                    Ok(object) => Value::from(serde_json::Value::Object(object)),
                    Err(_) => Value::String(text),
                }
            }
            other => other,
        }
    }

    /// Name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
            Value::Content(_) => "content",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_content(&self) -> Option<&Content> {
        match self {
            Value::Content(content) => Some(content),
            _ => None,
        }
    }

    /// Read the value at a dot path below this value.
    ///
    /// Mappings are navigated by key, sequences by numeric index and nested
    /// content through its own property lookup (including its predecessors).
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => lookup(map, path),
            Value::Array(items) => {
                let (head, rest) = split_path(path);
                let item = items.get(head.parse::<usize>().ok()?)?;
                match rest {
                    Some(rest) => item.get_path(rest),
                    None => Some(item),
                }
            }
            Value::Content(content) => content.property(path),
            _ => None,
        }
    }

    /// Convert into the canonical JSON representation.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Content(content) => content.to_json_value(),
        }
    }

    /// Deserialize this value into a typed structure.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.to_json())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::String(s) => write!(f, "{}", s),
            Value::Content(content) => write!(f, "{}", content),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Content(content) => content.serialize(serializer),
            other => other.to_json().serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        value.to_json()
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Number(value.into())
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize);

impl From<f64> for Value {
    /// Non-finite floats have no JSON representation and become `Null`.
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::from(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Object(value)
    }
}

impl From<Content> for Value {
    fn from(value: Content) -> Self {
        Value::Content(Box::new(value))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structuralize_json_object() {
        let value = Value::from(r#"{"testVal": 5}"#).structuralize();
        assert_eq!(value.get_path("testVal"), Some(&Value::from(5)));
    }

    #[test]
    fn test_structuralize_keeps_scalars() {
        assert_eq!(Value::from("42").structuralize(), Value::from("42"));
        assert_eq!(Value::from("true").structuralize(), Value::from("true"));
        assert_eq!(Value::from("[1, 2]").structuralize(), Value::from("[1, 2]"));
        assert_eq!(Value::from("{not json").structuralize(), Value::from("{not json"));
    }

    #[test]
    fn test_from_serializable() {
        #[derive(Serialize)]
        struct Sample {
            test: i32,
            bla: String,
        }

        let value = Value::from_serializable(&Sample {
            test: 10,
            bla: "blubb".into(),
        })
        .unwrap();

        assert_eq!(value.get_path("test").and_then(Value::as_i64), Some(10));
        assert_eq!(value.get_path("bla").and_then(Value::as_str), Some("blubb"));
    }

    #[test]
    fn test_array_navigation() {
        let value = Value::from(json!({"list": [{"dt": 1}, {"dt": 2}]}));
        assert_eq!(value.get_path("list.1.dt"), Some(&Value::from(2)));
        assert!(value.get_path("list.7.dt").is_none());
        assert!(value.get_path("list.x").is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::from("plain").to_string(), "plain");
        assert_eq!(Value::from(5).to_string(), "5");
        assert_eq!(Value::from(json!({"a": 1})).to_string(), r#"{"a":1}"#);
    }

    #[test]
    fn test_non_finite_float_is_null() {
        assert!(Value::from(f64::NAN).is_null());
        assert_eq!(Value::from(1.5).as_f64(), Some(1.5));
    }

    #[test]
    fn test_deserialize_into() {
        let value = Value::from(json!({"latitude": 48.1, "longitude": 11.5}));

        #[derive(Deserialize)]
        struct Location {
            latitude: f64,
            longitude: f64,
        }

        let location: Location = value.deserialize_into().unwrap();
        assert!((location.latitude - 48.1).abs() < 1e-9);
        assert!((location.longitude - 11.5).abs() < 1e-9);

        assert!(Value::from("text").deserialize_into::<Location>().is_err());
    }
}
