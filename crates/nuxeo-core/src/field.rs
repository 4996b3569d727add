//! Polymorphic JSON values
//!
//! A [`Field`] carries a JSON value whose type is not known until it is
//! read: document properties, workflow variables, directory fields and
//! context parameters all use it. The raw bytes are kept as decoded so that
//! an untouched field is re-serialized verbatim; each typed accessor tries
//! one structural interpretation and reports a decode error on mismatch.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::value::RawValue;

use crate::error::{CoreError, Result};
use crate::time::Iso8601Time;

/// Structural kind of a [`Field`], derived from its first token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Null,
    Bool,
    Number,
    String,
    List,
    Object,
}

/// A JSON value interpreted lazily through typed accessors.
#[derive(Clone)]
pub struct Field {
    raw: Box<RawValue>,
}

impl Field {
    /// The `null` literal
    pub fn null() -> Self {
        Self {
            raw: RawValue::NULL.to_owned(),
        }
    }

    /// Wrap JSON text. The text must be a single well-formed JSON value.
    pub fn from_json(text: impl Into<String>) -> Result<Self> {
        let raw = RawValue::from_string(text.into())?;
        Ok(Self { raw })
    }

    /// Serialize any value into a field.
    pub fn from_value<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let raw = serde_json::value::to_raw_value(value)?;
        Ok(Self { raw })
    }

    /// The stored JSON text, exactly as decoded or constructed
    pub fn as_json(&self) -> &str {
        self.raw.get()
    }

    pub fn kind(&self) -> FieldKind {
        match self.raw.get().trim_start().as_bytes().first() {
            Some(b'n') | None => FieldKind::Null,
            Some(b't') | Some(b'f') => FieldKind::Bool,
            Some(b'"') => FieldKind::String,
            Some(b'[') => FieldKind::List,
            Some(b'{') => FieldKind::Object,
            Some(_) => FieldKind::Number,
        }
    }

    pub fn is_null(&self) -> bool {
        self.kind() == FieldKind::Null
    }

    pub fn string(&self) -> Result<Option<String>> {
        self.decode_as("string")
    }

    pub fn strings(&self) -> Result<Vec<String>> {
        self.decode_list_as("list of strings")
    }

    pub fn int(&self) -> Result<Option<i64>> {
        self.decode_as("integer")
    }

    pub fn ints(&self) -> Result<Vec<i64>> {
        self.decode_list_as("list of integers")
    }

    pub fn float(&self) -> Result<Option<f64>> {
        self.decode_as("float")
    }

    pub fn floats(&self) -> Result<Vec<f64>> {
        self.decode_list_as("list of floats")
    }

    pub fn bool(&self) -> Result<Option<bool>> {
        self.decode_as("boolean")
    }

    pub fn bools(&self) -> Result<Vec<bool>> {
        self.decode_list_as("list of booleans")
    }

    pub fn time(&self) -> Result<Option<Iso8601Time>> {
        self.string()?.map(|s| Iso8601Time::parse(&s)).transpose()
    }

    pub fn times(&self) -> Result<Vec<Iso8601Time>> {
        self.strings()?
            .iter()
            .map(|s| Iso8601Time::parse(s))
            .collect()
    }

    /// Decode into a caller-supplied shape.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(self.raw.get()).map_err(|e| {
            CoreError::Decode(format!(
                "field {} does not match {}: {}",
                self.raw.get(),
                std::any::type_name::<T>(),
                e
            ))
        })
    }

    /// Decode a JSON list element-wise into a caller-supplied shape.
    /// `null` yields an empty list.
    pub fn decode_list<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        if self.is_null() {
            return Ok(Vec::new());
        }
        self.decode()
    }

    fn decode_as<T: DeserializeOwned>(&self, expected: &str) -> Result<Option<T>> {
        serde_json::from_str::<Option<T>>(self.raw.get()).map_err(|_| self.mismatch(expected))
    }

    fn decode_list_as<T: DeserializeOwned>(&self, expected: &str) -> Result<Vec<T>> {
        if self.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_str::<Vec<T>>(self.raw.get()).map_err(|_| self.mismatch(expected))
    }

    fn mismatch(&self, expected: &str) -> CoreError {
        CoreError::Decode(format!("field {} is not a {}", self.raw.get(), expected))
    }
}

// Primitive conversions cannot fail to serialize; fall back to null to keep
// the `From` impls infallible.
fn encode<T: Serialize + ?Sized>(value: &T) -> Field {
    Field::from_value(value).unwrap_or_else(|_| Field::null())
}

impl Default for Field {
    fn default() -> Self {
        Self::null()
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.raw.get() == other.raw.get()
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Field({})", self.raw.get())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.raw.get())
    }
}

impl From<&str> for Field {
    fn from(value: &str) -> Self {
        encode(value)
    }
}

impl From<String> for Field {
    fn from(value: String) -> Self {
        encode(&value)
    }
}

impl From<i64> for Field {
    fn from(value: i64) -> Self {
        encode(&value)
    }
}

impl From<f64> for Field {
    fn from(value: f64) -> Self {
        encode(&value)
    }
}

impl From<bool> for Field {
    fn from(value: bool) -> Self {
        encode(&value)
    }
}

impl From<Iso8601Time> for Field {
    fn from(value: Iso8601Time) -> Self {
        encode(&value)
    }
}

impl From<Vec<String>> for Field {
    fn from(value: Vec<String>) -> Self {
        encode(&value)
    }
}

impl From<serde_json::Value> for Field {
    fn from(value: serde_json::Value) -> Self {
        encode(&value)
    }
}

impl<T: Into<Field>> From<Option<T>> for Field {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Field {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Ok(Self { raw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn field(json: &str) -> Field {
        Field::from_json(json).unwrap()
    }

    #[test]
    fn test_round_trip_preserves_bytes() {
        for json in [
            r#"null"#,
            r#"true"#,
            r#"-12"#,
            r#"3.25e2"#,
            r#""dc:title""#,
            r#"["a","b"]"#,
            r#"{"b":1,"a":[true,null]}"#,
        ] {
            let f: Field = serde_json::from_str(json).unwrap();
            assert_eq!(serde_json::to_string(&f).unwrap(), json);
        }
    }

    #[test]
    fn test_round_trip_inside_map_keeps_member_order() {
        let json = r#"{"dc:title":"Doc","dc:subjects":["x","y"],"my:count":7}"#;
        let props: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json).unwrap();
        let fields: BTreeMap<String, Field> = serde_json::from_str(json).unwrap();
        assert_eq!(fields.len(), props.len());
        assert_eq!(fields["my:count"].int().unwrap(), Some(7));
    }

    #[test]
    fn test_kind_detection() {
        assert_eq!(field("null").kind(), FieldKind::Null);
        assert_eq!(field("false").kind(), FieldKind::Bool);
        assert_eq!(field("1.5").kind(), FieldKind::Number);
        assert_eq!(field("-1").kind(), FieldKind::Number);
        assert_eq!(field("\"x\"").kind(), FieldKind::String);
        assert_eq!(field("[]").kind(), FieldKind::List);
        assert_eq!(field("{}").kind(), FieldKind::Object);
    }

    #[test]
    fn test_scalar_accessors() {
        assert_eq!(field("\"hello\"").string().unwrap(), Some("hello".to_string()));
        assert_eq!(field("42").int().unwrap(), Some(42));
        assert_eq!(field("42").float().unwrap(), Some(42.0));
        assert_eq!(field("0.5").float().unwrap(), Some(0.5));
        assert_eq!(field("true").bool().unwrap(), Some(true));
    }

    #[test]
    fn test_null_is_none_and_empty() {
        let f = Field::null();
        assert!(f.is_null());
        assert_eq!(f.string().unwrap(), None);
        assert_eq!(f.int().unwrap(), None);
        assert_eq!(f.time().unwrap(), None);
        assert!(f.strings().unwrap().is_empty());
        assert!(f.decode_list::<String>().unwrap().is_empty());
    }

    #[test]
    fn test_mismatch_is_decode_error() {
        assert!(matches!(field("\"x\"").int(), Err(CoreError::Decode(_))));
        assert!(matches!(field("1.5").int(), Err(CoreError::Decode(_))));
        assert!(matches!(field("1").string(), Err(CoreError::Decode(_))));
        assert!(matches!(field("[1,\"a\"]").ints(), Err(CoreError::Decode(_))));
        assert!(matches!(field("\"yesterday\"").time(), Err(CoreError::Decode(_))));
    }

    #[test]
    fn test_list_accessors() {
        assert_eq!(field("[\"a\",\"b\"]").strings().unwrap(), vec!["a", "b"]);
        assert_eq!(field("[1,2,3]").ints().unwrap(), vec![1, 2, 3]);
        assert_eq!(field("[1.5,2]").floats().unwrap(), vec![1.5, 2.0]);
        assert_eq!(field("[true,false]").bools().unwrap(), vec![true, false]);

        let times = field("[\"2020-01-01T00:00:00.000Z\"]").times().unwrap();
        assert_eq!(times[0].to_string(), "2020-01-01T00:00:00.000Z");
    }

    #[test]
    fn test_accessors_do_not_mutate() {
        let f = field("{\"name\":\"n\",\"size\":3}");
        let _ = f.int();
        let _ = f.strings();
        assert_eq!(f.as_json(), "{\"name\":\"n\",\"size\":3}");
    }

    #[test]
    fn test_structural_decode() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct Item {
            name: String,
            size: u32,
        }

        let f = field("{\"name\":\"n\",\"size\":3}");
        assert_eq!(
            f.decode::<Item>().unwrap(),
            Item {
                name: "n".to_string(),
                size: 3
            }
        );

        let list = field("[{\"name\":\"a\",\"size\":1},{\"name\":\"b\",\"size\":2}]");
        let items: Vec<Item> = list.decode_list().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].name, "b");
    }

    #[test]
    fn test_typed_constructors() {
        assert_eq!(Field::from("x").as_json(), "\"x\"");
        assert_eq!(Field::from(3i64).as_json(), "3");
        assert_eq!(Field::from(true).as_json(), "true");
        assert_eq!(Field::from(None::<String>).as_json(), "null");
        let t = Iso8601Time::parse("2020-01-01T00:00:00Z").unwrap();
        assert_eq!(Field::from(t).as_json(), "\"2020-01-01T00:00:00.000Z\"");
    }

    #[test]
    fn test_from_json_rejects_invalid_text() {
        assert!(Field::from_json("{not json").is_err());
    }
}
