//! Typed values for entry payloads.
//!
//! [`Value`] is the owned, ergonomic form of the wire-level
//! [`EntryValue`](crate::proto::entry::EntryValue) union. Conversions in
//! both directions preserve the kind exactly; an absent wire value maps to
//! `None` rather than to any default.

use std::collections::HashMap;

use crate::proto::entry::{
    entry_value::Kind, BoolList, DoubleList, EntryValue, IntList, StringList, StringMap,
};

/// One payload value, exactly one kind at a time.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// UTF-8 string.
    String(String),
    /// Double-precision float.
    Double(f64),
    /// 64-bit signed integer.
    Int(i64),
    /// Boolean.
    Bool(bool),
    /// Ordered list of strings.
    StringList(Vec<String>),
    /// Ordered list of doubles.
    DoubleList(Vec<f64>),
    /// Ordered list of integers.
    IntList(Vec<i64>),
    /// Ordered list of booleans.
    BoolList(Vec<bool>),
    /// String-to-string mapping.
    Map(HashMap<String, String>),
    /// JSON-like document. All numbers are doubles; integers written into a
    /// document come back widened.
    Json(prost_types::Struct),
    /// Opaque bytes.
    Bytes(Vec<u8>),
}

impl Value {
    /// Converts to the wire union.
    pub fn into_wire(self) -> EntryValue {
        let kind = match self {
            Self::String(v) => Kind::StringValue(v),
            Self::Double(v) => Kind::DoubleValue(v),
            Self::Int(v) => Kind::IntValue(v),
            Self::Bool(v) => Kind::BoolValue(v),
            Self::StringList(values) => Kind::StringList(StringList { values }),
            Self::DoubleList(values) => Kind::DoubleList(DoubleList { values }),
            Self::IntList(values) => Kind::IntList(IntList { values }),
            Self::BoolList(values) => Kind::BoolList(BoolList { values }),
            Self::Map(values) => Kind::StringMap(StringMap { values }),
            Self::Json(document) => Kind::JsonValue(document),
            Self::Bytes(v) => Kind::BytesValue(v),
        };
        EntryValue { kind: Some(kind) }
    }

    /// Converts from the wire union. `None` when the value is absent or has
    /// no kind set.
    pub fn from_wire(wire: Option<EntryValue>) -> Option<Self> {
        let kind = wire?.kind?;
        Some(match kind {
            Kind::StringValue(v) => Self::String(v),
            Kind::DoubleValue(v) => Self::Double(v),
            Kind::IntValue(v) => Self::Int(v),
            Kind::BoolValue(v) => Self::Bool(v),
            Kind::StringList(list) => Self::StringList(list.values),
            Kind::DoubleList(list) => Self::DoubleList(list.values),
            Kind::IntList(list) => Self::IntList(list.values),
            Kind::BoolList(list) => Self::BoolList(list.values),
            Kind::StringMap(map) => Self::Map(map.values),
            Kind::JsonValue(document) => Self::Json(document),
            Kind::BytesValue(v) => Self::Bytes(v),
        })
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::StringList(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::DoubleList(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Self::IntList(v)
    }
}

impl From<Vec<bool>> for Value {
    fn from(v: Vec<bool>) -> Self {
        Self::BoolList(v)
    }
}

impl From<HashMap<String, String>> for Value {
    fn from(v: HashMap<String, String>) -> Self {
        Self::Map(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<prost_types::Struct> for Value {
    fn from(v: prost_types::Struct) -> Self {
        Self::Json(v)
    }
}

/// Builds a JSON document value from a `serde_json` object.
///
/// Integers are widened to `f64`, matching the single number representation
/// of the document kind. Values beyond `f64` range degrade the way `as_f64`
/// degrades them.
pub fn struct_from_json(
    object: &serde_json::Map<String, serde_json::Value>,
) -> prost_types::Struct {
    prost_types::Struct {
        fields: object
            .iter()
            .map(|(key, value)| (key.clone(), json_value_to_proto(value)))
            .collect(),
    }
}

/// Renders a JSON document value back into a `serde_json` object.
pub fn json_from_struct(
    document: &prost_types::Struct,
) -> serde_json::Map<String, serde_json::Value> {
    document
        .fields
        .iter()
        .map(|(key, value)| (key.clone(), proto_value_to_json(value)))
        .collect()
}

fn json_value_to_proto(value: &serde_json::Value) -> prost_types::Value {
    use prost_types::value::Kind as JsonKind;

    let kind = match value {
        serde_json::Value::Null => JsonKind::NullValue(0),
        serde_json::Value::Bool(b) => JsonKind::BoolValue(*b),
        serde_json::Value::Number(n) => JsonKind::NumberValue(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => JsonKind::StringValue(s.clone()),
        serde_json::Value::Array(items) => JsonKind::ListValue(prost_types::ListValue {
            values: items.iter().map(json_value_to_proto).collect(),
        }),
        serde_json::Value::Object(object) => JsonKind::StructValue(struct_from_json(object)),
    };
    prost_types::Value { kind: Some(kind) }
}

fn proto_value_to_json(value: &prost_types::Value) -> serde_json::Value {
    use prost_types::value::Kind as JsonKind;

    match &value.kind {
        None | Some(JsonKind::NullValue(_)) => serde_json::Value::Null,
        Some(JsonKind::BoolValue(b)) => serde_json::Value::Bool(*b),
        Some(JsonKind::NumberValue(n)) => serde_json::Number::from_f64(*n)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Some(JsonKind::StringValue(s)) => serde_json::Value::String(s.clone()),
        Some(JsonKind::ListValue(list)) => {
            serde_json::Value::Array(list.values.iter().map(proto_value_to_json).collect())
        }
        Some(JsonKind::StructValue(document)) => {
            serde_json::Value::Object(json_from_struct(document))
        }
    }
}
