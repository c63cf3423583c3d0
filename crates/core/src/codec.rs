//! Tag value codec.
//!
//! Tags arrive as raw text. [`encode`] classifies the text and produces the
//! canonical stored string plus its [`TypeTag`]; [`decode`] turns a stored
//! pair back into a [`TagValue`]. Nothing else in the crate interprets stored
//! tag strings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    String,
    Integer,
    Float,
    Boolean,
    Null,
    List,
    Dict,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::String => "string",
            TypeTag::Integer => "integer",
            TypeTag::Float => "float",
            TypeTag::Boolean => "boolean",
            TypeTag::Null => "null",
            TypeTag::List => "list",
            TypeTag::Dict => "dict",
        }
    }
}

/// Unknown names fall back to `String`. The short names (`str`, `int`,
/// `bool`, `NoneType`) are what older databases recorded.
impl From<&str> for TypeTag {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "integer" | "int" => TypeTag::Integer,
            "float" => TypeTag::Float,
            "boolean" | "bool" => TypeTag::Boolean,
            "null" | "nonetype" | "none" => TypeTag::Null,
            "list" => TypeTag::List,
            "dict" => TypeTag::Dict,
            _ => TypeTag::String,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
    List(Vec<Value>),
    Dict(Map<String, Value>),
}

impl TagValue {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            TagValue::String(_) => TypeTag::String,
            TagValue::Integer(_) => TypeTag::Integer,
            TagValue::Float(_) => TypeTag::Float,
            TagValue::Boolean(_) => TypeTag::Boolean,
            TagValue::Null => TypeTag::Null,
            TagValue::List(_) => TypeTag::List,
            TagValue::Dict(_) => TypeTag::Dict,
        }
    }

    /// JSON rendering used for display. Non-finite floats become `null`.
    pub fn to_json(&self) -> Value {
        match self {
            TagValue::String(s) => Value::String(s.clone()),
            TagValue::Integer(i) => Value::from(*i),
            TagValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            TagValue::Boolean(b) => Value::Bool(*b),
            TagValue::Null => Value::Null,
            TagValue::List(items) => Value::Array(items.clone()),
            TagValue::Dict(map) => Value::Object(map.clone()),
        }
    }
}

/// Canonical stored form.
impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::String(s) => f.write_str(s),
            TagValue::Integer(i) => write!(f, "{}", i),
            // Debug keeps the decimal point ("1.0"), so the stored text still reads as a float.
            TagValue::Float(x) => write!(f, "{:?}", x),
            TagValue::Boolean(b) => write!(f, "{}", b),
            TagValue::Null => f.write_str("none"),
            TagValue::List(items) => write!(f, "{}", Value::Array(items.clone())),
            TagValue::Dict(map) => write!(f, "{}", Value::Object(map.clone())),
        }
    }
}

/// Classifies raw tag text. First match wins: boolean literal, `none`,
/// base-10 integer, float, string.
///
/// Text that would not survive a round trip stays a string: integers
/// outside the `i64` range, and anything that parses to a non-finite float
/// (`nan`, `inf`, `infinity`, `1e400`).
pub fn infer(raw: &str) -> TagValue {
    match raw.to_lowercase().as_str() {
        "true" => return TagValue::Boolean(true),
        "false" => return TagValue::Boolean(false),
        "none" => return TagValue::Null,
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return TagValue::Integer(i);
    }
    if is_integer_literal(raw) {
        return TagValue::String(raw.to_string());
    }
    match raw.parse::<f64>() {
        Ok(x) if x.is_finite() => TagValue::Float(x),
        _ => TagValue::String(raw.to_string()),
    }
}

fn is_integer_literal(raw: &str) -> bool {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

pub fn encode(raw: &str) -> (String, TypeTag) {
    let value = infer(raw);
    (value.to_string(), value.type_tag())
}

/// Never fails. A stored string that does not parse under its numeric or
/// boolean type comes back as a plain string.
pub fn decode(stored: &str, type_tag: TypeTag) -> TagValue {
    let fallback = || TagValue::String(stored.to_string());
    match type_tag {
        TypeTag::String => fallback(),
        TypeTag::Integer => stored
            .trim()
            .parse::<i64>()
            .map(TagValue::Integer)
            .unwrap_or_else(|_| fallback()),
        TypeTag::Float => stored
            .trim()
            .parse::<f64>()
            .map(TagValue::Float)
            .unwrap_or_else(|_| fallback()),
        TypeTag::Boolean => match stored.trim().to_lowercase().as_str() {
            "true" => TagValue::Boolean(true),
            "false" => TagValue::Boolean(false),
            _ => fallback(),
        },
        TypeTag::Null => TagValue::Null,
        TypeTag::List => match serde_json::from_str::<Vec<Value>>(stored) {
            Ok(items) => TagValue::List(items),
            Err(_) => TagValue::List(
                stored
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(|s| Value::String(s.to_string()))
                    .collect(),
            ),
        },
        TypeTag::Dict => {
            TagValue::Dict(serde_json::from_str::<Map<String, Value>>(stored).unwrap_or_default())
        }
    }
}
