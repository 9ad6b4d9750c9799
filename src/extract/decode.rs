//! The decoder: interprets a [`Shape`] against a `serde_json::Value`.

use std::collections::BTreeMap;

use serde_json::Value;

use super::error::ExtractError;
use super::shape::{Primitive, Shape};

/// Root path used in error messages.
pub(crate) const ROOT_PATH: &str = "$";

/// A value produced by [`decode`]: typed scalars, lists and records.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// Absent optional without a specific default, or JSON null under [`Shape::Any`].
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    Str(String),
    /// Decoded array.
    List(Vec<Decoded>),
    /// Decoded object restricted to its declared fields.
    Record(DecodedRecord),
    /// Untouched input accepted by [`Shape::Any`].
    Raw(Value),
}

impl Decoded {
    /// Kind name used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "array",
            Self::Record(_) => "object",
            Self::Raw(value) => json_kind(value),
        }
    }

    /// Borrows the string, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrows the record, if this is one.
    #[must_use]
    pub fn as_record(&self) -> Option<&DecodedRecord> {
        match self {
            Self::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Renders a scalar as text. Integers and floats are formatted; other kinds yield `None`.
    #[must_use]
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Str(s) => Some(s.clone()),
            Self::Int(i) => Some(i.to_string()),
            Self::Float(f) => Some(f.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for Decoded {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Decoded {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Decoded {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<bool> for Decoded {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Decoded {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<Vec<Decoded>> for Decoded {
    fn from(value: Vec<Decoded>) -> Self {
        Self::List(value)
    }
}

/// A decoded object. Holds exactly the fields its record shape declared.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DecodedRecord {
    path: String,
    fields: BTreeMap<String, Decoded>,
}

impl DecodedRecord {
    /// Path of this record in the source document.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the decoded field, if declared.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Decoded> {
        self.fields.get(key)
    }

    fn field(&self, key: &str) -> Result<&Decoded, ExtractError> {
        self.fields
            .get(key)
            .ok_or_else(|| ExtractError::missing(child_path(&self.path, key)))
    }

    /// String field.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the field is missing or not a string.
    pub fn str(&self, key: &str) -> Result<&str, ExtractError> {
        match self.field(key)? {
            Decoded::Str(s) => Ok(s),
            other => Err(ExtractError::mismatch(
                child_path(&self.path, key),
                "string",
                other.kind(),
            )),
        }
    }

    /// Scalar field rendered as text (strings as-is, numbers formatted).
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the field is missing or not a scalar.
    pub fn text(&self, key: &str) -> Result<String, ExtractError> {
        let value = self.field(key)?;
        value.to_text().ok_or_else(|| {
            ExtractError::mismatch(child_path(&self.path, key), "scalar", value.kind())
        })
    }

    /// Integer field.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the field is missing or not an integer.
    pub fn int(&self, key: &str) -> Result<i64, ExtractError> {
        match self.field(key)? {
            Decoded::Int(i) => Ok(*i),
            other => Err(ExtractError::mismatch(
                child_path(&self.path, key),
                "integer",
                other.kind(),
            )),
        }
    }

    /// Boolean field.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the field is missing or not a boolean.
    pub fn bool(&self, key: &str) -> Result<bool, ExtractError> {
        match self.field(key)? {
            Decoded::Bool(b) => Ok(*b),
            other => Err(ExtractError::mismatch(
                child_path(&self.path, key),
                "boolean",
                other.kind(),
            )),
        }
    }

    /// Nested record field.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the field is missing or not a record.
    pub fn record(&self, key: &str) -> Result<&DecodedRecord, ExtractError> {
        match self.field(key)? {
            Decoded::Record(r) => Ok(r),
            other => Err(ExtractError::mismatch(
                child_path(&self.path, key),
                "object",
                other.kind(),
            )),
        }
    }

    /// Nested record field that may be null or absent.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the field holds something other than a record or null.
    pub fn opt_record(&self, key: &str) -> Result<Option<&DecodedRecord>, ExtractError> {
        match self.fields.get(key) {
            None | Some(Decoded::Null) => Ok(None),
            Some(Decoded::Record(r)) => Ok(Some(r)),
            Some(other) => Err(ExtractError::mismatch(
                child_path(&self.path, key),
                "object",
                other.kind(),
            )),
        }
    }

    /// List field.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the field is missing or not a list.
    pub fn list(&self, key: &str) -> Result<&[Decoded], ExtractError> {
        match self.field(key)? {
            Decoded::List(items) => Ok(items),
            other => Err(ExtractError::mismatch(
                child_path(&self.path, key),
                "array",
                other.kind(),
            )),
        }
    }

    /// List of strings field.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the field is missing, not a list, or holds non-strings.
    pub fn strings(&self, key: &str) -> Result<Vec<String>, ExtractError> {
        let path = child_path(&self.path, key);
        self.list(key)?
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_str().map(ToString::to_string).ok_or_else(|| {
                    ExtractError::mismatch(index_path(&path, i), "string", item.kind())
                })
            })
            .collect()
    }
}

/// Result of a best-effort list decode.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LossyList {
    /// Elements that matched the element shape, in input order.
    pub items: Vec<Decoded>,
    /// One error per rejected element.
    pub rejected: Vec<ExtractError>,
}

/// Decodes `value` against `shape`.
///
/// # Errors
///
/// Returns [`ExtractError`] describing the first mismatch, with its path.
pub fn decode(value: &Value, shape: &Shape) -> Result<Decoded, ExtractError> {
    decode_at(value, shape, ROOT_PATH)
}

/// Decodes `value` against `shape`, reporting errors relative to `path`.
///
/// # Errors
///
/// Returns [`ExtractError`] describing the first mismatch, with its path.
pub fn decode_at(value: &Value, shape: &Shape, path: &str) -> Result<Decoded, ExtractError> {
    match shape {
        Shape::Any => Ok(match value {
            Value::Null => Decoded::Null,
            other => Decoded::Raw(other.clone()),
        }),
        Shape::Primitive(kind) => decode_primitive(value, *kind, path),
        Shape::Optional { inner, default } => {
            if value.is_null() {
                return Ok(default.clone());
            }
            match decode_at(value, inner, path) {
                // A failed union inside a default-bearing shape resolves to the default.
                Err(ExtractError::NoAlternative { .. }) if matches!(**inner, Shape::Union(_)) => {
                    Ok(default.clone())
                }
                other => other,
            }
        }
        Shape::Union(alternatives) => alternatives
            .iter()
            .find_map(|alt| decode_at(value, alt, path).ok())
            .ok_or_else(|| ExtractError::NoAlternative {
                path: path.to_string(),
                tried: alternatives.len(),
            }),
        Shape::List(element) => {
            let Value::Array(items) = value else {
                return Err(ExtractError::mismatch(path, "array", json_kind(value)));
            };
            items
                .iter()
                .enumerate()
                .map(|(i, item)| decode_at(item, element, &index_path(path, i)))
                .collect::<Result<Vec<_>, _>>()
                .map(Decoded::List)
        }
        Shape::Record(fields) => {
            let Value::Object(map) = value else {
                return Err(ExtractError::mismatch(path, "object", json_kind(value)));
            };
            let mut decoded = BTreeMap::new();
            for field in fields {
                let field_path = child_path(path, field.name);
                let field_value = match (map.get(field.name), &field.shape) {
                    (Some(v), shape) => decode_at(v, shape, &field_path)?,
                    (None, Shape::Optional { default, .. }) => default.clone(),
                    (None, _) => return Err(ExtractError::missing(field_path)),
                };
                decoded.insert(field.name.to_string(), field_value);
            }
            Ok(Decoded::Record(DecodedRecord {
                path: path.to_string(),
                fields: decoded,
            }))
        }
    }
}

/// Decodes every element of an array independently, keeping the ones that match.
///
/// # Errors
///
/// Returns [`ExtractError::TypeMismatch`] only if `value` is not an array.
pub fn decode_lossy(value: &Value, element: &Shape, path: &str) -> Result<LossyList, ExtractError> {
    let Value::Array(items) = value else {
        return Err(ExtractError::mismatch(path, "array", json_kind(value)));
    };
    let mut list = LossyList::default();
    for (i, item) in items.iter().enumerate() {
        match decode_at(item, element, &index_path(path, i)) {
            Ok(decoded) => list.items.push(decoded),
            Err(e) => list.rejected.push(e),
        }
    }
    Ok(list)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn decode_primitive(value: &Value, kind: Primitive, path: &str) -> Result<Decoded, ExtractError> {
    let converted = match (kind, value) {
        (Primitive::Str, Value::String(s)) => Some(Decoded::Str(s.clone())),
        (Primitive::Int, Value::Number(n)) => n.as_i64().map(Decoded::Int).or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f <= i64::MAX as f64)
                .map(|f| Decoded::Int(f as i64))
        }),
        (Primitive::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Decoded::Int),
        (Primitive::Float, Value::Number(n)) => n.as_f64().map(Decoded::Float),
        (Primitive::Float, Value::String(s)) => s.trim().parse::<f64>().ok().map(Decoded::Float),
        (Primitive::Bool, Value::Bool(b)) => Some(Decoded::Bool(*b)),
        (Primitive::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(Decoded::Bool(true)),
            "false" => Some(Decoded::Bool(false)),
            _ => None,
        },
        (Primitive::Bool, Value::Number(n)) => match n.as_i64() {
            Some(0) => Some(Decoded::Bool(false)),
            Some(1) => Some(Decoded::Bool(true)),
            _ => None,
        },
        _ => None,
    };
    converted.ok_or_else(|| ExtractError::mismatch(path, kind.name(), json_kind(value)))
}

/// Kind name of a raw JSON value.
#[must_use]
pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn child_path(path: &str, key: &str) -> String {
    format!("{path}.{key}")
}

pub(crate) fn index_path(path: &str, index: usize) -> String {
    format!("{path}[{index}]")
}
