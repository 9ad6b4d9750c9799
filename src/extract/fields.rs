//! Typed accessors over a raw JSON object.
//!
//! [`Fields`] is the "parse one key at a time" counterpart to decoding a whole
//! record shape: each accessor decodes a single key against the shape implied
//! by the requested Rust type (see [`FromDecoded`]).

use serde_json::{Map, Value};

use super::decode::{
    Decoded, DecodedRecord, LossyList, ROOT_PATH, child_path, decode_at, decode_lossy, index_path,
    json_kind,
};
use super::error::ExtractError;
use super::shape::Shape;

/// Rust types that can be produced from a [`Decoded`] value.
pub trait FromDecoded: Sized {
    /// Shape a raw value must match to produce `Self`.
    fn shape() -> Shape;

    /// Converts a value already decoded against [`FromDecoded::shape`].
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if `value` is not of the expected kind.
    fn from_decoded(value: Decoded, path: &str) -> Result<Self, ExtractError>;
}

impl FromDecoded for String {
    fn shape() -> Shape {
        Shape::str()
    }

    fn from_decoded(value: Decoded, path: &str) -> Result<Self, ExtractError> {
        match value {
            Decoded::Str(s) => Ok(s),
            other => Err(ExtractError::mismatch(path, "string", other.kind())),
        }
    }
}

impl FromDecoded for i64 {
    fn shape() -> Shape {
        Shape::int()
    }

    fn from_decoded(value: Decoded, path: &str) -> Result<Self, ExtractError> {
        match value {
            Decoded::Int(i) => Ok(i),
            other => Err(ExtractError::mismatch(path, "integer", other.kind())),
        }
    }
}

impl FromDecoded for f64 {
    fn shape() -> Shape {
        Shape::float()
    }

    fn from_decoded(value: Decoded, path: &str) -> Result<Self, ExtractError> {
        match value {
            Decoded::Float(f) => Ok(f),
            other => Err(ExtractError::mismatch(path, "float", other.kind())),
        }
    }
}

impl FromDecoded for bool {
    fn shape() -> Shape {
        Shape::bool()
    }

    fn from_decoded(value: Decoded, path: &str) -> Result<Self, ExtractError> {
        match value {
            Decoded::Bool(b) => Ok(b),
            other => Err(ExtractError::mismatch(path, "boolean", other.kind())),
        }
    }
}

impl<T: FromDecoded> FromDecoded for Vec<T> {
    fn shape() -> Shape {
        Shape::list(T::shape())
    }

    fn from_decoded(value: Decoded, path: &str) -> Result<Self, ExtractError> {
        match value {
            Decoded::List(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| T::from_decoded(item, &index_path(path, i)))
                .collect(),
            other => Err(ExtractError::mismatch(path, "array", other.kind())),
        }
    }
}

impl<T: FromDecoded> FromDecoded for Option<T> {
    fn shape() -> Shape {
        T::shape().optional()
    }

    fn from_decoded(value: Decoded, path: &str) -> Result<Self, ExtractError> {
        match value {
            Decoded::Null => Ok(None),
            other => T::from_decoded(other, path).map(Some),
        }
    }
}

/// Borrowed view of a JSON object with typed, path-aware accessors.
#[derive(Debug, Clone)]
pub struct Fields<'a> {
    path: String,
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    /// Wraps the document root, which must be an object.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::TypeMismatch`] if `value` is not an object.
    pub fn new(value: &'a Value) -> Result<Self, ExtractError> {
        Self::at(value, ROOT_PATH.to_string())
    }

    fn at(value: &'a Value, path: String) -> Result<Self, ExtractError> {
        match value {
            Value::Object(map) => Ok(Self { path, map }),
            other => Err(ExtractError::mismatch(path, "object", json_kind(other))),
        }
    }

    /// Path of this object.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns true if `key` is present (even if null).
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Raw value of `key`.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key)
    }

    /// Required key decoded as `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::MissingField`] if absent, or the decode error.
    pub fn required<T: FromDecoded>(&self, key: &str) -> Result<T, ExtractError> {
        let path = child_path(&self.path, key);
        let value = self.map.get(key).ok_or_else(|| ExtractError::missing(&path))?;
        let decoded = decode_at(value, &T::shape(), &path)?;
        T::from_decoded(decoded, &path)
    }

    /// Key decoded as `T`, or exactly `default` when the key is absent.
    ///
    /// A present value that fails to decode is still an error, except when
    /// `T`'s shape is a union and no alternative matched.
    ///
    /// # Errors
    ///
    /// Returns the decode error for a present, non-matching value.
    pub fn get_or<T: FromDecoded>(&self, key: &str, default: T) -> Result<T, ExtractError> {
        let Some(value) = self.map.get(key) else {
            return Ok(default);
        };
        let path = child_path(&self.path, key);
        match decode_at(value, &T::shape(), &path) {
            Ok(decoded) => T::from_decoded(decoded, &path),
            Err(ExtractError::NoAlternative { .. }) => Ok(default),
            Err(e) => Err(e),
        }
    }

    /// Required key decoded against an explicit shape.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::MissingField`] if absent, or the decode error.
    pub fn decode(&self, key: &str, shape: &Shape) -> Result<Decoded, ExtractError> {
        let path = child_path(&self.path, key);
        match self.map.get(key) {
            Some(value) => decode_at(value, shape, &path),
            None => Err(ExtractError::missing(path)),
        }
    }

    /// Decodes this whole object against a record shape.
    ///
    /// # Errors
    ///
    /// Returns the decode error, or a mismatch if `shape` is not a record.
    pub fn decode_record(&self, shape: &Shape) -> Result<DecodedRecord, ExtractError> {
        if !matches!(shape, Shape::Record(_)) {
            return Err(ExtractError::mismatch(&self.path, shape.describe(), "object"));
        }
        match decode_at(&Value::Object(self.map.clone()), shape, &self.path)? {
            Decoded::Record(record) => Ok(record),
            other => Err(ExtractError::mismatch(&self.path, "object", other.kind())),
        }
    }

    /// Required array key decoded element by element, keeping the matches.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the key is absent or not an array.
    pub fn lossy_list(&self, key: &str, element: &Shape) -> Result<LossyList, ExtractError> {
        let path = child_path(&self.path, key);
        match self.map.get(key) {
            Some(value) => decode_lossy(value, element, &path),
            None => Err(ExtractError::missing(path)),
        }
    }

    /// Nested required object.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError`] if the key is absent or not an object.
    pub fn nested(&self, key: &str) -> Result<Fields<'a>, ExtractError> {
        let path = child_path(&self.path, key);
        match self.map.get(key) {
            Some(value) => Fields::at(value, path),
            None => Err(ExtractError::missing(path)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_required_decodes_typed_values() {
        let value = json!({"statusCode": 0, "words": ["a"], "flag": "true"});
        let fields = Fields::new(&value).unwrap();
        assert_eq!(fields.required::<i64>("statusCode").unwrap(), 0);
        assert_eq!(fields.required::<Vec<String>>("words").unwrap(), vec!["a"]);
        assert!(fields.required::<bool>("flag").unwrap());
    }

    #[test]
    fn test_required_missing_key_is_error() {
        let value = json!({});
        let fields = Fields::new(&value).unwrap();
        let err = fields.required::<i64>("statusCode").unwrap_err();
        assert_eq!(err, ExtractError::missing("$.statusCode"));
    }

    #[test]
    fn test_get_or_returns_literal_default_when_absent() {
        let value = json!({"present": true});
        let fields = Fields::new(&value).unwrap();
        assert!(!fields.get_or("isContentClassified", false).unwrap());
        assert!(fields.get_or("present", false).unwrap());
        let keywords: Vec<String> = fields.get_or("suggestedWords", Vec::new()).unwrap();
        assert!(keywords.is_empty());
    }

    #[test]
    fn test_get_or_present_but_wrong_kind_is_error() {
        let value = json!({"count": {"nested": 1}});
        let fields = Fields::new(&value).unwrap();
        assert!(fields.get_or("count", 7_i64).is_err());
    }

    #[test]
    fn test_option_type_treats_null_as_none() {
        let value = json!({"a": null, "b": 4});
        let fields = Fields::new(&value).unwrap();
        assert_eq!(fields.required::<Option<i64>>("a").unwrap(), None);
        assert_eq!(fields.required::<Option<i64>>("b").unwrap(), Some(4));
    }

    #[test]
    fn test_nested_tracks_path() {
        let value = json!({"outer": {"inner": {"x": "not a number"}}});
        let root = Fields::new(&value).unwrap();
        let outer = root.nested("outer").unwrap();
        let inner = outer.nested("inner").unwrap();
        let err = inner.required::<i64>("x").unwrap_err();
        assert_eq!(err.path(), Some("$.outer.inner.x"));
    }

    #[test]
    fn test_nested_non_object_is_error() {
        let value = json!({"outer": [1]});
        let root = Fields::new(&value).unwrap();
        let err = root.nested("outer").unwrap_err();
        assert!(matches!(err, ExtractError::TypeMismatch { found: "array", .. }));
    }

    #[test]
    fn test_decode_record_requires_record_shape() {
        let value = json!({"a": 1});
        let fields = Fields::new(&value).unwrap();
        assert!(fields.decode_record(&Shape::int()).is_err());
        let record = fields
            .decode_record(&Shape::record([("a", Shape::int())]))
            .unwrap();
        assert_eq!(record.int("a").unwrap(), 1);
        assert_eq!(record.path(), "$");
    }
}
