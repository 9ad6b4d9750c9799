//! Shape descriptions for the decoder.

use super::Decoded;

/// Scalar kinds a [`Shape::Primitive`] can demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// JSON string.
    Str,
    /// Integer, or a string/float holding an integral value.
    Int,
    /// Any number, or a string holding one.
    Float,
    /// Boolean, `"true"`/`"false"`, or the integers 0 and 1.
    Bool,
}

impl Primitive {
    /// Human readable name used in error messages.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Int => "integer",
            Self::Float => "float",
            Self::Bool => "boolean",
        }
    }
}

/// Expected structure of a JSON value.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Accepts any value unchanged.
    Any,
    /// A scalar of the given kind.
    Primitive(Primitive),
    /// The inner shape, or `default` when the value is absent or null.
    Optional {
        /// Shape of a present value.
        inner: Box<Shape>,
        /// Value used when absent.
        default: Decoded,
    },
    /// Alternatives tried in declared order; the first match wins.
    Union(Vec<Shape>),
    /// Homogeneous array.
    List(Box<Shape>),
    /// Object with named fields. Undeclared keys are ignored.
    Record(Vec<Field>),
}

/// A named field of a [`Shape::Record`].
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// JSON key.
    pub name: &'static str,
    /// Shape of the value. An [`Shape::Optional`] field may be absent.
    pub shape: Shape,
}

impl Shape {
    /// String shape.
    #[must_use]
    pub fn str() -> Self {
        Self::Primitive(Primitive::Str)
    }

    /// Integer shape.
    #[must_use]
    pub fn int() -> Self {
        Self::Primitive(Primitive::Int)
    }

    /// Float shape.
    #[must_use]
    pub fn float() -> Self {
        Self::Primitive(Primitive::Float)
    }

    /// Boolean shape.
    #[must_use]
    pub fn bool() -> Self {
        Self::Primitive(Primitive::Bool)
    }

    /// Array whose elements all match `element`.
    #[must_use]
    pub fn list(element: Shape) -> Self {
        Self::List(Box::new(element))
    }

    /// First matching alternative, in order.
    #[must_use]
    pub fn one_of(alternatives: impl IntoIterator<Item = Shape>) -> Self {
        Self::Union(alternatives.into_iter().collect())
    }

    /// Object with the given `(name, shape)` fields.
    #[must_use]
    pub fn record(fields: impl IntoIterator<Item = (&'static str, Shape)>) -> Self {
        Self::Record(
            fields
                .into_iter()
                .map(|(name, shape)| Field { name, shape })
                .collect(),
        )
    }

    /// Makes this shape optional, yielding `default` when absent.
    #[must_use]
    pub fn or_default(self, default: impl Into<Decoded>) -> Self {
        Self::Optional {
            inner: Box::new(self),
            default: default.into(),
        }
    }

    /// Makes this shape optional, yielding [`Decoded::Null`] when absent.
    #[must_use]
    pub fn optional(self) -> Self {
        self.or_default(Decoded::Null)
    }

    /// Returns true if a record field of this shape may be absent.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        matches!(self, Self::Optional { .. })
    }

    /// Short description used in logs and error messages.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Primitive(p) => p.name(),
            Self::Optional { inner, .. } => inner.describe(),
            Self::Union(_) => "union",
            Self::List(_) => "array",
            Self::Record(_) => "object",
        }
    }
}
