//! Shape-directed decoding of untyped JSON.
//!
//! Item pages embed a loosely structured JSON document whose fields come and
//! go. Rather than mirroring it with fixed structs, callers describe the part
//! they need as a [`Shape`] and decode against it:
//!
//! - Primitives convert where sensible (numeric strings to integers, `"true"` to booleans).
//! - Optional fields fall back to a declared default when absent or null.
//! - Unions try alternatives in declared order and take the first match.
//! - Records keep only declared fields, so unknown keys are ignored.
//!
//! Every error carries the dotted path of the failing value.

mod decode;
mod error;
mod fields;
mod shape;

pub use decode::{Decoded, DecodedRecord, LossyList, decode, decode_at, decode_lossy};
pub use error::ExtractError;
pub use fields::{Fields, FromDecoded};
pub use shape::{Field, Primitive, Shape};
