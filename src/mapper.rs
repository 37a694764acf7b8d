//! # Result Mapper
//!
//! Optional projection applied to a handler's return value before it is
//! placed in the envelope.
//!
//! A [`ResultMapper`] names a target shape and knows its field list. Applying
//! it builds a fresh object holding only the target's fields, each copied
//! from the same-named field of the source:
//!
//! - fields only the source has are dropped
//! - a target field missing from the source is a [`MappingError`]; the resolver
//!   answers it with a 500 since shape compatibility is not checked up front
//! - the copy is shallow: nested values are copied as they are
//! - an array source is projected element by element, order preserved
//!
//! Field lists are explicit. Derive [`MapTarget`] on the DTO to generate one
//! from its `pub` fields, list them by hand with [`ResultMapper::fields`], or
//! supply a function with [`ResultMapper::custom`].
//!
//! ```rust
//! use brrtresolver::mapper::{MapTarget, ResultMapper};
//! use serde_json::json;
//!
//! #[derive(MapTarget)]
//! pub struct PublicUser {
//!     pub id: i64,
//!     pub name: String,
//!     password_hash: String,
//! }
//!
//! let mapper = ResultMapper::to::<PublicUser>();
//! let projected = mapper
//!     .apply(json!({"id": 7, "name": "ada", "email": "ada@example.com", "password_hash": "x"}))
//!     .unwrap();
//! assert_eq!(projected, json!({"id": 7, "name": "ada"}));
//! ```

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub use brrtresolver_macros::MapTarget;

/// Target shape of a projection.
///
/// Usually derived: `#[derive(MapTarget)]` lists the struct's `pub` fields,
/// honouring `#[map(rename = "...")]`.
pub trait MapTarget {
    /// Shape name used in logs and errors.
    const SHAPE: &'static str;
    /// Fields copied from the source, in output order.
    const FIELDS: &'static [&'static str];
}

/// Projection failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// Source element is not an object.
    #[error("cannot project a {found} onto {shape}")]
    NotAnObject {
        /// Target shape.
        shape: String,
        /// JSON type of the offending source value.
        found: &'static str,
    },
    /// Target field absent from the source.
    #[error("source has no field '{field}' required by {shape}")]
    MissingField {
        /// Target shape.
        shape: String,
        /// Missing field.
        field: String,
    },
}

type ProjectFn = dyn Fn(&Value) -> Result<Value, MappingError> + Send + Sync;

#[derive(Clone)]
enum Projection {
    Fields(Vec<String>),
    Custom(Arc<ProjectFn>),
}

/// Projection declared on a handler.
#[derive(Clone)]
pub struct ResultMapper {
    shape: String,
    projection: Projection,
}

impl fmt::Debug for ResultMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("ResultMapper");
        d.field("shape", &self.shape);
        match &self.projection {
            Projection::Fields(fields) => d.field("fields", fields),
            Projection::Custom(_) => d.field("fields", &"<custom>"),
        };
        d.finish()
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl ResultMapper {
    /// Project onto `T`'s declared fields.
    #[must_use]
    pub fn to<T: MapTarget>() -> Self {
        Self::fields(T::SHAPE, T::FIELDS.iter().copied())
    }

    /// Project onto an explicit field list.
    pub fn fields<I, S>(shape: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shape: shape.into(),
            projection: Projection::Fields(fields.into_iter().map(Into::into).collect()),
        }
    }

    /// Project each element with a hand-written function.
    pub fn custom<F>(shape: impl Into<String>, project: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, MappingError> + Send + Sync + 'static,
    {
        Self {
            shape: shape.into(),
            projection: Projection::Custom(Arc::new(project)),
        }
    }

    /// Name of the target shape.
    #[must_use]
    pub fn shape(&self) -> &str {
        &self.shape
    }

    /// Apply the projection; arrays are projected element-wise.
    pub fn apply(&self, value: Value) -> Result<Value, MappingError> {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| self.project_one(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => self.project_one(&other),
        }
    }

    fn project_one(&self, source: &Value) -> Result<Value, MappingError> {
        let fields = match &self.projection {
            Projection::Custom(project) => return project(source),
            Projection::Fields(fields) => fields,
        };
        let Value::Object(source) = source else {
            return Err(MappingError::NotAnObject {
                shape: self.shape.clone(),
                found: json_type(source),
            });
        };
        let mut target = Map::with_capacity(fields.len());
        for field in fields {
            let value = source
                .get(field)
                .ok_or_else(|| MappingError::MissingField {
                    shape: self.shape.clone(),
                    field: field.clone(),
                })?;
            target.insert(field.clone(), value.clone());
        }
        Ok(Value::Object(target))
    }
}
