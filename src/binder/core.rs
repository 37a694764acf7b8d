//! Binder core module - coercion matrix and per-handler argument binding.

use crate::error::DispatchError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};
use smallvec::SmallVec;
use std::fmt;
use tracing::debug;

/// Maximum number of parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Decimal or scientific notation, optional sign, surrounding whitespace allowed.
static NUMERIC_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t\n\r\x0B\x0C]*[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?[ \t\n\r\x0B\x0C]*$")
        .expect("numeric regex should be valid")
});

/// `true` if `s` is a numeric string (`"42"`, `" -3.5"`, `"1e3"`, `".5"`).
///
/// Hex, `inf`, `nan` and empty strings are not numeric.
#[inline]
#[must_use]
pub fn is_numeric(s: &str) -> bool {
    NUMERIC_REGEX.is_match(s)
}

/// Type a handler declares for one of its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// UTF-8 string.
    String,
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// Boolean.
    Bool,
    /// Sequence of values.
    Array,
    /// Structured value; never bindable from request parameters.
    Object,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ParamType::String => "string",
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Bool => "bool",
            ParamType::Array => "array",
            ParamType::Object => "object",
        })
    }
}

/// Raw or bound parameter value.
///
/// Wire values are always `String`, `Array` of strings or `Null`; the other
/// variants come from typed defaults and from coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// Absent / explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Float.
    Float(f64),
    /// String.
    String(String),
    /// Sequence.
    Array(Vec<ParamValue>),
}

impl ParamValue {
    /// Kind of this value as a declared type; `None` for null.
    #[must_use]
    pub fn kind(&self) -> Option<ParamType> {
        match self {
            ParamValue::Null => None,
            ParamValue::Bool(_) => Some(ParamType::Bool),
            ParamValue::Int(_) => Some(ParamType::Int),
            ParamValue::Float(_) => Some(ParamType::Float),
            ParamValue::String(_) => Some(ParamType::String),
            ParamValue::Array(_) => Some(ParamType::Array),
        }
    }

    /// `true` for [`ParamValue::Null`].
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    /// Borrow the string, if this is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer, if this is one.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The float, if this is one. Integers widen.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Float(f) => Some(*f),
            ParamValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// The boolean, if this is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow the elements, if this is an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// String coercion: never fails.
    ///
    /// Numbers use their decimal form, booleans `true`/`false`, arrays join
    /// their elements with `,`, null is the empty string.
    #[must_use]
    pub fn to_wire_string(&self) -> String {
        match self {
            ParamValue::Null => String::new(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::String(s) => s.clone(),
            ParamValue::Array(items) => items
                .iter()
                .map(ParamValue::to_wire_string)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl Serialize for ParamValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ParamValue::Null => serializer.serialize_none(),
            ParamValue::Bool(b) => serializer.serialize_bool(*b),
            ParamValue::Int(i) => serializer.serialize_i64(*i),
            ParamValue::Float(f) => serializer.serialize_f64(*f),
            ParamValue::String(s) => serializer.serialize_str(s),
            ParamValue::Array(items) => items.serialize(serializer),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::String(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::String(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

impl From<i32> for ParamValue {
    fn from(i: i32) -> Self {
        ParamValue::Int(i64::from(i))
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        ParamValue::Float(f)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(items: Vec<T>) -> Self {
        ParamValue::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::Null, Into::into)
    }
}

/// Named raw parameters from one request source (query string or body).
///
/// Stack-allocated for up to [`MAX_INLINE_PARAMS`] entries. Lookups use
/// "last write wins" semantics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(SmallVec<[(String, ParamValue); MAX_INLINE_PARAMS]>);

impl Params {
    /// Empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.push((name.into(), value.into()));
    }

    /// Builder variant of [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Value of the last parameter named `name`.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.iter().rfind(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Mutable access to the last parameter named `name`.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut ParamValue> {
        self.0.iter_mut().rfind(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Number of entries, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` if no parameter was received.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Declaration of one handler parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    /// Name looked up in the request parameters.
    pub name: String,
    /// Declared type; untyped parameters receive the raw value unchanged.
    pub declared_type: Option<ParamType>,
    /// Whether `null` is an acceptable value.
    pub nullable: bool,
    /// Fallback used when the request does not carry the parameter.
    pub default: Option<ParamValue>,
}

impl ParameterSpec {
    /// Required, non-nullable parameter of type `ty`.
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            declared_type: Some(ty),
            nullable: false,
            default: None,
        }
    }

    /// Parameter without a declared type.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            nullable: false,
            default: None,
        }
    }

    /// Allow `null`.
    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Default used when the parameter is absent.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<ParamValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// `true` if a default is declared.
    #[inline]
    #[must_use]
    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

fn coercion_failure(value: &ParamValue, declared: ParamType) -> DispatchError {
    DispatchError::malformed(format!("cannot bind {value:?} as {declared}"))
}

/// Coerce `raw` into `declared`, honouring `nullable`.
///
/// Total and deterministic: either the coerced value or a
/// [`DispatchError::MalformedRequest`], never both.
pub fn check_parameter_type(
    raw: ParamValue,
    declared: ParamType,
    nullable: bool,
) -> Result<ParamValue, DispatchError> {
    if raw.kind() == Some(declared) {
        return Ok(raw);
    }

    if nullable && raw.is_null() {
        return Ok(ParamValue::Null);
    }

    if nullable
        && declared != ParamType::String
        && matches!(raw.as_str(), Some("null") | Some("NULL"))
    {
        return Ok(ParamValue::Null);
    }

    match declared {
        ParamType::String => Ok(ParamValue::String(raw.to_wire_string())),
        ParamType::Int => {
            let Some(s) = raw.as_str().filter(|s| is_numeric(s)) else {
                return Err(coercion_failure(&raw, declared));
            };
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(ParamValue::Int(i));
            }
            // Non-integral spellings ("3.0", "1e3") are accepted only when
            // the float reading is exactly an integer.
            match s.parse::<f64>() {
                Ok(f)
                    if f.is_finite()
                        && f.fract() == 0.0
                        && f >= i64::MIN as f64
                        && f < i64::MAX as f64 =>
                {
                    Ok(ParamValue::Int(f as i64))
                }
                _ => Err(coercion_failure(&raw, declared)),
            }
        }
        ParamType::Float => {
            let Some(s) = raw.as_str().filter(|s| is_numeric(s)) else {
                return Err(coercion_failure(&raw, declared));
            };
            s.trim()
                .parse::<f64>()
                .map(ParamValue::Float)
                .map_err(|_| coercion_failure(&raw, declared))
        }
        ParamType::Bool => match raw.as_str() {
            Some("true") | Some("TRUE") => Ok(ParamValue::Bool(true)),
            Some("false") | Some("FALSE") => Ok(ParamValue::Bool(false)),
            _ => Err(coercion_failure(&raw, declared)),
        },
        ParamType::Array | ParamType::Object => Err(coercion_failure(&raw, declared)),
    }
}

/// Bind every declared parameter, in declared order, from `source`.
///
/// Absent parameters fall back to their default; a parameter still without a
/// value must be nullable. Typed parameters go through
/// [`check_parameter_type`].
pub fn bind_parameters(
    specs: &[ParameterSpec],
    source: &Params,
) -> Result<SmallVec<[(String, ParamValue); MAX_INLINE_PARAMS]>, DispatchError> {
    let mut bound = SmallVec::with_capacity(specs.len());
    for spec in specs {
        let raw = source
            .get(&spec.name)
            .or(spec.default.as_ref())
            .cloned()
            .unwrap_or(ParamValue::Null);

        if raw.is_null() && !spec.nullable {
            debug!(parameter = %spec.name, "Required parameter missing");
            return Err(DispatchError::malformed(format!(
                "missing required parameter '{}'",
                spec.name
            )));
        }

        let value = match spec.declared_type {
            Some(ty) => check_parameter_type(raw, ty, spec.nullable).inspect_err(|e| {
                debug!(parameter = %spec.name, declared_type = %ty, error = %e, "Parameter coercion failed");
            })?,
            None => raw,
        };
        bound.push((spec.name.clone(), value));
    }
    Ok(bound)
}
