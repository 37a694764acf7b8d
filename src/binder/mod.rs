//! # Parameter Binding
//!
//! Converts raw request parameters into the values a handler declared.
//!
//! ## Overview
//!
//! Values arrive from the wire as strings, string arrays or nothing at all
//! ([`ParamValue::String`], [`ParamValue::Array`], [`ParamValue::Null`]).
//! Declared defaults may already be typed. Each handler parameter is described
//! by a [`ParameterSpec`]; [`bind_parameters`] walks the specs in declared order,
//! picks the raw value (or the default), enforces nullability and runs
//! [`check_parameter_type`] on it.
//!
//! ## Coercion rules
//!
//! Applied in this order, first applicable rule wins:
//!
//! 1. the value's kind already equals the declared type: accepted unchanged
//! 2. nullable and the value is null: `null`
//! 3. nullable, declared type is not `string`, value is `"null"` or `"NULL"`: `null`
//! 4. by declared type:
//!    - `string`: anything, rendered as a string
//!    - `int`: numeric string whose float and integer readings agree (`"3"`, `"3.0"`, not `"3.5"`)
//!    - `float`: numeric string
//!    - `bool`: exactly `"true"`, `"false"`, `"TRUE"` or `"FALSE"`
//!    - `array`: only an array (already covered by rule 1)
//!    - anything else fails
//!
//! Every failure is a [`DispatchError::MalformedRequest`](crate::error::DispatchError)
//! and ends the request with a 400.
//!
//! ```rust
//! use brrtresolver::binder::{check_parameter_type, ParamType, ParamValue};
//!
//! let v = check_parameter_type(ParamValue::from("42.0"), ParamType::Int, false).unwrap();
//! assert_eq!(v, ParamValue::Int(42));
//! assert!(check_parameter_type(ParamValue::from("42.5"), ParamType::Int, false).is_err());
//! assert!(check_parameter_type(ParamValue::from("yes"), ParamType::Bool, false).is_err());
//! ```

mod core;

pub use core::{
    bind_parameters, check_parameter_type, is_numeric, ParamType, ParamValue, ParameterSpec,
    Params, MAX_INLINE_PARAMS,
};
