//! Argument binding.
//!
//! Each handler declares an ordered list of [`ParamDescriptor`]s. For every
//! dispatch the binder produces one [`Value`] per descriptor:
//!
//! 1. A record parameter on a `POST` or `PUT` request is decoded from the
//!    JSON body.
//! 2. Otherwise the parameter's binding key (its declared name, or the
//!    route's placeholder name at the same position) is looked up among the
//!    path variables and converted to the declared kind.
//! 3. Anything left unbound receives the kind's zero value.

use crate::request::{param_value, ParamVec, Request};
use http::Method;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use thiserror::Error;
use tracing::debug;

type BoxedRecord = Box<dyn Any + Send>;

/// Type-erased JSON decoder and zero value for a record parameter.
#[derive(Clone, Copy)]
pub struct RecordShape {
    type_name: &'static str,
    decode: fn(&[u8]) -> serde_json::Result<BoxedRecord>,
    zero: fn() -> BoxedRecord,
}

fn decode_record<T: DeserializeOwned + Send + 'static>(bytes: &[u8]) -> serde_json::Result<BoxedRecord> {
    serde_json::from_slice::<T>(bytes).map(|v| Box::new(v) as BoxedRecord)
}

fn zero_record<T: Default + Send + 'static>() -> BoxedRecord {
    Box::new(T::default())
}

impl RecordShape {
    #[must_use]
    pub fn of<T: DeserializeOwned + Default + Send + 'static>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            decode: decode_record::<T>,
            zero: zero_record::<T>,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for RecordShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordShape").field(&self.type_name).finish()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    Str,
    Record(RecordShape),
}

impl ParamKind {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            ParamKind::Int => "int",
            ParamKind::Float => "float",
            ParamKind::Bool => "bool",
            ParamKind::Str => "string",
            ParamKind::Record(_) => "record",
        }
    }

    fn zero(&self) -> Value {
        match self {
            ParamKind::Int => Value::Int(0),
            ParamKind::Float => Value::Float(0.0),
            ParamKind::Bool => Value::Bool(false),
            ParamKind::Str => Value::Str(String::new()),
            ParamKind::Record(shape) => Value::Record(Some((shape.zero)())),
        }
    }
}

/// One declared handler parameter.
#[derive(Debug, Clone)]
pub struct ParamDescriptor {
    pub kind: ParamKind,
    pub name: Option<String>,
}

impl ParamDescriptor {
    /// Unnamed parameter; binds to the route placeholder at the same position.
    #[must_use]
    pub fn positional(kind: ParamKind) -> Self {
        Self { kind, name: None }
    }

    #[must_use]
    pub fn named(kind: ParamKind, name: &str) -> Self {
        Self {
            kind,
            name: Some(name.to_string()),
        }
    }

    #[must_use]
    pub fn int(name: &str) -> Self {
        Self::named(ParamKind::Int, name)
    }

    #[must_use]
    pub fn float(name: &str) -> Self {
        Self::named(ParamKind::Float, name)
    }

    #[must_use]
    pub fn bool(name: &str) -> Self {
        Self::named(ParamKind::Bool, name)
    }

    #[must_use]
    pub fn string(name: &str) -> Self {
        Self::named(ParamKind::Str, name)
    }

    /// A JSON request body decoded into `T` on `POST`/`PUT`.
    #[must_use]
    pub fn record<T: DeserializeOwned + Default + Send + 'static>() -> Self {
        Self::positional(ParamKind::Record(RecordShape::of::<T>()))
    }
}

/// A bound argument.
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// `None` once the record has been moved out with [`Args::take_record`].
    Record(Option<BoxedRecord>),
}

impl Value {
    fn label(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Str(_) => "string",
            Value::Record(_) => "record",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => f.debug_tuple("Int").field(v).finish(),
            Value::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Value::Bool(v) => f.debug_tuple("Bool").field(v).finish(),
            Value::Str(v) => f.debug_tuple("Str").field(v).finish(),
            Value::Record(Some(_)) => f.write_str("Record(..)"),
            Value::Record(None) => f.write_str("Record(taken)"),
        }
    }
}

/// A handler asked for an argument that the binder did not produce.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    #[error("argument {position} requested but handler declares {arity}")]
    Missing { position: usize, arity: usize },

    #[error("argument {position} is {found}, not {expected}")]
    KindMismatch {
        position: usize,
        expected: &'static str,
        found: &'static str,
    },

    #[error("record argument {position} is not a {expected}")]
    RecordType {
        position: usize,
        expected: &'static str,
    },

    #[error("record argument {position} was already taken")]
    RecordTaken { position: usize },
}

/// Positional arguments for one handler invocation.
#[derive(Debug, Default)]
pub struct Args {
    values: Vec<Value>,
}

impl Args {
    #[must_use]
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    fn slot(&self, position: usize) -> Result<&Value, ArgError> {
        self.values.get(position).ok_or(ArgError::Missing {
            position,
            arity: self.values.len(),
        })
    }

    fn mismatch(position: usize, expected: &'static str, found: &Value) -> ArgError {
        ArgError::KindMismatch {
            position,
            expected,
            found: found.label(),
        }
    }

    pub fn int(&self, position: usize) -> Result<i64, ArgError> {
        match self.slot(position)? {
            Value::Int(v) => Ok(*v),
            other => Err(Self::mismatch(position, "int", other)),
        }
    }

    pub fn float(&self, position: usize) -> Result<f64, ArgError> {
        match self.slot(position)? {
            Value::Float(v) => Ok(*v),
            other => Err(Self::mismatch(position, "float", other)),
        }
    }

    pub fn bool(&self, position: usize) -> Result<bool, ArgError> {
        match self.slot(position)? {
            Value::Bool(v) => Ok(*v),
            other => Err(Self::mismatch(position, "bool", other)),
        }
    }

    pub fn str(&self, position: usize) -> Result<&str, ArgError> {
        match self.slot(position)? {
            Value::Str(v) => Ok(v),
            other => Err(Self::mismatch(position, "string", other)),
        }
    }

    /// Borrow a record argument.
    pub fn record<T: 'static>(&self, position: usize) -> Result<&T, ArgError> {
        match self.slot(position)? {
            Value::Record(Some(boxed)) => {
                boxed.downcast_ref::<T>().ok_or(ArgError::RecordType {
                    position,
                    expected: std::any::type_name::<T>(),
                })
            }
            Value::Record(None) => Err(ArgError::RecordTaken { position }),
            other => Err(Self::mismatch(position, "record", other)),
        }
    }

    /// Move a record argument out of the list.
    pub fn take_record<T: 'static>(&mut self, position: usize) -> Result<T, ArgError> {
        let arity = self.values.len();
        let slot = self
            .values
            .get_mut(position)
            .ok_or(ArgError::Missing { position, arity })?;
        let found = slot.label();
        let Value::Record(record) = slot else {
            return Err(ArgError::KindMismatch {
                position,
                expected: "record",
                found,
            });
        };
        let boxed = record.take().ok_or(ArgError::RecordTaken { position })?;
        match boxed.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(original) => {
                *record = Some(original);
                Err(ArgError::RecordType {
                    position,
                    expected: std::any::type_name::<T>(),
                })
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("invalid request body for parameter {param}: {source}")]
    Body {
        param: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {kind} for {name}: '{value}'")]
    InvalidScalar {
        name: String,
        kind: &'static str,
        value: String,
    },
}

fn convert(kind: &ParamKind, key: &str, raw: &str) -> Result<Value, BindingError> {
    let invalid = || BindingError::InvalidScalar {
        name: key.to_string(),
        kind: kind.label(),
        value: raw.to_string(),
    };
    match kind {
        ParamKind::Int => raw.parse::<i64>().map(Value::Int).map_err(|_| invalid()),
        ParamKind::Float => raw.parse::<f64>().map(Value::Float).map_err(|_| invalid()),
        ParamKind::Bool => raw.parse::<bool>().map(Value::Bool).map_err(|_| invalid()),
        ParamKind::Str => Ok(Value::Str(raw.to_string())),
        // A path segment never binds to a record.
        ParamKind::Record(_) => Ok(kind.zero()),
    }
}

/// Produce one argument per descriptor, in declaration order.
///
/// `path_vars` must be in placeholder order; its keys provide the positional
/// fallback for unnamed parameters.
///
/// # Errors
///
/// [`BindingError::Body`] when a record cannot be decoded from the body (an
/// empty body included), [`BindingError::InvalidScalar`] when a captured
/// segment does not parse as the declared scalar kind.
pub fn bind(
    params: &[ParamDescriptor],
    path_vars: &ParamVec,
    request: &Request,
) -> Result<Args, BindingError> {
    let body_bound = request.method == Method::POST || request.method == Method::PUT;
    let mut values = Vec::with_capacity(params.len());

    for (position, param) in params.iter().enumerate() {
        if let ParamKind::Record(shape) = &param.kind {
            if body_bound {
                let record = (shape.decode)(request.body()).map_err(|source| BindingError::Body {
                    param: position,
                    source,
                })?;
                values.push(Value::Record(Some(record)));
                continue;
            }
        }

        let key = param
            .name
            .as_deref()
            .or_else(|| path_vars.get(position).map(|(k, _)| k.as_ref()));

        let value = match key.and_then(|k| param_value(path_vars, k).map(|raw| (k, raw))) {
            Some((k, raw)) => convert(&param.kind, k, raw)?,
            None => param.kind.zero(),
        };
        values.push(value);
    }

    debug!(
        method = %request.method,
        path = %request.path,
        arity = values.len(),
        "Arguments bound"
    );
    Ok(Args::new(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn vars(pairs: &[(&str, &str)]) -> ParamVec {
        pairs
            .iter()
            .map(|(k, v)| (Arc::from(*k), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_scalar_kinds_convert() {
        let params = [
            ParamDescriptor::int("id"),
            ParamDescriptor::float("ratio"),
            ParamDescriptor::bool("active"),
            ParamDescriptor::string("slug"),
        ];
        let path_vars = vars(&[("id", "7"), ("ratio", "0.5"), ("active", "true"), ("slug", "abc")]);
        let args = bind(&params, &path_vars, &Request::get("/x")).unwrap();

        assert_eq!(args.int(0).unwrap(), 7);
        assert!((args.float(1).unwrap() - 0.5).abs() < f64::EPSILON);
        assert!(args.bool(2).unwrap());
        assert_eq!(args.str(3).unwrap(), "abc");
    }

    #[test]
    fn test_unbound_parameters_get_zero_values() {
        let params = [
            ParamDescriptor::int("page"),
            ParamDescriptor::string("missing"),
            ParamDescriptor::bool("flag"),
        ];
        let args = bind(&params, &ParamVec::new(), &Request::get("/x")).unwrap();
        assert_eq!(args.int(0).unwrap(), 0);
        assert_eq!(args.str(1).unwrap(), "");
        assert!(!args.bool(2).unwrap());
    }

    #[test]
    fn test_wrong_kind_access_is_an_error() {
        let args = Args::new(vec![Value::Str("x".into())]);
        assert_eq!(
            args.int(0),
            Err(ArgError::KindMismatch {
                position: 0,
                expected: "int",
                found: "string"
            })
        );
        assert_eq!(args.int(3), Err(ArgError::Missing { position: 3, arity: 1 }));
    }

    #[test]
    fn test_take_record_twice_fails() {
        let mut args = Args::new(vec![Value::Record(Some(Box::new(5u8)))]);
        assert_eq!(args.take_record::<u8>(0).unwrap(), 5);
        assert_eq!(
            args.take_record::<u8>(0),
            Err(ArgError::RecordTaken { position: 0 })
        );
    }

    #[test]
    fn test_take_record_wrong_type_keeps_value() {
        let mut args = Args::new(vec![Value::Record(Some(Box::new(5u8)))]);
        assert!(matches!(
            args.take_record::<String>(0),
            Err(ArgError::RecordType { .. })
        ));
        assert_eq!(*args.record::<u8>(0).unwrap(), 5);
    }
}
