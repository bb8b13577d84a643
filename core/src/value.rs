//! Runtime value classification.
//!
//! Record values stay as [`serde_json::Value`]; this module supplies the
//! strict kind classification the validator matches against and the
//! hashable [`Scalar`] form used to address referenced values.

use std::fmt;

use serde_json::Value;

use crate::Primitive;

/// Runtime kind of a JSON value.
///
/// Integers and floats are distinct kinds: `1` is [`ValueKind::Int`] and
/// `1.0` is [`ValueKind::Float`].
///
/// # Examples
///
/// ```
/// use engn_core::ValueKind;
/// use serde_json::json;
///
/// assert_eq!(ValueKind::of(&json!(1)), ValueKind::Int);
/// assert_eq!(ValueKind::of(&json!(1.0)), ValueKind::Float);
/// assert_eq!(ValueKind::of(&json!("1")), ValueKind::Str);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Int,
    Float,
    Str,
    List,
    Object,
}

impl ValueKind {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(_) => Self::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => Self::Int,
            Value::Number(_) => Self::Float,
            Value::String(_) => Self::Str,
            Value::Array(_) => Self::List,
            Value::Object(_) => Self::Object,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::List => "list",
            Self::Object => "object",
        }
    }

    /// Returns `true` if a value of this kind satisfies `primitive` without
    /// any coercion.
    pub fn satisfies(self, primitive: Primitive) -> bool {
        matches!(
            (self, primitive),
            (Self::Int, Primitive::Int)
                | (Self::Float, Primitive::Float)
                | (Self::Str, Primitive::Str)
                | (Self::Bool, Primitive::Bool)
        )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hashable form of a scalar value that can be the target of a reference.
///
/// Floats are stored by bit pattern with `-0.0` folded into `0.0`.
///
/// # Examples
///
/// ```
/// use engn_core::Scalar;
/// use serde_json::json;
///
/// assert_eq!(Scalar::from_value(&json!(7)), Some(Scalar::Int(7)));
/// assert_ne!(Scalar::from_value(&json!(7)), Scalar::from_value(&json!("7")));
/// assert_eq!(Scalar::from_value(&json!([1])), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scalar {
    Bool(bool),
    Int(i128),
    Float(u64),
    Str(String),
}

impl Scalar {
    /// Converts a JSON scalar; returns `None` for null, arrays and objects.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(Self::Bool(*b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Self::Int(i128::from(i)))
                } else if let Some(u) = n.as_u64() {
                    Some(Self::Int(i128::from(u)))
                } else {
                    n.as_f64().map(Self::float)
                }
            }
            Value::String(s) => Some(Self::Str(s.clone())),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }

    fn float(f: f64) -> Self {
        let f = if f == 0.0 { 0.0 } else { f };
        Self::Float(f.to_bits())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
            Self::Str(s) => write!(f, "{s:?}"),
        }
    }
}
