//! Schema type definitions for engn data files.
//!
//! This module defines the declarative model stored in JSONL definition
//! records: [`TypeDef`], [`Property`], [`Enumeration`] and [`Import`], plus
//! the [`TypeRef`] expression language used in a property's `type` field.
//! All types serialize with [`serde`] in the exact shape they take on disk.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

static IDENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

static REF_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*)\.([A-Za-z_][A-Za-z0-9_]*)$")
        .expect("reference pattern is valid")
});

/// Scalar primitive types.
///
/// # Examples
///
/// ```
/// use engn_core::Primitive;
///
/// assert_eq!(Primitive::from_name("float"), Some(Primitive::Float));
/// assert_eq!(Primitive::Str.to_string(), "str");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Int,
    Str,
    Float,
    Bool,
}

impl Primitive {
    /// Returns the primitive named by `name`, if any.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(Self::Int),
            "str" => Some(Self::Str),
            "float" => Some(Self::Float),
            "bool" => Some(Self::Bool),
            _ => None,
        }
    }

    /// Returns the name used in type expressions.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Str => "str",
            Self::Float => "float",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced when a property's `type` string is not a valid type
/// expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid type expression '{expr}': {reason}")]
pub struct TypeExprError {
    /// The rejected expression.
    pub expr: String,
    /// Why it was rejected.
    pub reason: String,
}

impl TypeExprError {
    fn new(expr: &str, reason: impl Into<String>) -> Self {
        Self {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}

/// A parsed property type expression.
///
/// The textual grammar is:
///
/// - `int`, `str`, `float`, `bool`: primitives
/// - `any`: any JSON value
/// - `Name`: a TypeDef (nested object) or an Enumeration
/// - `ref[Type.field]`: a reference to `field` of some `Type` record
/// - `list[T]` and `map[K, V]`: collections
///
/// `TypeRef` serializes as its expression string.
///
/// # Examples
///
/// ```
/// use engn_core::{Primitive, TypeRef};
///
/// let ty: TypeRef = "list[ref[User.id]]".parse().unwrap();
/// assert_eq!(
///     ty,
///     TypeRef::List(Box::new(TypeRef::Ref {
///         target: "User".into(),
///         field: "id".into(),
///     }))
/// );
/// assert_eq!(ty.to_string(), "list[ref[User.id]]");
///
/// assert!("ref[User]".parse::<TypeRef>().is_err());
/// assert_eq!("int".parse::<TypeRef>().unwrap(), TypeRef::Primitive(Primitive::Int));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    /// Scalar primitive.
    Primitive(Primitive),
    /// Any JSON value.
    Any,
    /// A TypeDef or Enumeration, resolved against the registry.
    Named(String),
    /// `ref[target.field]`.
    Ref { target: String, field: String },
    /// `list[T]`.
    List(Box<TypeRef>),
    /// `map[K, V]`.
    Map(Box<TypeRef>, Box<TypeRef>),
}

impl TypeRef {
    /// Shorthand for a primitive type.
    pub fn primitive(primitive: Primitive) -> Self {
        Self::Primitive(primitive)
    }

    /// Shorthand for a named TypeDef or Enumeration.
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Shorthand for `ref[target.field]`.
    pub fn reference(target: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Ref {
            target: target.into(),
            field: field.into(),
        }
    }

    /// Shorthand for `list[inner]`.
    pub fn list(inner: TypeRef) -> Self {
        Self::List(Box::new(inner))
    }
}

impl FromStr for TypeRef {
    type Err = TypeExprError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let trimmed = expr.trim();
        if trimmed.is_empty() {
            return Err(TypeExprError::new(expr, "type cannot be empty"));
        }

        if let Some(inner) = generic_body(trimmed, "list") {
            return Ok(Self::List(Box::new(inner.parse()?)));
        }

        if let Some(inner) = generic_body(trimmed, "map") {
            let Some((key, value)) = split_top_level_comma(inner) else {
                return Err(TypeExprError::new(expr, "must be in format map[K, V]"));
            };
            return Ok(Self::Map(
                Box::new(key.parse()?),
                Box::new(value.parse()?),
            ));
        }

        if let Some(inner) = generic_body(trimmed, "ref") {
            let Some(caps) = REF_TARGET.captures(inner.trim()) else {
                return Err(TypeExprError::new(
                    expr,
                    "must be in format ref[Type.field]",
                ));
            };
            return Ok(Self::Ref {
                target: caps[1].to_string(),
                field: caps[2].to_string(),
            });
        }

        if trimmed == "any" {
            return Ok(Self::Any);
        }
        if let Some(primitive) = Primitive::from_name(trimmed) {
            return Ok(Self::Primitive(primitive));
        }
        if IDENT.is_match(trimmed) {
            return Ok(Self::Named(trimmed.to_string()));
        }

        Err(TypeExprError::new(expr, "unrecognized type"))
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeExprError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(p) => write!(f, "{p}"),
            Self::Any => f.write_str("any"),
            Self::Named(name) => f.write_str(name),
            Self::Ref { target, field } => write!(f, "ref[{target}.{field}]"),
            Self::List(inner) => write!(f, "list[{inner}]"),
            Self::Map(key, value) => write!(f, "map[{key}, {value}]"),
        }
    }
}

/// Returns the text between `name[` and the closing `]`.
fn generic_body<'a>(expr: &'a str, name: &str) -> Option<&'a str> {
    expr.strip_prefix(name)?
        .strip_prefix('[')?
        .strip_suffix(']')
}

/// Splits `K, V` at the first comma not nested inside brackets.
fn split_top_level_comma(inner: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (idx, ch) in inner.char_indices() {
        match ch {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => return Some((&inner[..idx], &inner[idx + 1..])),
            _ => {}
        }
    }
    None
}

/// Whether a property must be present on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    Required,
    /// Properties are optional unless declared otherwise.
    #[default]
    Optional,
}

/// Reads an explicit `null` as the field's default, the same as an absent
/// field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A named, typed field of a [`TypeDef`].
///
/// Use [`Property::required`] or [`Property::optional`] and chain the
/// builder methods for constraints.
///
/// # Examples
///
/// ```
/// use engn_core::{Presence, Primitive, Property, TypeRef};
///
/// let code = Property::required("code", TypeRef::primitive(Primitive::Str))
///     .with_str_bounds(Some(2), Some(8))
///     .with_pattern("^[A-Z]+$");
/// assert_eq!(code.presence, Presence::Required);
/// assert_eq!(code.str_max, Some(8));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(rename = "type")]
    pub type_ref: TypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub presence: Presence,
    /// Value assumed when the property is absent; makes the property
    /// effectively optional.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_min: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list_max: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub str_min: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub str_max: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub str_regex: Option<String>,
    /// Exclusive lower bound of a numeric value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,
    /// Inclusive lower bound of a numeric value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ge: Option<f64>,
    /// Exclusive upper bound of a numeric value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,
    /// Inclusive upper bound of a numeric value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub le: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
    /// Numeric values that are never allowed.
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub exclude: Vec<f64>,
    /// Numeric values must have no fractional part.
    #[serde(default, skip_serializing_if = "std::ops::Not::not", deserialize_with = "null_as_default")]
    pub whole_number: bool,
}

impl Property {
    /// Creates a property with the given presence and no constraints.
    pub fn new(name: impl Into<String>, type_ref: TypeRef, presence: Presence) -> Self {
        Self {
            name: name.into(),
            type_ref,
            description: None,
            presence,
            default: None,
            list_min: None,
            list_max: None,
            str_min: None,
            str_max: None,
            str_regex: None,
            gt: None,
            ge: None,
            lt: None,
            le: None,
            multiple_of: None,
            exclude: Vec::new(),
            whole_number: false,
        }
    }

    /// Creates a required property.
    pub fn required(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self::new(name, type_ref, Presence::Required)
    }

    /// Creates an optional property.
    pub fn optional(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self::new(name, type_ref, Presence::Optional)
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Bounds the number of elements of a list value.
    pub fn with_list_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.list_min = min;
        self.list_max = max;
        self
    }

    /// Bounds the character count of a string value.
    pub fn with_str_bounds(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.str_min = min;
        self.str_max = max;
        self
    }

    /// Requires string values to match `pattern`.
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.str_regex = Some(pattern.to_string());
        self
    }

    /// Sets the exclusive (`gt`, `lt`) bounds of a numeric value.
    pub fn with_exclusive_range(mut self, gt: Option<f64>, lt: Option<f64>) -> Self {
        self.gt = gt;
        self.lt = lt;
        self
    }

    /// Sets the inclusive (`ge`, `le`) bounds of a numeric value.
    pub fn with_inclusive_range(mut self, ge: Option<f64>, le: Option<f64>) -> Self {
        self.ge = ge;
        self.le = le;
        self
    }

    pub fn with_multiple_of(mut self, step: f64) -> Self {
        self.multiple_of = Some(step);
        self
    }

    pub fn with_excluded(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.exclude = values.into_iter().collect();
        self
    }

    pub fn with_whole_number(mut self) -> Self {
        self.whole_number = true;
        self
    }

    /// Returns `true` if a record may omit this property.
    pub fn may_be_absent(&self) -> bool {
        self.presence == Presence::Optional || self.default.is_some()
    }
}

/// A named record schema, optionally extending another TypeDef.
///
/// # Examples
///
/// ```
/// use engn_core::{Primitive, Property, TypeDef, TypeRef};
///
/// let employee = TypeDef::new("Employee")
///     .extending("Person")
///     .with_property(Property::required("badge", TypeRef::primitive(Primitive::Int)));
/// assert_eq!(employee.extends.as_deref(), Some("Person"));
/// assert!(employee.find_property("badge").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Vec<Property>,
}

impl TypeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            extends: None,
            properties: Vec::new(),
        }
    }

    /// Sets the parent type.
    pub fn extending(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// Finds a property declared directly on this type (not inherited).
    pub fn find_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// A named closed set of string values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enumeration {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub values: Vec<String>,
}

impl Enumeration {
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: None,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Returns `true` if `value` is one of the allowed values.
    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

/// A record that pulls further files or standard modules into a check run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Import {
    /// Paths relative to the importing file.
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub files: Vec<String>,
    /// Names of built-in standard modules (e.g. `engn.project`).
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "null_as_default")]
    pub modules: Vec<String>,
}

/// A schema definition as stored in a JSONL file, tagged by the
/// `engn_type` discriminator.
///
/// # Examples
///
/// ```
/// use engn_core::{Definition, Enumeration};
///
/// let def = Definition::from(Enumeration::new("Status", ["active", "inactive"]));
/// let line = serde_json::to_string(&def).unwrap();
/// assert_eq!(
///     line,
///     r#"{"engn_type":"enum","name":"Status","values":["active","inactive"]}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "engn_type")]
pub enum Definition {
    #[serde(rename = "type_def")]
    TypeDef(TypeDef),
    #[serde(rename = "enum")]
    Enumeration(Enumeration),
}

impl Definition {
    /// Returns the defined name.
    pub fn name(&self) -> &str {
        match self {
            Self::TypeDef(def) => &def.name,
            Self::Enumeration(def) => &def.name,
        }
    }

    pub fn as_type_def(&self) -> Option<&TypeDef> {
        match self {
            Self::TypeDef(def) => Some(def),
            Self::Enumeration(_) => None,
        }
    }

    pub fn as_enumeration(&self) -> Option<&Enumeration> {
        match self {
            Self::Enumeration(def) => Some(def),
            Self::TypeDef(_) => None,
        }
    }
}

impl From<TypeDef> for Definition {
    fn from(def: TypeDef) -> Self {
        Self::TypeDef(def)
    }
}

impl From<Enumeration> for Definition {
    fn from(def: Enumeration) -> Self {
        Self::Enumeration(def)
    }
}
