//! Error taxonomy for schema checking.
//!
//! All of these are *local* problems: they are collected into a report and
//! never abort a run. Each family has a `code()` naming the variant, used
//! together with the family name in reports (`StructuralError(MissingRequired)`).

use thiserror::Error;

use crate::ValueKind;

/// A line that is not a JSON object.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid JSON: {message}")]
    InvalidJson { message: String },
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: ValueKind },
    #[error("invalid UTF-8: {message}")]
    InvalidUtf8 { message: String },
}

impl ParseError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidJson { .. } => "InvalidJSON",
            Self::NotAnObject { .. } => "NotAnObject",
            Self::InvalidUtf8 { .. } => "InvalidUTF8",
        }
    }
}

/// A record or value that does not fit its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("missing required property '{field}'")]
    MissingRequired { field: String },

    #[error("property '{field}' expects {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: ValueKind,
    },

    #[error("property '{field}' value {value:?} is not a member of enumeration '{enumeration}'")]
    InvalidEnumValue {
        field: String,
        enumeration: String,
        value: String,
    },

    #[error("{}", unknown_type_message(.discriminator))]
    UnknownType { discriminator: Option<String> },

    #[error("unknown property '{field}'")]
    UnknownField { field: String },

    #[error("property '{field}' {message}")]
    ConstraintViolation { field: String, message: String },

    #[error("invalid definition: {message}")]
    InvalidDefinition { message: String },

    #[error("cannot import '{import}': {reason}")]
    UnresolvedImport { import: String, reason: String },
}

fn unknown_type_message(discriminator: &Option<String>) -> String {
    match discriminator {
        Some(name) => format!("engn_type '{name}' does not name a defined type"),
        None => "record has no engn_type discriminator".to_string(),
    }
}

impl StructuralError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingRequired { .. } => "MissingRequired",
            Self::TypeMismatch { .. } => "TypeMismatch",
            Self::InvalidEnumValue { .. } => "InvalidEnumValue",
            Self::UnknownType { .. } => "UnknownType",
            Self::UnknownField { .. } => "UnknownField",
            Self::ConstraintViolation { .. } => "ConstraintViolation",
            Self::InvalidDefinition { .. } => "InvalidDefinition",
            Self::UnresolvedImport { .. } => "UnresolvedImport",
        }
    }
}

/// A TypeDef or Enumeration that cannot be compiled.
///
/// Every record of an affected type fails with the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("type '{type_name}' has a cyclic extends chain: {}", .cycle.join(" -> "))]
    CyclicExtends {
        type_name: String,
        cycle: Vec<String>,
    },

    #[error("type '{type_name}' extends undefined type '{parent}'")]
    UnknownParent { type_name: String, parent: String },

    #[error("type '{type_name}' is not defined")]
    UndefinedType { type_name: String },

    #[error("unknown type '{referenced}' referenced in property '{type_name}.{property}'")]
    UnknownTypeReference {
        type_name: String,
        property: String,
        referenced: String,
    },

    #[error("property '{type_name}.{property}' has invalid reference target '{target}': {reason}")]
    InvalidRefTarget {
        type_name: String,
        property: String,
        target: String,
        reason: String,
    },

    #[error("property '{type_name}.{property}' has map key type '{key}'; keys must be str or an enumeration")]
    InvalidMapKey {
        type_name: String,
        property: String,
        key: String,
    },

    #[error("type '{type_name}' declares property '{property}' more than once")]
    DuplicateProperty { type_name: String, property: String },

    #[error("enumeration '{enum_name}' lists value {value:?} more than once")]
    DuplicateEnumValue { enum_name: String, value: String },

    #[error("property '{type_name}.{property}' has invalid str_regex: {message}")]
    InvalidPattern {
        type_name: String,
        property: String,
        message: String,
    },

    #[error("property '{type_name}.{property}' has an invalid constraint: {message}")]
    InvalidConstraint {
        type_name: String,
        property: String,
        message: String,
    },

    #[error("type '{type_name}' cannot be instantiated: required properties nest in a cycle: {}", .cycle.join(" -> "))]
    CyclicComposition {
        type_name: String,
        cycle: Vec<String>,
    },
}

impl SchemaError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::CyclicExtends { .. } => "CyclicExtends",
            Self::UnknownParent { .. } => "UnknownParent",
            Self::UndefinedType { .. } => "UndefinedType",
            Self::UnknownTypeReference { .. } => "UnknownTypeReference",
            Self::InvalidRefTarget { .. } => "InvalidRefTarget",
            Self::InvalidMapKey { .. } => "InvalidMapKey",
            Self::DuplicateProperty { .. } => "DuplicateProperty",
            Self::DuplicateEnumValue { .. } => "DuplicateEnumValue",
            Self::InvalidPattern { .. } => "InvalidPattern",
            Self::InvalidConstraint { .. } => "InvalidConstraint",
            Self::CyclicComposition { .. } => "CyclicComposition",
        }
    }
}

/// A reference that does not resolve against the full dataset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("property '{field}' references {target_type}.{target_field} = {value}, which does not exist")]
    DanglingReference {
        field: String,
        target_type: String,
        target_field: String,
        value: String,
    },

    #[error("{target_type}.{target_field} = {value} is already defined at {first}")]
    DuplicateTarget {
        target_type: String,
        target_field: String,
        value: String,
        first: String,
    },
}

impl ReferenceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::DanglingReference { .. } => "DanglingReference",
            Self::DuplicateTarget { .. } => "DuplicateTarget",
        }
    }
}

/// Any local problem found while checking.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Problem {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Structural(#[from] StructuralError),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Reference(#[from] ReferenceError),
}

impl Problem {
    /// Family name: `ParseError`, `StructuralError`, `SchemaError` or
    /// `ReferenceError`.
    pub fn family(&self) -> &'static str {
        match self {
            Self::Parse(_) => "ParseError",
            Self::Structural(_) => "StructuralError",
            Self::Schema(_) => "SchemaError",
            Self::Reference(_) => "ReferenceError",
        }
    }

    /// Variant name within the family.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Parse(e) => e.code(),
            Self::Structural(e) => e.code(),
            Self::Schema(e) => e.code(),
            Self::Reference(e) => e.code(),
        }
    }

    /// `Family(Code)`, e.g. `StructuralError(MissingRequired)`.
    pub fn kind(&self) -> String {
        format!("{}({})", self.family(), self.code())
    }
}
