//! Record discrimination.
//!
//! Every line of a data file is a JSON object whose `engn_type` field says
//! what it is. [`RecordTag`] is the closed set of answers.

use serde_json::{Map, Value};

/// Name of the discriminator field carried by every record.
pub const DISCRIMINATOR: &str = "engn_type";
/// Discriminator value of a TypeDef definition record.
pub const TYPE_DEF_TAG: &str = "type_def";
/// Discriminator value of an Enumeration definition record.
pub const ENUM_TAG: &str = "enum";
/// Discriminator value of an import record.
pub const IMPORT_TAG: &str = "import";

/// What a record is, according to its discriminator.
///
/// # Examples
///
/// ```
/// use engn_core::RecordTag;
/// use serde_json::json;
///
/// let obj = json!({"engn_type": "Task", "title": "x"});
/// assert_eq!(RecordTag::of(obj.as_object().unwrap()), RecordTag::Data("Task".into()));
///
/// let obj = json!({"engn_type": "enum", "name": "S", "values": []});
/// assert_eq!(RecordTag::of(obj.as_object().unwrap()), RecordTag::Enumeration);
///
/// let obj = json!({"name": "orphan"});
/// assert_eq!(RecordTag::of(obj.as_object().unwrap()), RecordTag::Missing);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordTag {
    TypeDef,
    Enumeration,
    Import,
    /// An instance of the named TypeDef.
    Data(String),
    /// No discriminator, or one that is not a non-empty string.
    Missing,
}

impl RecordTag {
    pub fn of(object: &Map<String, Value>) -> Self {
        match object.get(DISCRIMINATOR) {
            Some(Value::String(tag)) => match tag.as_str() {
                TYPE_DEF_TAG => Self::TypeDef,
                ENUM_TAG => Self::Enumeration,
                IMPORT_TAG => Self::Import,
                "" => Self::Missing,
                other => Self::Data(other.to_string()),
            },
            _ => Self::Missing,
        }
    }

    /// Returns `true` for records that belong to the schema itself.
    pub fn is_definition(&self) -> bool {
        matches!(self, Self::TypeDef | Self::Enumeration)
    }

    /// Returns the discriminator string, if there is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::TypeDef => Some(TYPE_DEF_TAG),
            Self::Enumeration => Some(ENUM_TAG),
            Self::Import => Some(IMPORT_TAG),
            Self::Data(name) => Some(name),
            Self::Missing => None,
        }
    }
}

/// One parsed line of a data file.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// 1-based line number within its file.
    pub line: usize,
    pub tag: RecordTag,
    pub fields: Map<String, Value>,
}

impl Record {
    /// Tags `fields` by its discriminator.
    pub fn new(line: usize, fields: Map<String, Value>) -> Self {
        Self {
            line,
            tag: RecordTag::of(&fields),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns the record as an owned JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}
