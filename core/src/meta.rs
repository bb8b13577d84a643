//! The meta-schema: definition records described in their own terms.
//!
//! `type_def`, `enum` and `import` records are checked by the same
//! [`Validator`] as data records, against built-in TypeDefs named after
//! their discriminators. Only records that pass are deserialized into a
//! [`Declaration`].

use std::sync::LazyLock;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    Definition, ENUM_TAG, Enumeration, IMPORT_TAG, Import, Primitive, Problem, Property, Record,
    RecordTag, SchemaRegistry, StructuralError, TYPE_DEF_TAG, TypeDef, TypeRef, Validator,
    schema::CompiledSchema,
};

static META: LazyLock<CompiledSchema> = LazyLock::new(|| meta_registry().compile());

fn str_ref() -> TypeRef {
    TypeRef::primitive(Primitive::Str)
}

fn int_ref() -> TypeRef {
    TypeRef::primitive(Primitive::Int)
}

/// Builds the registry describing definition records.
pub fn meta_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry.define(Enumeration::new("Presence", ["required", "optional"]));
    registry.define(
        TypeDef::new("Property")
            .with_property(Property::required("name", str_ref()))
            .with_property(Property::required("type", str_ref()))
            .with_property(Property::optional("description", str_ref()))
            .with_property(Property::optional("presence", TypeRef::named("Presence")))
            .with_property(Property::optional("default", TypeRef::Any))
            .with_property(Property::optional("list_min", int_ref()))
            .with_property(Property::optional("list_max", int_ref()))
            .with_property(Property::optional("str_min", int_ref()))
            .with_property(Property::optional("str_max", int_ref()))
            .with_property(Property::optional("str_regex", str_ref()))
            .with_property(Property::optional("gt", TypeRef::Any))
            .with_property(Property::optional("ge", TypeRef::Any))
            .with_property(Property::optional("lt", TypeRef::Any))
            .with_property(Property::optional("le", TypeRef::Any))
            .with_property(Property::optional("multiple_of", TypeRef::Any))
            .with_property(Property::optional("exclude", TypeRef::list(TypeRef::Any)))
            .with_property(Property::optional(
                "whole_number",
                TypeRef::primitive(Primitive::Bool),
            )),
    );
    registry.define(
        TypeDef::new(TYPE_DEF_TAG)
            .with_property(Property::required("name", str_ref()))
            .with_property(Property::optional("description", str_ref()))
            .with_property(Property::optional("extends", str_ref()))
            .with_property(Property::optional(
                "properties",
                TypeRef::list(TypeRef::named("Property")),
            )),
    );
    registry.define(
        TypeDef::new(ENUM_TAG)
            .with_property(Property::required("name", str_ref()))
            .with_property(Property::optional("description", str_ref()))
            .with_property(Property::required("values", TypeRef::list(str_ref()))),
    );
    registry.define(
        TypeDef::new(IMPORT_TAG)
            .with_property(Property::optional("files", TypeRef::list(str_ref())))
            .with_property(Property::optional("modules", TypeRef::list(str_ref()))),
    );
    registry
}

/// The compiled meta-schema, built once per process.
pub fn meta_schema() -> &'static CompiledSchema {
    &META
}

/// A definition or import record that passed the meta-schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    Definition(Definition),
    Import(Import),
}

/// Checks a `type_def`, `enum` or `import` record and deserializes it.
///
/// Returns `Ok(None)` for data records and records without a
/// discriminator; those are not declarations.
///
/// # Errors
///
/// Every structural problem found by the meta-schema, or a single
/// [`StructuralError::InvalidDefinition`] if the record is well-formed but
/// its content is not (for example an unparsable `type` expression).
///
/// # Examples
///
/// ```
/// use engn_core::*;
/// use serde_json::json;
///
/// let ok = json!({"engn_type": "enum", "name": "Status", "values": ["active"]});
/// let record = Record::new(1, ok.as_object().unwrap().clone());
/// assert!(matches!(read_declaration(&record), Ok(Some(Declaration::Definition(_)))));
///
/// let missing = json!({"engn_type": "enum", "name": "Status"});
/// let record = Record::new(2, missing.as_object().unwrap().clone());
/// let errors = read_declaration(&record).unwrap_err();
/// assert_eq!(errors[0].kind(), "StructuralError(MissingRequired)");
/// ```
pub fn read_declaration(record: &Record) -> Result<Option<Declaration>, Vec<Problem>> {
    let Some(meta_name) = (match record.tag {
        RecordTag::TypeDef => Some(TYPE_DEF_TAG),
        RecordTag::Enumeration => Some(ENUM_TAG),
        RecordTag::Import => Some(IMPORT_TAG),
        RecordTag::Data(_) | RecordTag::Missing => None,
    }) else {
        return Ok(None);
    };

    let schema = meta_schema();
    let Some(Ok(meta_type)) = schema.get(meta_name) else {
        return Err(vec![invalid(format!("no meta-schema for '{meta_name}'"))]);
    };
    let validation = Validator::new(schema).validate_record(meta_type, &record.fields);
    if !validation.is_ok() {
        return Err(validation.errors);
    }

    let declaration = match record.tag {
        RecordTag::Import => Declaration::Import(decode::<Import>(record)?),
        RecordTag::TypeDef => Declaration::Definition(decode::<TypeDef>(record)?.into()),
        _ => Declaration::Definition(decode::<Enumeration>(record)?.into()),
    };
    Ok(Some(declaration))
}

fn decode<T: DeserializeOwned>(record: &Record) -> Result<T, Vec<Problem>> {
    serde_json::from_value(Value::Object(record.fields.clone()))
        .map_err(|err| vec![invalid(err.to_string())])
}

fn invalid(message: String) -> Problem {
    StructuralError::InvalidDefinition { message }.into()
}
