//! Property and record validation.
//!
//! Checks values against a [`CompiledSchema`], collecting every problem
//! rather than stopping at the first. Reference-typed values are only
//! type-checked here; the values themselves are handed back in
//! [`Validation::references`] so existence can be checked once the whole
//! dataset has been seen.
//!
//! # Examples
//!
//! ```
//! use engn_core::*;
//! use serde_json::json;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.define(Enumeration::new("Status", ["active", "inactive"]));
//! registry.define(
//!     TypeDef::new("Account")
//!         .with_property(Property::required("id", TypeRef::primitive(Primitive::Int)))
//!         .with_property(Property::optional("status", TypeRef::named("Status"))),
//! );
//! let schema = registry.compile();
//! let account = schema.get("Account").unwrap().unwrap();
//! let validator = Validator::new(&schema);
//!
//! let ok = json!({"engn_type": "Account", "id": 1, "status": "active"});
//! assert!(validator.validate_record(account, ok.as_object().unwrap()).is_ok());
//!
//! let bad = json!({"engn_type": "Account", "status": "gone"});
//! let codes: Vec<_> = validator
//!     .validate_record(account, bad.as_object().unwrap())
//!     .errors
//!     .iter()
//!     .map(Problem::code)
//!     .collect();
//! assert_eq!(codes, ["MissingRequired", "InvalidEnumValue"]);
//! ```

use serde_json::{Map, Value};

use crate::schema::{CompiledProperty, CompiledSchema, CompiledType, Constraints, PropertyKind};
use crate::{DISCRIMINATOR, Problem, Scalar, StructuralError, ValueKind};

/// A reference value found while validating, to be resolved later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceUse {
    /// Path of the referencing value within its record.
    pub field: String,
    pub target_type: String,
    pub target_field: String,
    pub value: Scalar,
}

/// Everything found while validating one value or record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validation {
    pub errors: Vec<Problem>,
    pub references: Vec<ReferenceUse>,
}

impl Validation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn push(&mut self, problem: impl Into<Problem>) {
        self.errors.push(problem.into());
    }
}

/// Validates values against a compiled schema.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'s> {
    schema: &'s CompiledSchema,
    allow_unknown_fields: bool,
}

impl<'s> Validator<'s> {
    pub fn new(schema: &'s CompiledSchema) -> Self {
        Self {
            schema,
            allow_unknown_fields: false,
        }
    }

    /// Accept fields a TypeDef does not declare instead of reporting
    /// [`StructuralError::UnknownField`].
    pub fn allow_unknown_fields(mut self, allow: bool) -> Self {
        self.allow_unknown_fields = allow;
        self
    }

    /// Validates one (possibly absent) value against one property.
    pub fn validate_property(
        &self,
        property: &CompiledProperty,
        value: Option<&Value>,
    ) -> Validation {
        let mut out = Validation::default();
        self.check_property(property, value, &property.name, &mut out);
        out
    }

    /// Validates a record's fields against its TypeDef. The discriminator
    /// field is ignored.
    pub fn validate_record(&self, ty: &CompiledType, fields: &Map<String, Value>) -> Validation {
        let mut out = Validation::default();
        self.check_fields(ty, fields, "", &mut out);
        out
    }

    fn check_fields(
        &self,
        ty: &CompiledType,
        fields: &Map<String, Value>,
        prefix: &str,
        out: &mut Validation,
    ) {
        for property in ty.properties() {
            let path = join_field(prefix, &property.name);
            self.check_property(property, fields.get(&property.name), &path, out);
        }

        if self.allow_unknown_fields {
            return;
        }
        for key in fields.keys() {
            if key != DISCRIMINATOR && ty.property(key).is_none() {
                out.push(StructuralError::UnknownField {
                    field: join_field(prefix, key),
                });
            }
        }
    }

    fn check_property(
        &self,
        property: &CompiledProperty,
        value: Option<&Value>,
        path: &str,
        out: &mut Validation,
    ) {
        match value {
            None | Some(Value::Null) => {
                if !property.may_be_absent() {
                    out.push(StructuralError::MissingRequired {
                        field: path.to_string(),
                    });
                }
            }
            Some(value) => self.check_value(&property.kind, &property.constraints, value, path, out),
        }
    }

    fn check_value(
        &self,
        kind: &PropertyKind,
        constraints: &Constraints,
        value: &Value,
        path: &str,
        out: &mut Validation,
    ) {
        match kind {
            PropertyKind::Any => {}
            PropertyKind::Primitive(primitive) => {
                if ValueKind::of(value).satisfies(*primitive) {
                    check_scalar(value, constraints, path, out);
                } else {
                    out.push(mismatch(path, primitive.as_str(), value));
                }
            }
            PropertyKind::Enum(enum_name) => match value {
                Value::String(s) if self.schema.enum_contains(enum_name, s) => {}
                Value::String(s) => out.push(StructuralError::InvalidEnumValue {
                    field: path.to_string(),
                    enumeration: enum_name.clone(),
                    value: s.clone(),
                }),
                other => out.push(mismatch(path, enum_name, other)),
            },
            PropertyKind::Object(type_name) => {
                let Value::Object(fields) = value else {
                    out.push(mismatch(path, type_name, value));
                    return;
                };
                match self.schema.get(type_name) {
                    Some(Ok(ty)) => self.check_fields(ty, fields, path, out),
                    Some(Err(err)) => out.push(err.clone()),
                    None => out.push(StructuralError::UnknownType {
                        discriminator: Some(type_name.clone()),
                    }),
                }
            }
            PropertyKind::Ref {
                target,
                field,
                primitive,
            } => {
                let scalar = Scalar::from_value(value)
                    .filter(|_| ValueKind::of(value).satisfies(*primitive));
                match scalar {
                    Some(scalar) => {
                        check_scalar(value, constraints, path, out);
                        out.references.push(ReferenceUse {
                            field: path.to_string(),
                            target_type: target.clone(),
                            target_field: field.clone(),
                            value: scalar,
                        });
                    }
                    None => out.push(mismatch(
                        path,
                        &format!("{primitive} (ref[{target}.{field}])"),
                        value,
                    )),
                }
            }
            PropertyKind::List(inner) => {
                let Value::Array(items) = value else {
                    out.push(mismatch(path, "list", value));
                    return;
                };
                if let Some(min) = constraints.list_min.filter(|min| items.len() < *min) {
                    out.push(violation(path, format!("must have at least {min} item(s), found {}", items.len())));
                }
                if let Some(max) = constraints.list_max.filter(|max| items.len() > *max) {
                    out.push(violation(path, format!("must have at most {max} item(s), found {}", items.len())));
                }
                for (idx, item) in items.iter().enumerate() {
                    self.check_value(inner, constraints, item, &format!("{path}[{idx}]"), out);
                }
            }
            PropertyKind::Map(key_kind, value_kind) => {
                let Value::Object(entries) = value else {
                    out.push(mismatch(path, "map", value));
                    return;
                };
                for (key, item) in entries {
                    let item_path = format!("{path}[{key:?}]");
                    if let PropertyKind::Enum(enum_name) = key_kind.as_ref() {
                        if !self.schema.enum_contains(enum_name, key) {
                            out.push(StructuralError::InvalidEnumValue {
                                field: item_path.clone(),
                                enumeration: enum_name.clone(),
                                value: key.clone(),
                            });
                        }
                    }
                    self.check_value(value_kind, constraints, item, &item_path, out);
                }
            }
        }
    }
}

fn join_field(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

fn mismatch(path: &str, expected: &str, value: &Value) -> StructuralError {
    StructuralError::TypeMismatch {
        field: path.to_string(),
        expected: expected.to_string(),
        found: ValueKind::of(value),
    }
}

fn violation(path: &str, message: String) -> StructuralError {
    StructuralError::ConstraintViolation {
        field: path.to_string(),
        message,
    }
}

fn check_scalar(value: &Value, constraints: &Constraints, path: &str, out: &mut Validation) {
    match value {
        Value::String(s) => check_string(s, constraints, path, out),
        Value::Number(n) => {
            if let Some(n) = n.as_f64() {
                check_number(n, constraints, path, out);
            }
        }
        _ => {}
    }
}

fn check_number(n: f64, constraints: &Constraints, path: &str, out: &mut Validation) {
    if let Some(gt) = constraints.gt.filter(|gt| n <= *gt) {
        out.push(violation(path, format!("must be greater than {gt}, found {n}")));
    }
    if let Some(ge) = constraints.ge.filter(|ge| n < *ge) {
        out.push(violation(path, format!("must be greater than or equal to {ge}, found {n}")));
    }
    if let Some(lt) = constraints.lt.filter(|lt| n >= *lt) {
        out.push(violation(path, format!("must be less than {lt}, found {n}")));
    }
    if let Some(le) = constraints.le.filter(|le| n > *le) {
        out.push(violation(path, format!("must be less than or equal to {le}, found {n}")));
    }
    if let Some(step) = constraints.multiple_of.filter(|step| !is_whole(n / *step)) {
        out.push(violation(path, format!("must be a multiple of {step}, found {n}")));
    }
    if constraints.exclude.contains(&n) {
        out.push(violation(path, format!("value {n} is excluded")));
    }
    if constraints.whole_number && !is_whole(n) {
        out.push(violation(path, format!("must be a whole number, found {n}")));
    }
}

/// Integral up to float rounding (`0.3 / 0.1` counts).
fn is_whole(n: f64) -> bool {
    (n - n.round()).abs() <= 1e-9 * n.abs().max(1.0)
}

fn check_string(s: &str, constraints: &Constraints, path: &str, out: &mut Validation) {
    let len = s.chars().count();
    if let Some(min) = constraints.str_min.filter(|min| len < *min) {
        out.push(violation(path, format!("must be at least {min} character(s), found {len}")));
    }
    if let Some(max) = constraints.str_max.filter(|max| len > *max) {
        out.push(violation(path, format!("must be at most {max} character(s), found {len}")));
    }
    if let Some(pattern) = &constraints.pattern {
        if !pattern.is_match(s) {
            out.push(violation(path, format!("must match pattern '{}'", pattern.as_str())));
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        Enumeration, Primitive, Property, SchemaError, SchemaRegistry, TypeDef, TypeRef,
    };

    fn schema() -> CompiledSchema {
        let mut registry = SchemaRegistry::new();
        registry.define(Enumeration::new("Status", ["active", "inactive"]));
        registry.define(
            TypeDef::new("Address")
                .with_property(Property::required("street", TypeRef::primitive(Primitive::Str)))
                .with_property(Property::optional("zip", TypeRef::primitive(Primitive::Int))),
        );
        registry.define(
            TypeDef::new("User")
                .with_property(Property::required("id", TypeRef::primitive(Primitive::Int)))
                .with_property(Property::optional("name", TypeRef::primitive(Primitive::Str))),
        );
        registry.define(
            TypeDef::new("Person")
                .with_property(Property::required("name", TypeRef::primitive(Primitive::Str)))
                .with_property(Property::optional("score", TypeRef::primitive(Primitive::Float)))
                .with_property(Property::optional("active", TypeRef::primitive(Primitive::Bool)))
                .with_property(Property::optional("status", TypeRef::named("Status")))
                .with_property(Property::optional("address", TypeRef::named("Address")))
                .with_property(
                    Property::optional("tags", TypeRef::list(TypeRef::primitive(Primitive::Str)))
                        .with_list_bounds(Some(1), Some(3))
                        .with_str_bounds(None, Some(5)),
                )
                .with_property(Property::optional("labels", "map[Status, int]".parse().unwrap()))
                .with_property(Property::optional("owner", TypeRef::reference("User", "id")))
                .with_property(
                    Property::optional("code", TypeRef::primitive(Primitive::Str)).with_pattern("^[A-Z]{3}$"),
                )
                .with_property(
                    Property::required("rank", TypeRef::primitive(Primitive::Int)).with_default(json!(0)),
                ),
        );
        registry.compile()
    }

    fn check(value: Value) -> Validation {
        let schema = schema();
        let person = schema.get("Person").unwrap().unwrap().clone();
        Validator::new(&schema).validate_record(&person, value.as_object().unwrap())
    }

    fn codes(v: &Validation) -> Vec<&'static str> {
        v.errors.iter().map(Problem::code).collect()
    }

    #[test]
    fn test_missing_required_reports_exactly_once() {
        let v = check(json!({"engn_type": "Person"}));
        assert_eq!(
            v.errors,
            vec![Problem::from(StructuralError::MissingRequired {
                field: "name".into()
            })]
        );
    }

    #[test]
    fn test_null_counts_as_absent() {
        let v = check(json!({"name": null, "score": null}));
        assert_eq!(codes(&v), ["MissingRequired"]);
    }

    #[test]
    fn test_no_coercion_between_primitives() {
        let v = check(json!({"name": 5, "score": 1, "active": "true"}));
        assert_eq!(codes(&v), ["TypeMismatch", "TypeMismatch", "TypeMismatch"]);
        assert!(check(json!({"name": "a", "score": 1.0, "active": false})).is_ok());
    }

    #[test]
    fn test_enum_membership() {
        for allowed in ["active", "inactive"] {
            assert!(check(json!({"name": "a", "status": allowed})).is_ok());
        }
        let v = check(json!({"name": "a", "status": "archived"}));
        assert_eq!(
            v.errors,
            vec![Problem::from(StructuralError::InvalidEnumValue {
                field: "status".into(),
                enumeration: "Status".into(),
                value: "archived".into(),
            })]
        );
        assert_eq!(codes(&check(json!({"name": "a", "status": 1}))), ["TypeMismatch"]);
    }

    #[test]
    fn test_nested_object_paths() {
        let v = check(json!({"name": "a", "address": {"zip": "x", "floor": 2}}));
        let fields: Vec<String> = v.errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            fields,
            [
                "missing required property 'address.street'",
                "property 'address.zip' expects int, found str",
                "unknown property 'address.floor'",
            ]
        );
        assert_eq!(codes(&check(json!({"name": "a", "address": "here"}))), ["TypeMismatch"]);
    }

    #[test]
    fn test_list_bounds_and_items() {
        assert!(check(json!({"name": "a", "tags": ["x", "y"]})).is_ok());
        assert_eq!(codes(&check(json!({"name": "a", "tags": []}))), ["ConstraintViolation"]);
        assert_eq!(
            codes(&check(json!({"name": "a", "tags": ["a", "b", "c", "d"]}))),
            ["ConstraintViolation"]
        );
        let v = check(json!({"name": "a", "tags": ["ok", 3, "toolong"]}));
        let messages: Vec<String> = v.errors.iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            [
                "property 'tags[1]' expects str, found int",
                "property 'tags[2]' must be at most 5 character(s), found 7",
            ]
        );
    }

    #[test]
    fn test_map_keys_and_values() {
        assert!(check(json!({"name": "a", "labels": {"active": 1}})).is_ok());
        let v = check(json!({"name": "a", "labels": {"bogus": "x"}}));
        assert_eq!(codes(&v), ["InvalidEnumValue", "TypeMismatch"]);
    }

    #[test]
    fn test_pattern_constraint() {
        assert!(check(json!({"name": "a", "code": "ABC"})).is_ok());
        assert_eq!(codes(&check(json!({"name": "a", "code": "abc"}))), ["ConstraintViolation"]);
    }

    #[test]
    fn test_reference_is_type_checked_and_deferred() {
        let v = check(json!({"name": "a", "owner": 7}));
        assert!(v.is_ok());
        assert_eq!(
            v.references,
            vec![ReferenceUse {
                field: "owner".into(),
                target_type: "User".into(),
                target_field: "id".into(),
                value: Scalar::Int(7),
            }]
        );

        let v = check(json!({"name": "a", "owner": "7"}));
        assert_eq!(codes(&v), ["TypeMismatch"]);
        assert!(v.references.is_empty());
    }

    #[test]
    fn test_unknown_fields_can_be_allowed() {
        let schema = schema();
        let person = schema.get("Person").unwrap().unwrap();
        let value = json!({"name": "a", "extra": true});
        let fields = value.as_object().unwrap();
        assert_eq!(
            codes(&Validator::new(&schema).validate_record(person, fields)),
            ["UnknownField"]
        );
        assert!(Validator::new(&schema)
            .allow_unknown_fields(true)
            .validate_record(person, fields)
            .is_ok());
    }

    #[test]
    fn test_validate_single_property() {
        let schema = schema();
        let person = schema.get("Person").unwrap().unwrap();
        let validator = Validator::new(&schema);
        let name = person.property("name").unwrap();
        assert!(validator.validate_property(name, Some(&json!("x"))).is_ok());
        assert_eq!(codes(&validator.validate_property(name, None)), ["MissingRequired"]);
        let score = person.property("score").unwrap();
        assert!(validator.validate_property(score, None).is_ok());
    }

    #[test]
    fn test_nested_object_of_broken_type_reports_schema_error() {
        let mut registry = SchemaRegistry::new();
        registry.define(TypeDef::new("Loop").extending("Loop"));
        registry.define(TypeDef::new("Holder").with_property(Property::required("inner", TypeRef::named("Loop"))));
        let schema = registry.compile();
        let holder = schema.get("Holder").unwrap().unwrap();
        let value = json!({"inner": {}});
        let v = Validator::new(&schema).validate_record(holder, value.as_object().unwrap());
        assert!(matches!(
            v.errors.as_slice(),
            [Problem::Schema(SchemaError::CyclicExtends { .. })]
        ));
    }

    fn single_type(type_def: TypeDef) -> CompiledSchema {
        let mut registry = SchemaRegistry::new();
        registry.define(type_def);
        registry.compile()
    }

    fn messages_for(schema: &CompiledSchema, type_name: &str, value: Value) -> Vec<String> {
        let ty = schema.get(type_name).unwrap().unwrap();
        Validator::new(schema)
            .validate_record(ty, value.as_object().unwrap())
            .errors
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_numeric_bounds_and_step() {
        let schema = single_type(
            TypeDef::new("Person").with_property(
                Property::required("age", TypeRef::primitive(Primitive::Int))
                    .with_exclusive_range(Some(0.0), None)
                    .with_inclusive_range(None, Some(120.0))
                    .with_multiple_of(2.0),
            ),
        );
        assert!(messages_for(&schema, "Person", json!({"age": 30})).is_empty());
        assert_eq!(
            messages_for(&schema, "Person", json!({"age": 0})),
            ["property 'age' must be greater than 0, found 0"]
        );
        assert_eq!(
            messages_for(&schema, "Person", json!({"age": 122})),
            ["property 'age' must be less than or equal to 120, found 122"]
        );
        assert_eq!(
            messages_for(&schema, "Person", json!({"age": 31})),
            ["property 'age' must be a multiple of 2, found 31"]
        );
    }

    #[test]
    fn test_numeric_exclusions_and_whole_numbers() {
        let schema = single_type(
            TypeDef::new("ScoreBoard").with_property(
                Property::required("score", TypeRef::primitive(Primitive::Float))
                    .with_inclusive_range(Some(0.0), None)
                    .with_exclusive_range(None, Some(100.0))
                    .with_excluded([50.0, 50.5])
                    .with_whole_number(),
            ),
        );
        assert!(messages_for(&schema, "ScoreBoard", json!({"score": 10.0})).is_empty());
        assert_eq!(
            messages_for(&schema, "ScoreBoard", json!({"score": -1.0})),
            ["property 'score' must be greater than or equal to 0, found -1"]
        );
        assert_eq!(
            messages_for(&schema, "ScoreBoard", json!({"score": 100.0})),
            ["property 'score' must be less than 100, found 100"]
        );
        assert_eq!(
            messages_for(&schema, "ScoreBoard", json!({"score": 50.0})),
            ["property 'score' value 50 is excluded"]
        );
        assert_eq!(
            messages_for(&schema, "ScoreBoard", json!({"score": 10.5})),
            ["property 'score' must be a whole number, found 10.5"]
        );
    }

    #[test]
    fn test_numeric_constraints_apply_to_list_items() {
        let schema = single_type(TypeDef::new("Series").with_property(
            Property::required("points", TypeRef::list(TypeRef::primitive(Primitive::Int)))
                .with_inclusive_range(Some(1.0), Some(9.0)),
        ));
        assert_eq!(
            messages_for(&schema, "Series", json!({"points": [1, 10]})),
            ["property 'points[1]' must be less than or equal to 9, found 10"]
        );
    }

    #[test]
    fn test_string_constraints_apply_to_string_references() {
        let mut registry = SchemaRegistry::new();
        registry.define(
            TypeDef::new("Tag").with_property(Property::required("slug", TypeRef::primitive(Primitive::Str))),
        );
        registry.define(
            TypeDef::new("Post").with_property(
                Property::required("tag", TypeRef::reference("Tag", "slug"))
                    .with_str_bounds(None, Some(4))
                    .with_pattern("^[a-z]+$"),
            ),
        );
        let schema = registry.compile();
        assert!(messages_for(&schema, "Post", json!({"tag": "rust"})).is_empty());
        assert_eq!(
            messages_for(&schema, "Post", json!({"tag": "Rusty"})),
            [
                "property 'tag' must be at most 4 character(s), found 5",
                "property 'tag' must match pattern '^[a-z]+$'",
            ]
        );
    }
}
