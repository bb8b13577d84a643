//! Compiled schema: an immutable validator per TypeDef.
//!
//! [`SchemaRegistry::compile`] resolves inheritance for every TypeDef,
//! binds each property's [`TypeRef`] to a [`PropertyKind`], compiles
//! `str_regex` patterns and records which `(type, field)` pairs are the
//! targets of some `ref[Type.field]`. The result is `Send + Sync` and is
//! shared read-only across scanning threads.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;

use regex::Regex;
use tracing::debug;

use crate::{Presence, Primitive, Property, SchemaError, SchemaRegistry, TypeDef, TypeRef};

/// How a property's value is checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyKind {
    Primitive(Primitive),
    Any,
    /// Member of the named Enumeration.
    Enum(String),
    /// Nested object of the named TypeDef.
    Object(String),
    /// Value of the target field's primitive type; existence is checked
    /// later against the whole dataset.
    Ref {
        target: String,
        field: String,
        primitive: Primitive,
    },
    List(Box<PropertyKind>),
    Map(Box<PropertyKind>, Box<PropertyKind>),
}

/// Value constraints carried over from the property definition.
#[derive(Debug, Clone, Default)]
pub struct Constraints {
    pub list_min: Option<usize>,
    pub list_max: Option<usize>,
    pub str_min: Option<usize>,
    pub str_max: Option<usize>,
    pub pattern: Option<Regex>,
    pub gt: Option<f64>,
    pub ge: Option<f64>,
    pub lt: Option<f64>,
    pub le: Option<f64>,
    pub multiple_of: Option<f64>,
    pub exclude: Vec<f64>,
    pub whole_number: bool,
}

/// One property of a compiled type.
#[derive(Debug, Clone)]
pub struct CompiledProperty {
    pub name: String,
    pub presence: Presence,
    pub has_default: bool,
    pub kind: PropertyKind,
    pub constraints: Constraints,
}

impl CompiledProperty {
    /// Returns `true` if a record may omit this property.
    pub fn may_be_absent(&self) -> bool {
        self.presence == Presence::Optional || self.has_default
    }
}

/// A TypeDef with inheritance flattened and types bound.
#[derive(Debug, Clone)]
pub struct CompiledType {
    name: String,
    properties: Vec<CompiledProperty>,
}

impl CompiledType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &[CompiledProperty] {
        &self.properties
    }

    pub fn property(&self, name: &str) -> Option<&CompiledProperty> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Immutable validators for every definition in a registry.
///
/// A TypeDef that fails to compile is kept with its [`SchemaError`] so that
/// every record of that type can report it.
///
/// # Examples
///
/// ```
/// use engn_core::*;
///
/// let mut registry = SchemaRegistry::new();
/// registry.define(TypeDef::new("User").with_property(Property::required("id", TypeRef::primitive(Primitive::Int))));
/// registry.define(TypeDef::new("Post").with_property(Property::required("user_id", TypeRef::reference("User", "id"))));
///
/// let schema = registry.compile();
/// assert!(schema.get("Post").unwrap().is_ok());
/// assert!(schema.is_reference_target("User", "id"));
/// assert!(schema.definition_errors().is_empty());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CompiledSchema {
    types: HashMap<String, Result<Arc<CompiledType>, SchemaError>>,
    enums: HashMap<String, HashSet<String>>,
    enum_errors: BTreeMap<String, SchemaError>,
    reference_targets: HashMap<String, BTreeSet<String>>,
}

impl CompiledSchema {
    /// Looks up a compiled TypeDef. `None` means no TypeDef has that name.
    pub fn get(&self, type_name: &str) -> Option<Result<&CompiledType, &SchemaError>> {
        self.types
            .get(type_name)
            .map(|entry| entry.as_ref().map(Arc::as_ref))
    }

    /// Returns `true` if `value` is allowed by the named Enumeration.
    pub fn enum_contains(&self, enum_name: &str, value: &str) -> bool {
        self.enums
            .get(enum_name)
            .is_some_and(|values| values.contains(value))
    }

    pub fn has_enum(&self, enum_name: &str) -> bool {
        self.enums.contains_key(enum_name)
    }

    /// Returns `true` if some `ref[type_name.field]` exists in the schema.
    pub fn is_reference_target(&self, type_name: &str, field: &str) -> bool {
        self.reference_targets
            .get(type_name)
            .is_some_and(|fields| fields.contains(field))
    }

    /// Fields of `type_name` that are targeted by references, in name order.
    pub fn reference_targets(&self, type_name: &str) -> impl Iterator<Item = &str> {
        self.reference_targets
            .get(type_name)
            .into_iter()
            .flat_map(|fields| fields.iter().map(String::as_str))
    }

    /// All compilation failures as `(definition name, error)`, sorted by name.
    pub fn definition_errors(&self) -> Vec<(&str, &SchemaError)> {
        let mut errors: Vec<(&str, &SchemaError)> = self
            .types
            .iter()
            .filter_map(|(name, entry)| entry.as_ref().err().map(|e| (name.as_str(), e)))
            .chain(self.enum_errors.iter().map(|(name, e)| (name.as_str(), e)))
            .collect();
        errors.sort_by(|a, b| a.0.cmp(b.0));
        errors
    }

    /// Number of compiled TypeDefs, including failed ones.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }
}

impl CompiledSchema {
    /// Fails every type that requires, directly or through other required
    /// nested objects, a value of its own type. Such a type has no finite
    /// valid record. Optional, defaulted, list, map and `ref` properties
    /// break the chain.
    fn reject_composition_cycles(&mut self) {
        let edges: BTreeMap<String, Vec<String>> = self
            .types
            .iter()
            .filter_map(|(name, entry)| {
                let ty = entry.as_ref().ok()?;
                let required = ty
                    .properties()
                    .iter()
                    .filter(|p| !p.may_be_absent())
                    .filter_map(|p| match &p.kind {
                        PropertyKind::Object(nested) => Some(nested.clone()),
                        _ => None,
                    })
                    .collect();
                Some((name.clone(), required))
            })
            .collect();

        let cyclic: Vec<(String, Vec<String>)> = edges
            .keys()
            .filter_map(|name| composition_cycle(name, &edges).map(|cycle| (name.clone(), cycle)))
            .collect();
        for (type_name, cycle) in cyclic {
            debug!(type_name = %type_name, ?cycle, "composition cycle");
            self.types.insert(
                type_name.clone(),
                Err(SchemaError::CyclicComposition { type_name, cycle }),
            );
        }
    }
}

/// Shortest path of required nested objects from `start` back to itself,
/// as `[start, .., start]`.
fn composition_cycle<'a>(
    start: &'a str,
    edges: &'a BTreeMap<String, Vec<String>>,
) -> Option<Vec<String>> {
    let mut parent: HashMap<&'a str, &'a str> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        for next in edges.get(node).into_iter().flatten().map(String::as_str) {
            if next == start {
                let mut back = Vec::new();
                let mut current = node;
                while current != start {
                    back.push(current.to_string());
                    current = parent.get(current).copied()?;
                }
                let mut cycle = vec![start.to_string()];
                cycle.extend(back.into_iter().rev());
                cycle.push(start.to_string());
                return Some(cycle);
            }
            if !parent.contains_key(next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    None
}

impl SchemaRegistry {
    /// Compiles every definition into an immutable [`CompiledSchema`].
    ///
    /// Compilation never fails as a whole; per-type failures are kept in
    /// the result and listed by [`CompiledSchema::definition_errors`].
    pub fn compile(&self) -> CompiledSchema {
        let mut schema = CompiledSchema::default();

        for enumeration in self.enumerations() {
            let mut values = HashSet::new();
            for value in &enumeration.values {
                if !values.insert(value.clone()) {
                    schema
                        .enum_errors
                        .entry(enumeration.name.clone())
                        .or_insert_with(|| SchemaError::DuplicateEnumValue {
                            enum_name: enumeration.name.clone(),
                            value: value.clone(),
                        });
                }
            }
            schema.enums.insert(enumeration.name.clone(), values);
        }

        for type_def in self.type_defs() {
            let mut targets = Vec::new();
            let compiled = self.compile_type(type_def, &mut targets);
            if compiled.is_ok() {
                for (target, field) in targets {
                    schema
                        .reference_targets
                        .entry(target)
                        .or_default()
                        .insert(field);
                }
            }
            schema
                .types
                .insert(type_def.name.clone(), compiled.map(Arc::new));
        }

        schema.reject_composition_cycles();
        schema
    }

    fn compile_type(
        &self,
        type_def: &TypeDef,
        targets: &mut Vec<(String, String)>,
    ) -> Result<CompiledType, SchemaError> {
        let mut seen = HashSet::new();
        for property in &type_def.properties {
            if !seen.insert(property.name.as_str()) {
                return Err(SchemaError::DuplicateProperty {
                    type_name: type_def.name.clone(),
                    property: property.name.clone(),
                });
            }
        }

        let properties = self
            .resolve(&type_def.name)?
            .iter()
            .map(|property| self.compile_property(&type_def.name, property, targets))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompiledType {
            name: type_def.name.clone(),
            properties,
        })
    }

    fn compile_property(
        &self,
        type_name: &str,
        property: &Property,
        targets: &mut Vec<(String, String)>,
    ) -> Result<CompiledProperty, SchemaError> {
        let kind = self.compile_kind(type_name, property, &property.type_ref, targets)?;

        let pattern = match &property.str_regex {
            Some(raw) => Some(Regex::new(raw).map_err(|err| SchemaError::InvalidPattern {
                type_name: type_name.to_string(),
                property: property.name.clone(),
                message: err.to_string(),
            })?),
            None => None,
        };

        if let Some(step) = property.multiple_of.filter(|step| step.is_nan() || *step <= 0.0) {
            return Err(SchemaError::InvalidConstraint {
                type_name: type_name.to_string(),
                property: property.name.clone(),
                message: format!("multiple_of must be positive, found {step}"),
            });
        }

        Ok(CompiledProperty {
            name: property.name.clone(),
            presence: property.presence,
            has_default: property.default.is_some(),
            kind,
            constraints: Constraints {
                list_min: property.list_min,
                list_max: property.list_max,
                str_min: property.str_min,
                str_max: property.str_max,
                pattern,
                gt: property.gt,
                ge: property.ge,
                lt: property.lt,
                le: property.le,
                multiple_of: property.multiple_of,
                exclude: property.exclude.clone(),
                whole_number: property.whole_number,
            },
        })
    }

    fn compile_kind(
        &self,
        type_name: &str,
        property: &Property,
        type_ref: &TypeRef,
        targets: &mut Vec<(String, String)>,
    ) -> Result<PropertyKind, SchemaError> {
        match type_ref {
            TypeRef::Primitive(primitive) => Ok(PropertyKind::Primitive(*primitive)),
            TypeRef::Any => Ok(PropertyKind::Any),
            TypeRef::Named(name) => {
                if self.get_enum(name).is_some() {
                    Ok(PropertyKind::Enum(name.clone()))
                } else if self.get_type(name).is_some() {
                    Ok(PropertyKind::Object(name.clone()))
                } else {
                    Err(SchemaError::UnknownTypeReference {
                        type_name: type_name.to_string(),
                        property: property.name.clone(),
                        referenced: name.clone(),
                    })
                }
            }
            TypeRef::Ref { target, field } => {
                let invalid = |reason: &str| SchemaError::InvalidRefTarget {
                    type_name: type_name.to_string(),
                    property: property.name.clone(),
                    target: format!("{target}.{field}"),
                    reason: reason.to_string(),
                };

                if self.get_type(target).is_none() {
                    return Err(invalid(&format!("type '{target}' is not defined")));
                }
                let resolved = self
                    .resolve(target)
                    .map_err(|err| invalid(&format!("type '{target}' is invalid: {err}")))?;
                let Some(target_property) = resolved.iter().find(|p| p.name == *field) else {
                    return Err(invalid(&format!(
                        "property '{field}' not found in type '{target}'"
                    )));
                };
                let TypeRef::Primitive(primitive) = target_property.type_ref else {
                    return Err(invalid("target property must have a primitive type"));
                };

                targets.push((target.clone(), field.clone()));
                Ok(PropertyKind::Ref {
                    target: target.clone(),
                    field: field.clone(),
                    primitive,
                })
            }
            TypeRef::List(inner) => Ok(PropertyKind::List(Box::new(
                self.compile_kind(type_name, property, inner, targets)?,
            ))),
            TypeRef::Map(key, value) => {
                let key_kind = self.compile_kind(type_name, property, key, targets)?;
                if !matches!(
                    key_kind,
                    PropertyKind::Primitive(Primitive::Str) | PropertyKind::Enum(_)
                ) {
                    return Err(SchemaError::InvalidMapKey {
                        type_name: type_name.to_string(),
                        property: property.name.clone(),
                        key: key.to_string(),
                    });
                }
                let value_kind = self.compile_kind(type_name, property, value, targets)?;
                Ok(PropertyKind::Map(Box::new(key_kind), Box::new(value_kind)))
            }
        }
    }
}
