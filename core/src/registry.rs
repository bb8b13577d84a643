//! Schema registry: the set of TypeDef and Enumeration definitions known
//! to one check run.
//!
//! Definitions may be added in any order; inheritance is resolved lazily
//! and memoized until the next change. [`SchemaRegistry::compile`] (in
//! [`crate::schema`]) turns a complete registry into validators.

use std::cell::RefCell;
use std::collections::HashMap;

use tracing::debug;

use crate::{Definition, Enumeration, Property, SchemaError, TypeDef};

/// Result of [`SchemaRegistry::define`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineOutcome {
    /// The name was new.
    Inserted,
    /// An identical definition already existed; nothing changed.
    Unchanged,
    /// A different definition with the same name was replaced.
    Replaced,
}

/// TypeDef and Enumeration definitions, keyed by name.
///
/// TypeDefs and Enumerations share one namespace.
///
/// # Examples
///
/// ```
/// use engn_core::*;
///
/// let mut registry = SchemaRegistry::new();
/// registry.define(
///     TypeDef::new("Person").with_property(Property::required("name", TypeRef::primitive(Primitive::Str))),
/// );
/// registry.define(
///     TypeDef::new("Employee")
///         .extending("Person")
///         .with_property(Property::required("badge", TypeRef::primitive(Primitive::Int))),
/// );
///
/// let names: Vec<String> = registry
///     .resolve("Employee")
///     .unwrap()
///     .into_iter()
///     .map(|p| p.name)
///     .collect();
/// assert_eq!(names, ["name", "badge"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    definitions: HashMap<String, Definition>,
    resolved: RefCell<HashMap<String, Result<Vec<Property>, SchemaError>>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or overwrites a definition by name.
    ///
    /// Redefining a name with identical content is a no-op; different
    /// content replaces the previous definition.
    pub fn define(&mut self, definition: impl Into<Definition>) -> DefineOutcome {
        let definition = definition.into();
        let name = definition.name().to_string();

        let outcome = match self.definitions.get(&name) {
            Some(existing) if *existing == definition => return DefineOutcome::Unchanged,
            Some(_) => {
                debug!(name = %name, "replacing existing definition");
                DefineOutcome::Replaced
            }
            None => DefineOutcome::Inserted,
        };

        self.definitions.insert(name, definition);
        self.resolved.borrow_mut().clear();
        outcome
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        self.definitions.get(name).and_then(Definition::as_type_def)
    }

    pub fn get_enum(&self, name: &str) -> Option<&Enumeration> {
        self.definitions.get(name).and_then(Definition::as_enumeration)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.definitions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns all defined names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.definitions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Returns all TypeDefs, sorted by name.
    pub fn type_defs(&self) -> Vec<&TypeDef> {
        let mut defs: Vec<&TypeDef> = self
            .definitions
            .values()
            .filter_map(Definition::as_type_def)
            .collect();
        defs.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Returns all Enumerations, sorted by name.
    pub fn enumerations(&self) -> Vec<&Enumeration> {
        let mut defs: Vec<&Enumeration> = self
            .definitions
            .values()
            .filter_map(Definition::as_enumeration)
            .collect();
        defs.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Returns the flattened property list of `type_name`.
    ///
    /// Ancestor properties come first in declaration order; a property
    /// redeclared by a nearer type replaces the inherited one in place.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::UndefinedType`] if `type_name` is not a TypeDef.
    /// - [`SchemaError::UnknownParent`] if an `extends` names no TypeDef.
    /// - [`SchemaError::CyclicExtends`] if the chain revisits a type.
    pub fn resolve(&self, type_name: &str) -> Result<Vec<Property>, SchemaError> {
        if let Some(hit) = self.resolved.borrow().get(type_name) {
            return hit.clone();
        }

        let mut path = Vec::new();
        let result = self.resolve_on_path(type_name, &mut path);
        self.resolved
            .borrow_mut()
            .insert(type_name.to_string(), result.clone());
        result
    }

    fn resolve_on_path(
        &self,
        type_name: &str,
        path: &mut Vec<String>,
    ) -> Result<Vec<Property>, SchemaError> {
        let Some(type_def) = self.get_type(type_name) else {
            return Err(SchemaError::UndefinedType {
                type_name: type_name.to_string(),
            });
        };

        if let Some(start) = path.iter().position(|seen| seen == type_name) {
            let cycle = path[start..]
                .iter()
                .cloned()
                .chain(std::iter::once(type_name.to_string()))
                .collect();
            return Err(SchemaError::CyclicExtends {
                type_name: type_name.to_string(),
                cycle,
            });
        }

        let mut properties = match &type_def.extends {
            Some(parent) => {
                if self.get_type(parent).is_none() {
                    return Err(SchemaError::UnknownParent {
                        type_name: type_name.to_string(),
                        parent: parent.clone(),
                    });
                }
                path.push(type_name.to_string());
                let inherited = self.resolve_on_path(parent, path);
                path.pop();
                inherited?
            }
            None => Vec::new(),
        };

        for property in &type_def.properties {
            match properties.iter_mut().find(|p| p.name == property.name) {
                Some(slot) => *slot = property.clone(),
                None => properties.push(property.clone()),
            }
        }

        Ok(properties)
    }
}
