//! Cross-file reference resolution.
//!
//! While scanning, every valid record contributes the values of its fields
//! that some `ref[Type.field]` points at ([`ReferenceResolver::index_record`])
//! and every reference value it carries ([`ReferenceResolver::defer`]).
//! Nothing is resolved until all files have been seen.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use engn_core::{CompiledSchema, ReferenceError, ReferenceUse, Scalar};
use serde_json::{Map, Value};

use crate::report::Diagnostic;

/// Where a record lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location {
    pub path: PathBuf,
    /// 1-based line number.
    pub line: usize,
}

impl Location {
    pub fn new(path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            path: path.into(),
            line,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path.display(), self.line)
    }
}

/// A referenceable value: `type_name.field == value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub type_name: String,
    pub field: String,
    pub value: Scalar,
}

impl Address {
    pub fn new(type_name: impl Into<String>, field: impl Into<String>, value: Scalar) -> Self {
        Self {
            type_name: type_name.into(),
            field: field.into(),
            value,
        }
    }
}

/// Every known address with the records that carry it.
#[derive(Debug, Clone, Default)]
pub struct AddressIndex {
    entries: HashMap<Address, Vec<Location>>,
}

impl AddressIndex {
    pub fn insert(&mut self, address: Address, location: Location) {
        self.entries.entry(address).or_default().push(location);
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.entries.contains_key(address)
    }

    /// Locations carrying `address`, in insertion order.
    pub fn locations(&self, address: &Address) -> &[Location] {
        self.entries.get(address).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct addresses.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn merge(&mut self, other: AddressIndex) {
        for (address, locations) in other.entries {
            self.entries.entry(address).or_default().extend(locations);
        }
    }
}

/// A reference value waiting for the index to be complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReference {
    pub location: Location,
    pub reference: ReferenceUse,
}

/// Collects targets and references, then checks one against the other.
///
/// # Examples
///
/// ```
/// use engn_check::{Location, ReferenceResolver};
/// use engn_core::*;
/// use serde_json::json;
///
/// let mut registry = SchemaRegistry::new();
/// registry.define(TypeDef::new("User").with_property(Property::required("id", TypeRef::primitive(Primitive::Int))));
/// registry.define(TypeDef::new("Post").with_property(Property::required("user_id", TypeRef::reference("User", "id"))));
/// let schema = registry.compile();
///
/// let mut resolver = ReferenceResolver::new();
/// let user = json!({"engn_type": "User", "id": 1});
/// resolver.index_record(&schema, "User", user.as_object().unwrap(), Location::new("users.jsonl", 1));
/// resolver.defer(
///     Location::new("posts.jsonl", 1),
///     vec![ReferenceUse {
///         field: "user_id".into(),
///         target_type: "User".into(),
///         target_field: "id".into(),
///         value: Scalar::Int(2),
///     }],
/// );
///
/// let diagnostics = resolver.resolve(false);
/// assert_eq!(diagnostics.len(), 1);
/// assert_eq!(diagnostics[0].kind(), "ReferenceError(DanglingReference)");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReferenceResolver {
    index: AddressIndex,
    pending: Vec<PendingReference>,
}

impl ReferenceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes the reference-target fields of one record of `type_name`.
    ///
    /// Only fields targeted by some reference in `schema` are indexed.
    /// Records of a subtype are indexed under their own type only.
    pub fn index_record(
        &mut self,
        schema: &CompiledSchema,
        type_name: &str,
        fields: &Map<String, Value>,
        location: Location,
    ) {
        for field in schema.reference_targets(type_name) {
            if let Some(value) = fields.get(field).and_then(Scalar::from_value) {
                self.index
                    .insert(Address::new(type_name, field, value), location.clone());
            }
        }
    }

    /// Queues a record's reference values for resolution.
    pub fn defer(&mut self, location: Location, references: Vec<ReferenceUse>) {
        self.pending
            .extend(references.into_iter().map(|reference| PendingReference {
                location: location.clone(),
                reference,
            }));
    }

    /// Folds another (per-file) resolver into this one.
    pub fn merge(&mut self, other: ReferenceResolver) {
        self.index.merge(other.index);
        self.pending.extend(other.pending);
    }

    pub fn index(&self) -> &AddressIndex {
        &self.index
    }

    pub fn pending(&self) -> &[PendingReference] {
        &self.pending
    }

    /// Checks every pending reference against the completed index.
    ///
    /// With `unique_targets`, every record after the first (in location
    /// order) that carries an already-indexed address is also reported.
    pub fn resolve(self, unique_targets: bool) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();

        for PendingReference {
            location,
            reference,
        } in &self.pending
        {
            let address = Address::new(
                reference.target_type.as_str(),
                reference.target_field.as_str(),
                reference.value.clone(),
            );
            if !self.index.contains(&address) {
                diagnostics.push(Diagnostic::new(
                    location.clone(),
                    ReferenceError::DanglingReference {
                        field: reference.field.clone(),
                        target_type: reference.target_type.clone(),
                        target_field: reference.target_field.clone(),
                        value: reference.value.to_string(),
                    },
                ));
            }
        }

        if unique_targets {
            for (address, locations) in &self.index.entries {
                if locations.len() < 2 {
                    continue;
                }
                let mut sorted = locations.clone();
                sorted.sort();
                let first = sorted[0].to_string();
                for repeat in sorted.into_iter().skip(1) {
                    diagnostics.push(Diagnostic::new(
                        repeat,
                        ReferenceError::DuplicateTarget {
                            target_type: address.type_name.clone(),
                            target_field: address.field.clone(),
                            value: address.value.to_string(),
                            first: first.clone(),
                        },
                    ));
                }
            }
        }

        diagnostics.sort_by(|a, b| a.location.cmp(&b.location));
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use engn_core::{Primitive, Property, SchemaRegistry, TypeDef, TypeRef};
    use serde_json::json;

    use super::*;

    fn schema() -> CompiledSchema {
        let mut registry = SchemaRegistry::new();
        registry.define(
            TypeDef::new("User")
                .with_property(Property::required("id", TypeRef::primitive(Primitive::Int)))
                .with_property(Property::optional("email", TypeRef::primitive(Primitive::Str))),
        );
        registry.define(TypeDef::new("Admin").extending("User"));
        registry.define(
            TypeDef::new("Post")
                .with_property(Property::required("user_id", TypeRef::reference("User", "id"))),
        );
        registry.compile()
    }

    fn user_ref(value: Scalar) -> ReferenceUse {
        ReferenceUse {
            field: "user_id".into(),
            target_type: "User".into(),
            target_field: "id".into(),
            value,
        }
    }

    fn index_user(resolver: &mut ReferenceResolver, schema: &CompiledSchema, id: i64, at: Location) {
        let user = json!({"engn_type": "User", "id": id, "email": "a@b"});
        resolver.index_record(schema, "User", user.as_object().unwrap(), at);
    }

    #[test]
    fn test_only_targeted_fields_are_indexed() {
        let schema = schema();
        let mut resolver = ReferenceResolver::new();
        index_user(&mut resolver, &schema, 1, Location::new("u.jsonl", 1));
        assert_eq!(resolver.index().len(), 1);
        assert!(resolver.index().contains(&Address::new("User", "id", Scalar::Int(1))));
    }

    #[test]
    fn test_subtype_not_indexed_under_parent() {
        let schema = schema();
        let mut resolver = ReferenceResolver::new();
        let admin = json!({"engn_type": "Admin", "id": 1});
        resolver.index_record(&schema, "Admin", admin.as_object().unwrap(), Location::new("a.jsonl", 1));
        resolver.defer(Location::new("p.jsonl", 1), vec![user_ref(Scalar::Int(1))]);
        assert_eq!(resolver.resolve(false).len(), 1);
    }

    #[test]
    fn test_value_identity_is_typed() {
        let schema = schema();
        let mut resolver = ReferenceResolver::new();
        index_user(&mut resolver, &schema, 1, Location::new("u.jsonl", 1));
        resolver.defer(
            Location::new("p.jsonl", 3),
            vec![user_ref(Scalar::Int(1)), user_ref(Scalar::Str("1".into()))],
        );
        let diagnostics = resolver.resolve(false);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].message(),
            "property 'user_id' references User.id = \"1\", which does not exist"
        );
    }

    #[test]
    fn test_merge_combines_partial_results() {
        let schema = schema();
        let mut users = ReferenceResolver::new();
        index_user(&mut users, &schema, 7, Location::new("u.jsonl", 1));
        let mut posts = ReferenceResolver::new();
        posts.defer(Location::new("p.jsonl", 1), vec![user_ref(Scalar::Int(7))]);

        let mut merged = ReferenceResolver::new();
        merged.merge(posts);
        merged.merge(users);
        assert_eq!(merged.pending().len(), 1);
        assert!(merged.resolve(false).is_empty());
    }

    #[test]
    fn test_duplicates_only_reported_when_unique() {
        let schema = schema();
        let build = || {
            let mut resolver = ReferenceResolver::new();
            index_user(&mut resolver, &schema, 1, Location::new("b.jsonl", 4));
            index_user(&mut resolver, &schema, 1, Location::new("a.jsonl", 2));
            index_user(&mut resolver, &schema, 1, Location::new("b.jsonl", 1));
            resolver.defer(Location::new("p.jsonl", 1), vec![user_ref(Scalar::Int(1))]);
            resolver
        };

        assert!(build().resolve(false).is_empty());

        let diagnostics = build().resolve(true);
        let at: Vec<String> = diagnostics.iter().map(|d| d.location.to_string()).collect();
        assert_eq!(at, ["b.jsonl:1", "b.jsonl:4"]);
        assert!(diagnostics[0].message().ends_with("already defined at a.jsonl:2"));
    }
}
