//! Core model for self-describing engn JSONL data.
//!
//! This crate defines the schema language and everything needed to check a
//! single record against it:
//!
//! - [`TypeDef`], [`Property`], [`Enumeration`] and [`Import`]: the
//!   definition records, with [`TypeRef`] as the property type language.
//! - [`SchemaRegistry`]: definitions for one run, with inheritance
//!   resolution ([`SchemaRegistry::resolve`]).
//! - [`CompiledSchema`]: an immutable, thread-shareable validator set
//!   produced by [`SchemaRegistry::compile`].
//! - [`Validator`]: checks record fields against a compiled type and
//!   collects reference values for later resolution.
//! - [`read_declaration`]: checks definition records against the built-in
//!   meta-schema before they enter a registry.
//!
//! Problems are reported as [`Problem`] values grouped in four families:
//! [`ParseError`], [`StructuralError`], [`SchemaError`] and
//! [`ReferenceError`].
//!
//! # Example
//!
//! ```
//! use engn_core::*;
//! use serde_json::json;
//!
//! let mut registry = SchemaRegistry::new();
//! registry.define(Enumeration::new("Status", ["active", "inactive"]));
//! registry.define(
//!     TypeDef::new("User")
//!         .with_property(Property::required("id", TypeRef::primitive(Primitive::Int)))
//!         .with_property(Property::optional("status", TypeRef::named("Status"))),
//! );
//! registry.define(
//!     TypeDef::new("Post")
//!         .with_property(Property::required("user_id", TypeRef::reference("User", "id"))),
//! );
//!
//! let schema = registry.compile();
//! assert!(schema.definition_errors().is_empty());
//!
//! let post = json!({"engn_type": "Post", "user_id": 1});
//! let record = Record::new(1, post.as_object().unwrap().clone());
//! let RecordTag::Data(type_name) = &record.tag else { unreachable!() };
//!
//! let validation = Validator::new(&schema)
//!     .validate_record(schema.get(type_name).unwrap().unwrap(), &record.fields);
//! assert!(validation.is_ok());
//! assert_eq!(validation.references[0].value, Scalar::Int(1));
//! ```

mod error;
mod meta;
mod record;
mod registry;
pub mod schema;
mod types;
mod validate;
mod value;

pub use error::{ParseError, Problem, ReferenceError, SchemaError, StructuralError};
pub use meta::{Declaration, meta_registry, meta_schema, read_declaration};
pub use record::{DISCRIMINATOR, ENUM_TAG, IMPORT_TAG, Record, RecordTag, TYPE_DEF_TAG};
pub use registry::{DefineOutcome, SchemaRegistry};
pub use schema::{CompiledSchema, CompiledType, PropertyKind};
pub use types::*;
pub use validate::{ReferenceUse, Validation, Validator};
pub use value::{Scalar, ValueKind};
