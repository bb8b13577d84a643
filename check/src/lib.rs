//! Whole-project checking for engn JSONL data.
//!
//! A check run loads every TypeDef and Enumeration reachable from its
//! targets (following `import` records), validates every data record
//! against the compiled schema, then resolves every `ref[Type.field]` value
//! against the records actually present. Everything wrong with the data
//! ends up in one [`Report`], sorted by file and line.
//!
//! # Main entry points
//!
//! - [`check`]: run a whole check and get a [`Report`].
//! - [`Checker`]: the same, with the current [`Phase`] observable.
//! - [`load_registry`]: load definitions only.
//! - [`collect_data_paths`]: the file walk used by a run.
//!
//! # Example
//!
//! ```
//! use engn_check::{CheckOptions, check};
//! use engn_store::CheckPolicy;
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::write(
//!     dir.path().join("schema.jsonl"),
//!     "{\"engn_type\":\"enum\",\"name\":\"Status\",\"values\":[\"active\",\"inactive\"]}\n",
//! )
//! .unwrap();
//! std::fs::write(
//!     dir.path().join("broken.jsonl"),
//!     "{\"engn_type\":\"enum\",\"name\":\"Status\"}\n",
//! )
//! .unwrap();
//!
//! let report = check(CheckOptions::new(vec![dir.path().to_path_buf()], CheckPolicy::default())).unwrap();
//! assert_eq!(report.error_count(), 1);
//! assert_eq!(report.diagnostics()[0].location.line, 1);
//! assert!(report.diagnostics()[0].location.path.ends_with("broken.jsonl"));
//! ```

mod checker;
mod collect;
mod error;
mod index;
mod report;

pub use checker::{CheckOptions, Checker, Phase, check, load_registry};
pub use collect::collect_data_paths;
pub use error::{CheckError, Result};
pub use index::{Address, AddressIndex, Location, PendingReference, ReferenceResolver};
pub use report::{Diagnostic, Report};
