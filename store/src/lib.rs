//! Storage and configuration for engn projects.
//!
//! - [`RecordStore`] reads and writes newline-delimited JSON record files,
//!   keeping malformed lines as [`Line::Invalid`] instead of failing.
//! - [`find_module`] serves the built-in standard modules that `import`
//!   records refer to by name.
//! - [`ProjectConfig`] is the project's root record in `engn.jsonl`.
//! - [`CheckPolicy`] is the YAML-configured policy for check runs.
//!
//! # Quick start
//!
//! ```no_run
//! use engn_store::{CheckPolicy, ProjectConfig, RecordStore};
//!
//! let config = ProjectConfig::load(".").unwrap().unwrap_or_default();
//! let policy = CheckPolicy::discover(".").unwrap();
//! for root in config.scan_roots(".") {
//!     println!("would scan {}", root.display());
//! }
//!
//! let file = RecordStore::new("mbse/requirements.jsonl").read().unwrap();
//! println!("{} records, jobs = {:?}", file.records().count(), policy.jobs);
//! ```

mod config;
mod error;
mod jsonl;
mod modules;
mod policy;

pub use config::{PROJECT_CONFIG_TYPE, PROJECT_FILE, ProjectConfig};
pub use error::{Result, StoreError};
pub use jsonl::{Line, RecordFile, RecordStore, parse_bytes, parse_line, parse_str};
pub use modules::{StandardModule, find_module, standard_modules};
pub use policy::{CheckPolicy, DEFAULT_POLICY_FILE};
