//! Check policy: knobs that shape a check run.
//!
//! Loaded from YAML, conventionally `.engn-check.yml` at the project root.
//! Every field is optional.
//!
//! # Example YAML
//!
//! ```yaml
//! extensions:
//!   - jsonl
//! exclude_dirs:
//!   - .git
//!   - target
//! jobs: 4
//! allow_unknown_fields: false
//! unique_reference_targets: true
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Conventional policy file name.
pub const DEFAULT_POLICY_FILE: &str = ".engn-check.yml";

/// Settings for one check run.
///
/// # Examples
///
/// ```
/// use engn_store::CheckPolicy;
///
/// let policy: CheckPolicy = serde_yaml::from_str("jobs: 2\n").unwrap();
/// assert_eq!(policy.jobs, Some(2));
/// assert_eq!(policy.extensions, ["jsonl"]);
/// assert!(!policy.unique_reference_targets);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckPolicy {
    /// File extensions treated as data files when walking directories.
    pub extensions: Vec<String>,
    /// Directory names never descended into.
    pub exclude_dirs: Vec<String>,
    /// Worker threads for scanning. `None` lets the pool decide.
    pub jobs: Option<usize>,
    /// Accept record fields that the TypeDef does not declare.
    pub allow_unknown_fields: bool,
    /// Report a second record carrying an already-indexed reference target
    /// value.
    pub unique_reference_targets: bool,
}

impl Default for CheckPolicy {
    fn default() -> Self {
        Self {
            extensions: vec!["jsonl".to_string()],
            exclude_dirs: vec![".git".to_string(), "target".to_string()],
            jobs: None,
            allow_unknown_fields: false,
            unique_reference_targets: false,
        }
    }
}

impl CheckPolicy {
    /// Loads a policy from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::StoreError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let policy = serde_yaml::from_reader(reader)?;
        Ok(policy)
    }

    /// Saves the policy as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::StoreError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::StoreError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Loads `<root>/.engn-check.yml` if present, else the default policy.
    ///
    /// # Errors
    ///
    /// As [`load`](Self::load), for a policy file that exists.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self> {
        let path = root.as_ref().join(DEFAULT_POLICY_FILE);
        if path.is_file() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Returns `true` if `path` has one of the data file extensions.
    pub fn is_data_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }

    /// Returns `true` if a directory with this name is skipped.
    pub fn is_excluded_dir(&self, name: &str) -> bool {
        self.exclude_dirs.iter().any(|d| d == name)
    }
}
