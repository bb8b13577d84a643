//! Project configuration stored as a record in `engn.jsonl`.
//!
//! ```text
//! {"engn_type":"import","modules":["engn.project"]}
//! {"engn_type":"ProjectConfig","name":"rover","pm_path":"pm","sysengn_path":"mbse"}
//! ```

use std::path::{Path, PathBuf};

use engn_core::RecordTag;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::jsonl::RecordStore;

/// File at the project root that holds the [`ProjectConfig`] record.
pub const PROJECT_FILE: &str = "engn.jsonl";

/// Type name of the configuration record.
pub const PROJECT_CONFIG_TYPE: &str = "ProjectConfig";

fn default_pm_path() -> String {
    "pm".to_string()
}

fn default_sysengn_path() -> String {
    "mbse".to_string()
}

fn default_ux_path() -> String {
    "ux".to_string()
}

/// Root configuration of an engn project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub mbse_language: Option<String>,
    #[serde(default)]
    pub implementation_strategy: Option<String>,
    /// Project management data directory, relative to the root.
    #[serde(default = "default_pm_path")]
    pub pm_path: String,
    /// System engineering data directory, relative to the root.
    #[serde(default = "default_sysengn_path")]
    pub sysengn_path: String,
    /// UX data directory, relative to the root.
    #[serde(default = "default_ux_path")]
    pub ux_path: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: None,
            mbse_language: None,
            implementation_strategy: None,
            pm_path: default_pm_path(),
            sysengn_path: default_sysengn_path(),
            ux_path: default_ux_path(),
        }
    }
}

impl ProjectConfig {
    /// Reads the first `ProjectConfig` record of `<root>/engn.jsonl`.
    ///
    /// Returns `Ok(None)` when the file does not exist or holds no such
    /// record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] if the file exists but cannot be
    /// read, or [`StoreError::InvalidLine`] if the record has fields of the
    /// wrong type.
    pub fn load(root: impl AsRef<Path>) -> Result<Option<Self>> {
        let store = RecordStore::new(root.as_ref().join(PROJECT_FILE));
        if !store.exists() {
            return Ok(None);
        }

        let file = store.read()?;
        let Some(record) = file
            .records()
            .find(|r| r.tag == RecordTag::Data(PROJECT_CONFIG_TYPE.to_string()))
        else {
            debug!(path = %store.path().display(), "no ProjectConfig record");
            return Ok(None);
        };

        serde_json::from_value(record.to_value())
            .map(Some)
            .map_err(|err| StoreError::InvalidLine {
                path: store.path().to_path_buf(),
                line: record.line,
                message: err.to_string(),
            })
    }

    /// Paths a default check run covers: the project file itself plus each
    /// configured data directory that exists.
    pub fn scan_roots(&self, root: impl AsRef<Path>) -> Vec<PathBuf> {
        let root = root.as_ref();
        let mut roots = vec![root.join(PROJECT_FILE)];
        for dir in [&self.pm_path, &self.sysengn_path, &self.ux_path] {
            let path = root.join(dir);
            if path.is_dir() && !roots.contains(&path) {
                roots.push(path);
            }
        }
        roots
    }
}
