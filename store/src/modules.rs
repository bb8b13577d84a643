//! Standard modules: definition files embedded in the binary and imported
//! by name (`{"engn_type":"import","modules":["engn.project"]}`).

use std::path::PathBuf;

use crate::error::{Result, StoreError};
use crate::jsonl::{RecordFile, parse_str};

/// An embedded JSONL module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardModule {
    pub name: &'static str,
    pub source: &'static str,
}

const MODULES: &[StandardModule] = &[StandardModule {
    name: "engn.project",
    source: include_str!("../modules/project.jsonl"),
}];

impl StandardModule {
    /// Pseudo-path used to locate this module's records in reports.
    pub fn display_path(&self) -> PathBuf {
        PathBuf::from(format!("<module:{}>", self.name))
    }

    /// Parses the embedded records.
    pub fn records(&self) -> RecordFile {
        parse_str(self.display_path(), self.source)
    }
}

/// All available standard modules, in name order.
pub fn standard_modules() -> &'static [StandardModule] {
    MODULES
}

/// Looks up a standard module by name.
///
/// # Errors
///
/// Returns [`StoreError::UnknownModule`] if no module has that name.
///
/// # Examples
///
/// ```
/// let module = engn_store::find_module("engn.project").unwrap();
/// assert!(module.records().records().count() > 0);
/// assert!(engn_store::find_module("engn.nothing").is_err());
/// ```
pub fn find_module(name: &str) -> Result<&'static StandardModule> {
    MODULES
        .iter()
        .find(|module| module.name == name)
        .ok_or_else(|| StoreError::UnknownModule(name.to_string()))
}

#[cfg(test)]
mod tests {
    use engn_core::{Declaration, Definition, read_declaration};

    use super::*;

    #[test]
    fn test_every_module_is_valid_definitions() {
        for module in standard_modules() {
            let file = module.records();
            assert_eq!(file.invalid().count(), 0, "{}", module.name);
            for record in file.records() {
                assert!(
                    matches!(read_declaration(record), Ok(Some(Declaration::Definition(_)))),
                    "{} line {}",
                    module.name,
                    record.line
                );
            }
        }
    }

    #[test]
    fn test_project_module_defines_project_config() {
        let module = find_module("engn.project").unwrap();
        assert_eq!(module.display_path(), PathBuf::from("<module:engn.project>"));

        let file = module.records();
        let record = file.records().next().unwrap();
        let Ok(Some(Declaration::Definition(Definition::TypeDef(def)))) = read_declaration(record) else {
            panic!("engn.project should define a TypeDef");
        };
        assert_eq!(def.name, "ProjectConfig");
        for field in ["name", "pm_path", "sysengn_path", "ux_path"] {
            assert!(def.find_property(field).is_some(), "missing {field}");
        }
    }
}
