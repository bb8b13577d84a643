//! Data file collection.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use engn_store::CheckPolicy;

use crate::error::{CheckError, Result};

/// Collects data files from target files and directories.
///
/// Directories are walked depth-first with entries in lexicographic name
/// order, skipping the policy's excluded directory names and keeping files
/// with a data extension. A target named explicitly as a file is kept
/// whatever its extension. Targets are visited in the given order and a
/// file reached twice is listed once.
///
/// # Errors
///
/// - [`CheckError::InvalidInput`] if `targets` is empty.
/// - [`CheckError::TargetNotFound`] if a target does not exist.
/// - [`CheckError::Io`] if a directory cannot be listed.
pub fn collect_data_paths(targets: &[PathBuf], policy: &CheckPolicy) -> Result<Vec<PathBuf>> {
    if targets.is_empty() {
        return Err(CheckError::InvalidInput(
            "No check targets were provided".to_string(),
        ));
    }

    let mut paths = Vec::new();
    for target in targets {
        if target.is_dir() {
            walk(target, policy, &mut paths)?;
        } else if target.is_file() {
            paths.push(target.clone());
        } else {
            return Err(CheckError::TargetNotFound(target.clone()));
        }
    }

    let mut seen = HashSet::new();
    paths.retain(|path| seen.insert(path.clone()));
    Ok(paths)
}

fn walk(dir: &Path, policy: &CheckPolicy, paths: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries = fs::read_dir(dir)?.collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            let excluded = entry
                .file_name()
                .to_str()
                .is_some_and(|name| policy.is_excluded_dir(name));
            if !excluded {
                walk(&path, policy, paths)?;
            }
        } else if path.is_file() && policy.is_data_file(&path) {
            paths.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_walk_is_depth_first_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        for rel in ["b.jsonl", "a/z.jsonl", "a/b/c.jsonl", "c.jsonl", "a/notes.txt", ".git/x.jsonl"] {
            touch(&root.join(rel));
        }

        let paths = collect_data_paths(&[root.to_path_buf()], &CheckPolicy::default()).unwrap();
        let rel: Vec<_> = paths
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, ["a/b/c.jsonl", "a/z.jsonl", "b.jsonl", "c.jsonl"]);
    }

    #[test]
    fn test_explicit_file_ignores_extension() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("data.txt");
        touch(&file);
        let paths = collect_data_paths(&[file.clone()], &CheckPolicy::default()).unwrap();
        assert_eq!(paths, [file]);
    }

    #[test]
    fn test_overlapping_targets_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.jsonl");
        touch(&file);
        let targets = [file.clone(), dir.path().to_path_buf()];
        assert_eq!(collect_data_paths(&targets, &CheckPolicy::default()).unwrap(), [file]);
    }

    #[test]
    fn test_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = collect_data_paths(&[missing.clone()], &CheckPolicy::default()).unwrap_err();
        assert!(matches!(err, CheckError::TargetNotFound(path) if path == missing));
    }

    #[test]
    fn test_no_targets() {
        assert!(matches!(
            collect_data_paths(&[], &CheckPolicy::default()),
            Err(CheckError::InvalidInput(_))
        ));
    }
}
