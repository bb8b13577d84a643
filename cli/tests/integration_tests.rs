use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("engn_cli_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, rel: &str, text: &str) -> PathBuf {
        let path = self.path.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create parent dir");
        }
        fs::write(&path, text).expect("failed to write file");
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn engn(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_engn"))
        .current_dir(dir)
        .env_remove("ENGN_LOG")
        .args(args)
        .output()
        .expect("failed to run engn")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

const STATUS_ENUM: &str =
    "{\"engn_type\":\"enum\",\"name\":\"Status\",\"values\":[\"active\",\"inactive\"]}\n";

// ---------------------------------------------------------------------------
// check
// ---------------------------------------------------------------------------

#[test]
fn check_clean_directory_exits_zero() {
    let dir = TempDir::new("clean");
    dir.write("schema.jsonl", STATUS_ENUM);

    let output = engn(dir.path(), &["check", "."]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "All checks passed!\n");
}

#[test]
fn check_reports_errors_and_exits_one() {
    let dir = TempDir::new("errors");
    dir.write("valid.jsonl", STATUS_ENUM);
    dir.write("invalid.jsonl", "{\"engn_type\":\"enum\",\"name\":\"Status\"}\n");

    let output = engn(dir.path(), &["check", "."]);
    assert_eq!(output.status.code(), Some(1));
    let text = stdout(&output);
    assert!(
        text.contains("invalid.jsonl:1: StructuralError(MissingRequired)"),
        "unexpected output: {text}"
    );
    assert!(text.ends_with("Found 1 error.\n"));
}

#[test]
fn check_json_format() {
    let dir = TempDir::new("json");
    dir.write("schema.jsonl", STATUS_ENUM);
    dir.write("bad.jsonl", "not json\n");

    let output = engn(dir.path(), &["check", ".", "--format", "json"]);
    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("valid JSON");
    assert_eq!(report["error_count"], 1);
    assert_eq!(report["errors"][0]["kind"], "ParseError(InvalidJSON)");
    assert_eq!(report["errors"][0]["line"], 1);
}

#[test]
fn check_missing_target_is_fatal() {
    let dir = TempDir::new("missing");
    let output = engn(dir.path(), &["check", "nowhere"]);
    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: Target 'nowhere' not found"), "{stderr}");
}

#[test]
fn check_defaults_to_project_roots() {
    let dir = TempDir::new("project");
    dir.write(
        "engn.jsonl",
        concat!(
            "{\"engn_type\":\"import\",\"modules\":[\"engn.project\"]}\n",
            "{\"engn_type\":\"ProjectConfig\",\"name\":\"rover\",\"sysengn_path\":\"model\"}\n",
        ),
    );
    dir.write("model/status.jsonl", STATUS_ENUM);
    dir.write("model/users.jsonl", "{\"engn_type\":\"User\"}\n");
    // Outside every configured root, so never read.
    dir.write("scratch/broken.jsonl", "{{{\n");

    let output = engn(dir.path(), &["check"]);
    let text = stdout(&output);
    assert_eq!(output.status.code(), Some(1), "{text}");
    assert!(text.contains("users.jsonl:1: StructuralError(UnknownType)"), "{text}");
    assert!(!text.contains("broken.jsonl"), "{text}");
}

#[test]
fn check_unique_refs_flag() {
    let dir = TempDir::new("unique");
    dir.write(
        "schema.jsonl",
        concat!(
            "{\"engn_type\":\"type_def\",\"name\":\"User\",\"properties\":[{\"name\":\"id\",\"type\":\"int\",\"presence\":\"required\"}]}\n",
            "{\"engn_type\":\"type_def\",\"name\":\"Post\",\"properties\":[{\"name\":\"user_id\",\"type\":\"ref[User.id]\",\"presence\":\"required\"}]}\n",
        ),
    );
    dir.write(
        "data.jsonl",
        concat!(
            "{\"engn_type\":\"User\",\"id\":1}\n",
            "{\"engn_type\":\"User\",\"id\":1}\n",
            "{\"engn_type\":\"Post\",\"user_id\":1}\n",
        ),
    );

    assert_eq!(engn(dir.path(), &["check", "."]).status.code(), Some(0));

    let output = engn(dir.path(), &["check", ".", "--unique-refs", "--jobs", "2"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("data.jsonl:2: ReferenceError(DuplicateTarget)"));
}

#[test]
fn check_policy_file_is_honored() {
    let dir = TempDir::new("policy");
    dir.write("schema.jsonl", STATUS_ENUM);
    dir.write("data.ndjson", "broken\n");

    assert_eq!(engn(dir.path(), &["check", "."]).status.code(), Some(0));

    dir.write(".engn-check.yml", "extensions: [jsonl, ndjson]\n");
    let output = engn(dir.path(), &["check", "."]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("data.ndjson:1: ParseError(InvalidJSON)"));
}

// ---------------------------------------------------------------------------
// resolve
// ---------------------------------------------------------------------------

#[test]
fn resolve_prints_flattened_properties() {
    let dir = TempDir::new("resolve");
    dir.write(
        "schema.jsonl",
        concat!(
            "{\"engn_type\":\"type_def\",\"name\":\"Person\",\"properties\":[{\"name\":\"name\",\"type\":\"str\",\"presence\":\"required\"}]}\n",
            "{\"engn_type\":\"type_def\",\"name\":\"Employee\",\"extends\":\"Person\",\"properties\":[{\"name\":\"badge\",\"type\":\"int\",\"default\":0}]}\n",
        ),
    );

    let output = engn(dir.path(), &["resolve", "Employee", "."]);
    assert_eq!(output.status.code(), Some(0));
    assert_eq!(
        stdout(&output),
        "Employee\n  name: str (required)\n  badge: int (optional, default 0)\n"
    );
}

#[test]
fn resolve_cycle_is_an_error() {
    let dir = TempDir::new("resolve_cycle");
    dir.write(
        "schema.jsonl",
        concat!(
            "{\"engn_type\":\"type_def\",\"name\":\"A\",\"extends\":\"B\"}\n",
            "{\"engn_type\":\"type_def\",\"name\":\"B\",\"extends\":\"A\"}\n",
        ),
    );

    let output = engn(dir.path(), &["resolve", "A", "."]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cyclic extends chain"));
}
