//! Check reports.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use engn_core::Problem;

use crate::index::Location;

/// One problem found at one place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub location: Location,
    pub problem: Problem,
}

impl Diagnostic {
    pub fn new(location: Location, problem: impl Into<Problem>) -> Self {
        Self {
            location,
            problem: problem.into(),
        }
    }

    /// `Family(Code)`, e.g. `ReferenceError(DanglingReference)`.
    pub fn kind(&self) -> String {
        self.problem.kind()
    }

    pub fn message(&self) -> String {
        self.problem.to_string()
    }
}

impl Serialize for Diagnostic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Diagnostic", 4)?;
        state.serialize_field("path", &self.location.path.display().to_string())?;
        state.serialize_field("line", &self.location.line)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", &self.message())?;
        state.end()
    }
}

/// Outcome of a check run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    files_checked: usize,
    records_checked: usize,
    error_count: usize,
    errors: Vec<Diagnostic>,
}

impl Report {
    /// Builds a report, ordering diagnostics by file path then line. Problems
    /// on the same line keep the order they were found in.
    pub fn new(mut diagnostics: Vec<Diagnostic>, files_checked: usize, records_checked: usize) -> Self {
        diagnostics.sort_by(|a, b| a.location.cmp(&b.location));
        Self {
            files_checked,
            records_checked,
            error_count: diagnostics.len(),
            errors: diagnostics,
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.errors
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn files_checked(&self) -> usize {
        self.files_checked
    }

    pub fn records_checked(&self) -> usize {
        self.records_checked
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Human-readable rendering, one `path:line: Kind: message` line per
    /// problem followed by the total.
    ///
    /// # Examples
    ///
    /// ```
    /// use engn_check::Report;
    ///
    /// assert_eq!(Report::new(Vec::new(), 2, 10).render_text(), "All checks passed!\n");
    /// ```
    pub fn render_text(&self) -> String {
        if self.is_success() {
            return "All checks passed!\n".to_string();
        }

        let mut out = String::new();
        for diagnostic in &self.errors {
            out.push_str(&format!(
                "{}: {}: {}\n",
                diagnostic.location,
                diagnostic.kind(),
                diagnostic.message()
            ));
        }
        let noun = if self.error_count == 1 { "error" } else { "errors" };
        out.push_str(&format!("Found {} {noun}.\n", self.error_count));
        out
    }

    /// Pretty-printed JSON rendering.
    ///
    /// # Errors
    ///
    /// Returns the serializer error, which does not happen for well-formed
    /// reports.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use engn_core::{ParseError, StructuralError};

    use super::*;

    fn sample() -> Report {
        Report::new(
            vec![
                Diagnostic::new(
                    Location::new("b.jsonl", 2),
                    StructuralError::MissingRequired { field: "name".into() },
                ),
                Diagnostic::new(
                    Location::new("a.jsonl", 9),
                    ParseError::InvalidJson { message: "EOF".into() },
                ),
                Diagnostic::new(
                    Location::new("b.jsonl", 1),
                    StructuralError::UnknownType { discriminator: None },
                ),
            ],
            2,
            5,
        )
    }

    #[test]
    fn test_sorted_by_path_then_line() {
        let at: Vec<String> = sample().diagnostics().iter().map(|d| d.location.to_string()).collect();
        assert_eq!(at, ["a.jsonl:9", "b.jsonl:1", "b.jsonl:2"]);
    }

    #[test]
    fn test_render_text() {
        let text = sample().render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "a.jsonl:9: ParseError(InvalidJSON): invalid JSON: EOF");
        assert_eq!(
            lines[2],
            "b.jsonl:2: StructuralError(MissingRequired): missing required property 'name'"
        );
        assert_eq!(lines[3], "Found 3 errors.");
    }

    #[test]
    fn test_json_shape() {
        let value: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(value["error_count"], 3);
        assert_eq!(value["files_checked"], 2);
        assert_eq!(value["errors"][0]["path"], "a.jsonl");
        assert_eq!(value["errors"][0]["line"], 9);
        assert_eq!(value["errors"][0]["kind"], "ParseError(InvalidJSON)");
    }
}
