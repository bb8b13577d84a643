//! Newline-delimited JSON record files.
//!
//! Each non-blank line of a file is one record. Reading never fails on a
//! bad line: the line is kept as [`Line::Invalid`] with its 1-based number
//! so the caller can report it alongside everything else.
//!
//! # Examples
//!
//! ```
//! use engn_store::{Line, parse_str};
//!
//! let file = parse_str("tasks.jsonl", "{\"engn_type\":\"Task\"}\n\nnot json\n");
//! assert_eq!(file.lines.len(), 2);
//! assert!(matches!(file.lines[0], Line::Record(_)));
//! assert!(matches!(file.lines[1], Line::Invalid { line: 3, .. }));
//! ```

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use engn_core::{Declaration, Definition, ParseError, Record, ValueKind, read_declaration};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Result, StoreError};

/// One non-blank line of a record file.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Record(Record),
    Invalid { line: usize, error: ParseError },
}

impl Line {
    /// 1-based line number.
    pub fn line(&self) -> usize {
        match self {
            Self::Record(record) => record.line,
            Self::Invalid { line, .. } => *line,
        }
    }
}

/// The parsed lines of one file, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFile {
    pub source: PathBuf,
    pub lines: Vec<Line>,
}

impl RecordFile {
    /// Well-formed records only.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.lines.iter().filter_map(|line| match line {
            Line::Record(record) => Some(record),
            Line::Invalid { .. } => None,
        })
    }

    /// Lines that failed to parse, as `(line, error)`.
    pub fn invalid(&self) -> impl Iterator<Item = (usize, &ParseError)> {
        self.lines.iter().filter_map(|line| match line {
            Line::Invalid { line, error } => Some((*line, error)),
            Line::Record(_) => None,
        })
    }
}

/// Parses a single line into a JSON object.
///
/// # Errors
///
/// [`ParseError::InvalidJson`] if the text is not JSON,
/// [`ParseError::NotAnObject`] if it is JSON but not an object.
pub fn parse_line(text: &str) -> std::result::Result<Map<String, Value>, ParseError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(other) => Err(ParseError::NotAnObject {
            found: ValueKind::of(&other),
        }),
        Err(err) => Err(ParseError::InvalidJson {
            message: err.to_string(),
        }),
    }
}

/// Parses file content. Blank lines are skipped but still counted.
pub fn parse_str(source: impl Into<PathBuf>, text: &str) -> RecordFile {
    parse_bytes(source, text.as_bytes())
}

/// Parses raw file bytes. Each line is decoded on its own, so a line that
/// is not UTF-8 becomes [`ParseError::InvalidUtf8`] without affecting the
/// rest of the file.
pub fn parse_bytes(source: impl Into<PathBuf>, bytes: &[u8]) -> RecordFile {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let lines = bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .filter_map(|(idx, raw)| {
            let line = idx + 1;
            let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
            match std::str::from_utf8(raw) {
                Ok(text) if text.trim().is_empty() => None,
                Ok(text) => Some(match parse_line(text) {
                    Ok(fields) => Line::Record(Record::new(line, fields)),
                    Err(error) => Line::Invalid { line, error },
                }),
                Err(err) => Some(Line::Invalid {
                    line,
                    error: ParseError::InvalidUtf8 {
                        message: err.to_string(),
                    },
                }),
            }
        })
        .collect();

    RecordFile {
        source: source.into(),
        lines,
    }
}

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// A JSONL file on disk.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Reads and parses every line.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] if the file cannot be read.
    /// Malformed lines, including lines that are not UTF-8, are not errors.
    pub fn read(&self) -> Result<RecordFile> {
        let bytes = fs::read(&self.path)?;
        let file = parse_bytes(&self.path, &bytes);
        debug!(path = %self.path.display(), lines = file.lines.len(), "read record file");
        Ok(file)
    }

    /// Replaces the file with `records`, one per line. Parent directories
    /// are created as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] or [`StoreError::JsonError`].
    pub fn write<'a>(&self, records: impl IntoIterator<Item = &'a Map<String, Value>>) -> Result<()> {
        self.ensure_parent()?;
        let mut writer = BufWriter::new(fs::File::create(&self.path)?);
        for fields in records {
            serde_json::to_writer(&mut writer, fields)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Appends one record as a new line, creating the file if needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] or [`StoreError::JsonError`].
    pub fn append(&self, fields: &Map<String, Value>) -> Result<()> {
        self.ensure_parent()?;
        let needs_newline = fs::read(&self.path)
            .map(|bytes| bytes.last().is_some_and(|b| *b != b'\n'))
            .unwrap_or(false);

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut line = serde_json::to_string(fields)?;
        if needs_newline {
            line.insert(0, '\n');
        }
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Replaces the file with the given definitions.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::IoError`] or [`StoreError::JsonError`].
    pub fn write_definitions(&self, definitions: &[Definition]) -> Result<()> {
        self.ensure_parent()?;
        let mut writer = BufWriter::new(fs::File::create(&self.path)?);
        for definition in definitions {
            serde_json::to_writer(&mut writer, definition)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Reads the TypeDef and Enumeration records of the file, skipping
    /// every other record.
    ///
    /// # Errors
    ///
    /// Unlike [`read`](Self::read) this is strict: an unparsable line or a
    /// definition that fails the meta-schema is a
    /// [`StoreError::InvalidLine`].
    pub fn read_definitions(&self) -> Result<Vec<Definition>> {
        let file = self.read()?;
        let mut definitions = Vec::new();
        for line in &file.lines {
            let record = match line {
                Line::Record(record) => record,
                Line::Invalid { line, error } => return Err(self.invalid_line(*line, error.to_string())),
            };
            match read_declaration(record) {
                Ok(Some(Declaration::Definition(definition))) => definitions.push(definition),
                Ok(_) => {}
                Err(problems) => {
                    let message = problems
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(self.invalid_line(record.line, message));
                }
            }
        }
        Ok(definitions)
    }

    fn invalid_line(&self, line: usize, message: String) -> StoreError {
        StoreError::InvalidLine {
            path: self.path.clone(),
            line,
            message,
        }
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }
}
