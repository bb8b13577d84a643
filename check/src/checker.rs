//! The check run state machine.
//!
//! A run moves strictly forward through [`Phase`]s: every definition in
//! every file (and every import) is loaded before any data record is
//! validated, and references are resolved once after all files have been
//! scanned. Problems in the data are collected into the [`Report`]; only
//! the failures listed in [`CheckError`] abort a run.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use engn_core::{
    CompiledSchema, Declaration, Problem, RecordTag, SchemaRegistry, StructuralError, Validator,
    read_declaration,
};
use engn_store::{CheckPolicy, ProjectConfig, RecordFile, RecordStore, StandardModule, find_module};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::collect::collect_data_paths;
use crate::error::{CheckError, Result};
use crate::index::{Location, ReferenceResolver};
use crate::report::{Diagnostic, Report};

/// Stage of a check run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Init,
    LoadingSchemas,
    ScanningData,
    ResolvingReferences,
    Reporting,
    Done,
}

/// What to check and how.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    /// Files and directories to check.
    pub targets: Vec<PathBuf>,
    pub policy: CheckPolicy,
}

impl CheckOptions {
    pub fn new(targets: Vec<PathBuf>, policy: CheckPolicy) -> Self {
        Self { targets, policy }
    }

    /// Default targets for a project: the configured roots when there is a
    /// [`ProjectConfig`], otherwise the whole working directory.
    pub fn for_project(
        working_dir: &Path,
        project: Option<&ProjectConfig>,
        policy: CheckPolicy,
    ) -> Self {
        let targets = match project {
            Some(config) => config.scan_roots(working_dir),
            None => vec![working_dir.to_path_buf()],
        };
        Self::new(targets, policy)
    }
}

enum Source {
    File(PathBuf),
    Module(&'static StandardModule),
}

/// Result of scanning one file, merged after the parallel scan.
#[derive(Default)]
struct FileScan {
    diagnostics: Vec<Diagnostic>,
    resolver: ReferenceResolver,
    records: usize,
}

/// Drives one check run.
///
/// # Examples
///
/// ```no_run
/// use engn_check::{CheckOptions, Checker, Phase};
/// use engn_store::CheckPolicy;
///
/// let mut checker = Checker::new(CheckOptions::new(vec!["mbse".into()], CheckPolicy::default()));
/// let report = checker.run().unwrap();
/// assert_eq!(checker.phase(), Phase::Done);
/// print!("{}", report.render_text());
/// ```
#[derive(Debug)]
pub struct Checker {
    options: CheckOptions,
    phase: Phase,
    registry: SchemaRegistry,
    files: Vec<RecordFile>,
    definition_sites: HashMap<String, Location>,
    definitions_loaded: usize,
    diagnostics: Vec<Diagnostic>,
}

impl Checker {
    pub fn new(options: CheckOptions) -> Self {
        Self {
            options,
            phase: Phase::Init,
            registry: SchemaRegistry::new(),
            files: Vec::new(),
            definition_sites: HashMap::new(),
            definitions_loaded: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Definitions loaded so far.
    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Runs every phase and returns the report.
    ///
    /// # Errors
    ///
    /// Any [`CheckError`]; partial results are discarded.
    pub fn run(&mut self) -> Result<Report> {
        if self.phase != Phase::Init {
            return Err(CheckError::InvalidInput(
                "a checker can only run once".to_string(),
            ));
        }

        self.advance(Phase::LoadingSchemas);
        self.load_schemas()?;
        let schema = self.registry.compile();
        self.report_definition_errors(&schema);

        self.advance(Phase::ScanningData);
        let (resolver, records) = self.scan_data(&schema)?;

        self.advance(Phase::ResolvingReferences);
        let unique = self.options.policy.unique_reference_targets;
        self.diagnostics.extend(resolver.resolve(unique));

        self.advance(Phase::Reporting);
        let report = Report::new(
            std::mem::take(&mut self.diagnostics),
            self.files.len(),
            records,
        );
        info!(
            files = report.files_checked(),
            records = report.records_checked(),
            errors = report.error_count(),
            "check finished"
        );

        self.advance(Phase::Done);
        Ok(report)
    }

    fn advance(&mut self, next: Phase) {
        debug_assert!(next > self.phase, "phase {next:?} after {:?}", self.phase);
        debug!(from = ?self.phase, to = ?next, "phase");
        self.phase = next;
    }

    fn load_schemas(&mut self) -> Result<()> {
        let paths = collect_data_paths(&self.options.targets, &self.options.policy)?;

        let mut queue: VecDeque<Source> = VecDeque::new();
        let mut seen_files = HashSet::new();
        let mut seen_modules = HashSet::new();
        for path in paths {
            if seen_files.insert(canonical(&path)) {
                queue.push_back(Source::File(path));
            }
        }

        while let Some(source) = queue.pop_front() {
            let file = match source {
                Source::File(path) => RecordStore::new(&path)
                    .read()
                    .map_err(|source| CheckError::Read { path, source })?,
                Source::Module(module) => module.records(),
            };
            debug!(path = %file.source.display(), "loading definitions");

            for record in file.records() {
                let location = Location::new(&file.source, record.line);
                match read_declaration(record) {
                    Ok(Some(Declaration::Definition(definition))) => {
                        self.definition_sites
                            .insert(definition.name().to_string(), location);
                        self.registry.define(definition);
                        self.definitions_loaded += 1;
                    }
                    Ok(Some(Declaration::Import(import))) => {
                        let base = file.source.parent().unwrap_or(Path::new(""));
                        for rel in &import.files {
                            let path = base.join(rel);
                            if !path.is_file() {
                                self.diagnostics.push(Diagnostic::new(
                                    location.clone(),
                                    StructuralError::UnresolvedImport {
                                        import: rel.clone(),
                                        reason: "file not found".to_string(),
                                    },
                                ));
                            } else if seen_files.insert(canonical(&path)) {
                                debug!(path = %path.display(), "following import");
                                queue.push_back(Source::File(path));
                            }
                        }
                        for name in &import.modules {
                            match find_module(name) {
                                Ok(module) => {
                                    if seen_modules.insert(module.name) {
                                        queue.push_back(Source::Module(module));
                                    }
                                }
                                Err(err) => self.diagnostics.push(Diagnostic::new(
                                    location.clone(),
                                    StructuralError::UnresolvedImport {
                                        import: name.clone(),
                                        reason: err.to_string(),
                                    },
                                )),
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(problems) => self.push_all(&location, problems),
                }
            }
            self.files.push(file);
        }

        if self.definitions_loaded == 0 {
            return Err(CheckError::NoSchemaDefinitions);
        }
        info!(
            files = self.files.len(),
            definitions = self.registry.len(),
            "schemas loaded"
        );
        Ok(())
    }

    fn report_definition_errors(&mut self, schema: &CompiledSchema) {
        for (name, err) in schema.definition_errors() {
            if let Some(location) = self.definition_sites.get(name) {
                self.diagnostics
                    .push(Diagnostic::new(location.clone(), err.clone()));
            }
        }
    }

    fn scan_data(&mut self, schema: &CompiledSchema) -> Result<(ReferenceResolver, usize)> {
        let validator =
            Validator::new(schema).allow_unknown_fields(self.options.policy.allow_unknown_fields);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.policy.jobs.unwrap_or(0))
            .build()?;

        let files = &self.files;
        let scans: Vec<FileScan> = pool.install(|| {
            files
                .par_iter()
                .map(|file| scan_file(&validator, schema, file))
                .collect()
        });

        let mut resolver = ReferenceResolver::new();
        let mut records = 0;
        for scan in scans {
            self.diagnostics.extend(scan.diagnostics);
            resolver.merge(scan.resolver);
            records += scan.records;
        }
        Ok((resolver, records))
    }

    fn push_all(&mut self, location: &Location, problems: Vec<Problem>) {
        self.diagnostics.extend(
            problems
                .into_iter()
                .map(|problem| Diagnostic::new(location.clone(), problem)),
        );
    }
}

fn scan_file(validator: &Validator<'_>, schema: &CompiledSchema, file: &RecordFile) -> FileScan {
    let mut scan = FileScan::default();

    for (line, error) in file.invalid() {
        scan.diagnostics
            .push(Diagnostic::new(Location::new(&file.source, line), error.clone()));
    }

    for record in file.records() {
        scan.records += 1;
        let type_name = match &record.tag {
            RecordTag::TypeDef | RecordTag::Enumeration | RecordTag::Import => continue,
            RecordTag::Missing => {
                scan.diagnostics.push(Diagnostic::new(
                    Location::new(&file.source, record.line),
                    StructuralError::UnknownType {
                        discriminator: None,
                    },
                ));
                continue;
            }
            RecordTag::Data(name) => name,
        };

        let location = Location::new(&file.source, record.line);
        let ty = match schema.get(type_name) {
            Some(Ok(ty)) => ty,
            Some(Err(err)) => {
                scan.diagnostics
                    .push(Diagnostic::new(location, err.clone()));
                continue;
            }
            None => {
                scan.diagnostics.push(Diagnostic::new(
                    location,
                    StructuralError::UnknownType {
                        discriminator: Some(type_name.clone()),
                    },
                ));
                continue;
            }
        };

        let validation = validator.validate_record(ty, &record.fields);
        if validation.is_ok() {
            scan.resolver
                .index_record(schema, type_name, &record.fields, location.clone());
        }
        scan.diagnostics.extend(
            validation
                .errors
                .into_iter()
                .map(|problem| Diagnostic::new(location.clone(), problem)),
        );
        scan.resolver.defer(location, validation.references);
    }

    scan
}

fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Checks `options.targets` and returns the report.
///
/// # Errors
///
/// Any [`CheckError`].
pub fn check(options: CheckOptions) -> Result<Report> {
    Checker::new(options).run()
}

/// Loads every definition reachable from `options.targets` without
/// validating data.
///
/// # Errors
///
/// As [`check`], except that no data is scanned.
pub fn load_registry(options: CheckOptions) -> Result<SchemaRegistry> {
    let mut checker = Checker::new(options);
    checker.advance(Phase::LoadingSchemas);
    checker.load_schemas()?;
    Ok(checker.registry)
}
