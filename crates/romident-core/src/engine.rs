use crate::config::{self, AppConfig};
use crate::database::{self, DatabaseIndex};
use crate::digest::{self, FileDigestSet};
use crate::error::{Error, Result};
use crate::matcher::Matcher;
use crate::plan::{PlannedAction, RenamePlanEntry, RenamePlanner};
use crate::progress::ProgressReporter;
use crate::scanner::{self, ScanOptions};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub scan: ScanOptions,
    pub output_dir: Option<PathBuf>,
}

impl EngineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            scan: ScanOptions::new(
                &config.rom_extensions,
                &config.ignore_patterns,
                config.recursive,
            ),
            output_dir: config.output_dir.as_ref().map(PathBuf::from),
        }
    }
}

/// Result of processing one candidate file.
#[derive(Debug, Clone)]
pub enum FileOutcome {
    Planned {
        digests: FileDigestSet,
        /// Database records declaring the same size as the file.
        size_candidates: usize,
        entry: RenamePlanEntry,
    },
    /// The file could not be read; it is reported and skipped.
    Failed { path: PathBuf, error: String },
}

impl FileOutcome {
    pub fn path(&self) -> &Path {
        match self {
            FileOutcome::Planned { entry, .. } => &entry.source,
            FileOutcome::Failed { path, .. } => path,
        }
    }

    pub fn entry(&self) -> Option<&RenamePlanEntry> {
        match self {
            FileOutcome::Planned { entry, .. } => Some(entry),
            FileOutcome::Failed { .. } => None,
        }
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub outcomes: Vec<FileOutcome>,
    pub scan_duration: Duration,
    pub hash_duration: Duration,
}

impl RunReport {
    pub fn plan_entries(&self) -> Vec<RenamePlanEntry> {
        self.outcomes
            .iter()
            .filter_map(FileOutcome::entry)
            .cloned()
            .collect()
    }
}

pub struct IdentifyEngine<'a> {
    index: &'a DatabaseIndex,
    options: EngineOptions,
}

impl<'a> IdentifyEngine<'a> {
    pub fn new(index: &'a DatabaseIndex, options: EngineOptions) -> Self {
        Self { index, options }
    }

    /// Run the identification pipeline:
    /// 1. Directory scan for candidate files
    /// 2. Parallel single-pass digest and classification per file
    /// 3. Rename planning in path order
    ///
    /// Nothing on disk is modified; applying the plan is a separate step.
    pub fn run(&self, root_paths: &[PathBuf], reporter: &dyn ProgressReporter) -> Result<RunReport> {
        let roots = config::canonical_roots(root_paths.to_vec());
        info!("Processing paths: {:?}", roots);

        reporter.on_scan_start();
        let scan_start = Instant::now();
        let candidates = scanner::collect_candidates(&roots, &self.options.scan)?;
        let scan_duration = scan_start.elapsed();
        reporter.on_scan_complete(candidates.len(), scan_duration.as_secs_f64());
        debug!(
            "Scan completed in {:.2}s, {} candidate files",
            scan_duration.as_secs_f64(),
            candidates.len()
        );

        let mut report = self.identify_files(&candidates, reporter);
        report.scan_duration = scan_duration;
        Ok(report)
    }

    /// Digest, classify and plan an explicit list of files. Files are
    /// processed in path order whatever order they are given in.
    pub fn identify_files(&self, files: &[PathBuf], reporter: &dyn ProgressReporter) -> RunReport {
        let matcher = Matcher::new(self.index);

        let mut files = files.to_vec();
        files.sort();
        files.dedup();

        info!("Hashing {} files...", files.len());
        reporter.on_hash_start(files.len());
        let hash_start = Instant::now();

        let classified: Vec<_> = files
            .par_iter()
            .map(|path| {
                let result = digest::digest_file(path).map(|fds| {
                    let verdict = matcher.classify(&fds);
                    (fds, verdict)
                });
                reporter.on_file_hashed(&path.to_string_lossy());
                (path, result)
            })
            .collect();

        let hash_duration = hash_start.elapsed();

        let mut planner = RenamePlanner::new();
        if let Some(dir) = &self.options.output_dir {
            planner = planner.with_output_dir(dir);
        }

        let mut outcomes = Vec::with_capacity(classified.len());
        for (path, result) in classified {
            match result {
                Ok((digests, verdict)) => {
                    let size_candidates = matcher.size_candidates(digests.size);
                    let entry = planner.plan(verdict, path);
                    outcomes.push(FileOutcome::Planned {
                        digests,
                        size_candidates,
                        entry,
                    });
                }
                Err(err) => {
                    error!("Error processing file '{}': {}", path.display(), err);
                    outcomes.push(FileOutcome::Failed {
                        path: path.clone(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let identified = outcomes
            .iter()
            .filter_map(FileOutcome::entry)
            .filter(|entry| entry.verdict.is_exact())
            .count();
        let planned = outcomes
            .iter()
            .filter_map(FileOutcome::entry)
            .filter(|entry| matches!(entry.action, PlannedAction::Rename { .. }))
            .count();
        let conflicts = outcomes
            .iter()
            .filter_map(FileOutcome::entry)
            .filter(|entry| entry.conflict().is_some())
            .count();

        reporter.on_hash_complete(identified, hash_duration.as_secs_f64());
        reporter.on_plan_complete(planned, conflicts);
        debug!(
            "Hash completed in {:.2}s, {} of {} identified",
            hash_duration.as_secs_f64(),
            identified,
            outcomes.len()
        );

        RunReport {
            outcomes,
            scan_duration: Duration::ZERO,
            hash_duration,
        }
    }
}

/// Collect the DAT files named by `config` (explicit files first, then the
/// contents of `dat_dir`) and build the index. Any load or integrity error is
/// fatal.
pub fn build_index(config: &AppConfig) -> Result<DatabaseIndex> {
    let mut dat_paths: Vec<PathBuf> = config.dat_files.iter().map(PathBuf::from).collect();
    if let Some(dir) = &config.dat_dir {
        dat_paths.extend(database::dat_files_in_dir(Path::new(dir))?);
    }

    if dat_paths.is_empty() {
        return Err(Error::Config(::config::ConfigError::Message(
            "no DAT files configured".to_string(),
        )));
    }

    let records = database::load_dat_files(&dat_paths, &config.name_template)?;
    let index = DatabaseIndex::build(records)?;
    info!("Database index ready: {} ROMs", index.len());
    Ok(index)
}
