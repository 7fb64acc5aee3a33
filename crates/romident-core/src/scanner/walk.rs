use dashmap::DashSet;
use glob::Pattern;
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Which files count as candidates during a walk.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Lowercase extensions without the leading dot. Empty accepts every file.
    pub extensions: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub recursive: bool,
}

impl ScanOptions {
    pub fn new(extensions: &[String], ignore_patterns: &[String], recursive: bool) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
                .filter(|ext| !ext.is_empty())
                .collect(),
            ignore_patterns: ignore_patterns.to_vec(),
            recursive,
        }
    }

    fn accepts_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .map(|ext| self.extensions.iter().any(|allowed| *allowed == ext))
            .unwrap_or(false)
    }
}

/// Parallel directory traversal collecting candidate ROM files.
///
/// Skips symlinks, 0-byte files, files with extensions outside the allowed
/// list and anything matching an ignore glob. A root that is itself a file is
/// considered directly. Results are sorted so every run sees files in the same
/// order.
pub fn collect_candidates(root_paths: &[PathBuf], options: &ScanOptions) -> io::Result<Vec<PathBuf>> {
    let found: DashSet<PathBuf> = DashSet::new();

    let ignore_patterns: Vec<Pattern> = options
        .ignore_patterns
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect();

    root_paths.par_iter().try_for_each(|root| {
        if root.is_file() {
            consider_file(root, options, &ignore_patterns, &found)
        } else {
            visit_dirs(root, options, &ignore_patterns, &found, true)
        }
    })?;

    let mut candidates: Vec<PathBuf> = found.into_iter().collect();
    candidates.sort();
    debug!("Found {} candidate files", candidates.len());
    Ok(candidates)
}

fn visit_dirs(
    dir: &Path,
    options: &ScanOptions,
    ignore_patterns: &[Pattern],
    found: &DashSet<PathBuf>,
    is_root: bool,
) -> io::Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    if !is_root && !options.recursive {
        return Ok(());
    }

    if ignore_patterns
        .iter()
        .any(|pattern| pattern.matches_path(dir))
    {
        return Ok(());
    }

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            if err.kind() == io::ErrorKind::PermissionDenied {
                error!(
                    "Access denied reading directory {}: {}",
                    dir.display(),
                    err
                );
                return Ok(());
            } else if !is_root {
                warn!("Skipping directory {}: {}", dir.display(), err);
                return Ok(());
            } else {
                return Err(io::Error::new(
                    err.kind(),
                    format!("Error reading directory {}: {}", dir.display(), err),
                ));
            }
        }
    };

    entries.par_bridge().try_for_each(|entry_result| -> io::Result<()> {
        let entry = match entry_result {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Error reading entry in directory {}: {}", dir.display(), err);
                return Ok(());
            }
        };

        let path = entry.path();
        let Some(metadata) = entry_metadata(&path) else {
            return Ok(());
        };

        if metadata.file_type().is_symlink() {
            return Ok(());
        }

        if metadata.is_dir() {
            visit_dirs(&path, options, ignore_patterns, found, false)?;
        } else if metadata.is_file() {
            consider_file(&path, options, ignore_patterns, found)?;
        }
        Ok(())
    })?;

    Ok(())
}

fn consider_file(
    path: &Path,
    options: &ScanOptions,
    ignore_patterns: &[Pattern],
    found: &DashSet<PathBuf>,
) -> io::Result<()> {
    let Some(metadata) = entry_metadata(path) else {
        return Ok(());
    };
    if metadata.file_type().is_symlink() || metadata.len() == 0 {
        return Ok(());
    }

    if !options.accepts_extension(path) {
        return Ok(());
    }

    if ignore_patterns
        .iter()
        .any(|pattern| pattern.matches_path(path))
    {
        return Ok(());
    }

    found.insert(path.to_path_buf());
    Ok(())
}

/// Metadata for one entry, or `None` when it vanished or cannot be inspected.
/// A single bad entry never aborts the walk.
fn entry_metadata(path: &Path) -> Option<fs::Metadata> {
    match fs::symlink_metadata(path) {
        Ok(metadata) => Some(metadata),
        Err(err) => {
            warn!("Skipping {}: {}", path.display(), err);
            None
        }
    }
}
