use super::{is_same_file, PlannedAction, RenamePlanEntry};
use crate::config;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyStatus {
    Renamed,
    WouldRename,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyResult {
    pub source: PathBuf,
    pub destination: PathBuf,
    /// Where the original was copied before the rename, if backups are on.
    pub backup: Option<PathBuf>,
    pub status: ApplyStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOutcome {
    pub results: Vec<ApplyResult>,
    pub success_count: usize,
    pub error_count: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub dry_run: bool,
    pub backup: Option<BackupOptions>,
}

/// Copy every file into a backup tree before it is renamed.
///
/// Each file keeps its path relative to the scan root it was found under.
/// Without an explicit directory the tree for root `R` is `R_backup`, next to
/// `R`. With an explicit directory and several roots, each root gets its own
/// subdirectory named after it.
#[derive(Debug, Clone)]
pub struct BackupOptions {
    dir: Option<PathBuf>,
    roots: Vec<PathBuf>,
}

impl BackupOptions {
    pub fn new(dir: Option<PathBuf>, roots: &[PathBuf]) -> Self {
        Self {
            dir,
            roots: config::canonical_roots(roots.to_vec()),
        }
    }

    pub fn target_for(&self, source: &Path) -> PathBuf {
        let file_name = PathBuf::from(source.file_name().unwrap_or(source.as_os_str()));
        let root = self
            .roots
            .iter()
            .filter(|root| source.starts_with(root))
            .max_by_key(|root| root.components().count());

        let Some(root) = root else {
            let base = match &self.dir {
                Some(dir) => dir.clone(),
                None => backup_sibling(source.parent().unwrap_or_else(|| Path::new("."))),
            };
            return base.join(file_name);
        };

        let relative = match source.strip_prefix(root) {
            Ok(relative) if !relative.as_os_str().is_empty() => relative.to_path_buf(),
            _ => file_name,
        };
        // A root that is itself a file backs up next to it.
        let root_dir = if root == source {
            root.parent().unwrap_or_else(|| Path::new("."))
        } else {
            root.as_path()
        };

        match &self.dir {
            Some(dir) if self.roots.len() > 1 => dir
                .join(root_dir.file_name().unwrap_or_default())
                .join(relative),
            Some(dir) => dir.join(relative),
            None => backup_sibling(root_dir).join(relative),
        }
    }
}

fn backup_sibling(dir: &Path) -> PathBuf {
    let mut name = dir.as_os_str().to_os_string();
    name.push("_backup");
    PathBuf::from(name)
}

/// Execute the rename entries of a plan without backups.
pub fn apply_plan(entries: &[RenamePlanEntry], dry_run: bool) -> ApplyOutcome {
    apply_plan_with(
        entries,
        &ApplyOptions {
            dry_run,
            backup: None,
        },
    )
}

/// Execute the rename entries of a plan.
///
/// With `dry_run` set nothing on disk is touched (no backups either) and every
/// rename is reported as `WouldRename`. Otherwise each rename re-checks its
/// source and destination immediately before moving, after copying the source
/// to its backup location when backups are on. A failure is recorded for that
/// entry and the rest of the plan still runs.
pub fn apply_plan_with(entries: &[RenamePlanEntry], options: &ApplyOptions) -> ApplyOutcome {
    let mut outcome = ApplyOutcome::default();

    for entry in entries {
        let PlannedAction::Rename { destination } = &entry.action else {
            continue;
        };
        let backup = options
            .backup
            .as_ref()
            .map(|backup| backup.target_for(&entry.source));

        let status = if options.dry_run {
            info!(
                "Would rename {} to {}",
                entry.source.display(),
                destination.display()
            );
            ApplyStatus::WouldRename
        } else {
            match rename_one(entry, destination, backup.as_deref()) {
                Ok(()) => {
                    debug!(
                        "Renamed {} to {}",
                        entry.source.display(),
                        destination.display()
                    );
                    ApplyStatus::Renamed
                }
                Err(reason) => {
                    error!("Failed to rename '{}': {}", entry.source.display(), reason);
                    ApplyStatus::Failed(reason)
                }
            }
        };

        match status {
            ApplyStatus::Failed(_) => outcome.error_count += 1,
            _ => outcome.success_count += 1,
        }

        outcome.results.push(ApplyResult {
            source: entry.source.clone(),
            destination: destination.clone(),
            backup,
            status,
        });
    }

    info!(
        "Rename plan {}: {} succeeded, {} failed",
        if options.dry_run { "previewed" } else { "executed" },
        outcome.success_count,
        outcome.error_count
    );
    outcome
}

fn rename_one(
    entry: &RenamePlanEntry,
    destination: &Path,
    backup: Option<&Path>,
) -> Result<(), String> {
    if !entry.source.exists() {
        warn!("File '{}' no longer exists", entry.source.display());
        return Err("source file missing".to_string());
    }

    // fs::rename replaces an existing file on most platforms.
    if destination.exists() && !is_same_file(destination, &entry.source) {
        return Err(format!("destination {} already exists", destination.display()));
    }

    if let Some(backup) = backup {
        copy_to_backup(&entry.source, backup)?;
    }

    if let Some(parent) = destination.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| format!("error: {}", e))?;
        }
    }

    fs::rename(&entry.source, destination).map_err(|e| format!("error: {}", e))
}

fn copy_to_backup(source: &Path, backup: &Path) -> Result<(), String> {
    if let Some(parent) = backup.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| format!("backup failed: {}", e))?;
        }
    }
    fs::copy(source, backup).map_err(|e| format!("backup failed: {}", e))?;
    debug!("Backed up {} to {}", source.display(), backup.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::RomRecord;
    use crate::digest::DigestKind;
    use crate::matcher::MatchVerdict;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn rename_entry(source: PathBuf, destination: PathBuf) -> RenamePlanEntry {
        RenamePlanEntry {
            source,
            verdict: MatchVerdict::Exact {
                record: Arc::new(RomRecord::new("Game (USA).rom", Some(3))),
                matched_by: DigestKind::Sha1,
            },
            action: PlannedAction::Rename { destination },
        }
    }

    fn listing(dir: &std::path::Path) -> Vec<PathBuf> {
        let mut names: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("game.rom");
        fs::write(&source, b"abc").unwrap();
        let before = listing(dir.path());

        let outcome = apply_plan(
            &[rename_entry(source, dir.path().join("Game (USA).rom"))],
            true,
        );

        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.results[0].status, ApplyStatus::WouldRename);
        assert_eq!(listing(dir.path()), before);
    }

    #[test]
    fn test_apply_renames_and_creates_directories() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("game.rom");
        fs::write(&source, b"abc").unwrap();
        let destination = dir.path().join("sorted").join("Game (USA).rom");

        let outcome = apply_plan(&[rename_entry(source.clone(), destination.clone())], false);

        assert_eq!(outcome.success_count, 1);
        assert_eq!(outcome.error_count, 0);
        assert!(!source.exists());
        assert_eq!(fs::read(&destination).unwrap(), b"abc");
    }

    #[test]
    fn test_apply_never_overwrites() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("game.rom");
        let destination = dir.path().join("Game (USA).rom");
        fs::write(&source, b"abc").unwrap();
        fs::write(&destination, b"appeared later").unwrap();

        let outcome = apply_plan(&[rename_entry(source.clone(), destination.clone())], false);

        assert_eq!(outcome.error_count, 1);
        assert!(matches!(outcome.results[0].status, ApplyStatus::Failed(_)));
        assert!(source.exists());
        assert_eq!(fs::read(&destination).unwrap(), b"appeared later");
    }

    #[test]
    fn test_backup_copies_source_before_rename() {
        let tmp = tempdir().unwrap();
        let root = fs::canonicalize(tmp.path()).unwrap().join("roms");
        fs::create_dir_all(root.join("nes")).unwrap();
        let source = root.join("nes").join("game.rom");
        fs::write(&source, b"abc").unwrap();
        let destination = root.join("nes").join("Game (USA).rom");

        let options = ApplyOptions {
            dry_run: false,
            backup: Some(BackupOptions::new(None, &[root.clone()])),
        };
        let outcome = apply_plan_with(
            &[rename_entry(source.clone(), destination.clone())],
            &options,
        );

        let backup = root.with_file_name("roms_backup").join("nes").join("game.rom");
        assert_eq!(outcome.results[0].status, ApplyStatus::Renamed);
        assert_eq!(outcome.results[0].backup.as_deref(), Some(backup.as_path()));
        assert_eq!(fs::read(&backup).unwrap(), b"abc");
        assert_eq!(fs::read(&destination).unwrap(), b"abc");
        assert!(!source.exists());
    }

    #[test]
    fn test_backup_to_explicit_dir_skipped_on_dry_run() {
        let tmp = tempdir().unwrap();
        let root = fs::canonicalize(tmp.path()).unwrap();
        let source = root.join("game.rom");
        fs::write(&source, b"abc").unwrap();
        let backup_dir = root.join("saved");

        let options = ApplyOptions {
            dry_run: true,
            backup: Some(BackupOptions::new(Some(backup_dir.clone()), &[root.clone()])),
        };
        let outcome = apply_plan_with(
            &[rename_entry(source.clone(), root.join("Game (USA).rom"))],
            &options,
        );

        assert_eq!(outcome.results[0].status, ApplyStatus::WouldRename);
        assert_eq!(
            outcome.results[0].backup.as_deref(),
            Some(backup_dir.join("game.rom").as_path())
        );
        assert!(!backup_dir.exists());
        assert!(source.exists());
    }

    #[test]
    fn test_backup_target_per_root() {
        let backup = BackupOptions::new(
            Some(PathBuf::from("/backups")),
            &[PathBuf::from("/roms/nes"), PathBuf::from("/roms/snes")],
        );
        assert_eq!(
            backup.target_for(Path::new("/roms/snes/sub/a.sfc")),
            PathBuf::from("/backups/snes/sub/a.sfc")
        );

        let single_file = BackupOptions::new(None, &[PathBuf::from("/roms/one.nes")]);
        assert_eq!(
            single_file.target_for(Path::new("/roms/one.nes")),
            PathBuf::from("/roms_backup/one.nes")
        );
    }

    #[test]
    fn test_non_rename_entries_are_skipped() {
        let entry = RenamePlanEntry {
            source: PathBuf::from("/roms/unknown.rom"),
            verdict: MatchVerdict::Unknown,
            action: PlannedAction::ReportOnly,
        };
        let outcome = apply_plan(&[entry], false);
        assert!(outcome.results.is_empty());
    }
}
