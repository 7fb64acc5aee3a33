pub mod apply;

use crate::database::RomRecord;
use crate::error::ConflictError;
use crate::matcher::MatchVerdict;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use apply::{
    apply_plan, apply_plan_with, ApplyOptions, ApplyOutcome, ApplyResult, ApplyStatus, BackupOptions,
};

/// What the planner proposes for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    Rename { destination: PathBuf },
    /// The file already carries its database name.
    AlreadyNamed,
    /// Not an exact match; reported but never renamed.
    ReportOnly,
    Conflict(ConflictError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenamePlanEntry {
    pub source: PathBuf,
    pub verdict: MatchVerdict,
    pub action: PlannedAction,
}

impl RenamePlanEntry {
    pub fn destination(&self) -> Option<&Path> {
        match &self.action {
            PlannedAction::Rename { destination } => Some(destination),
            _ => None,
        }
    }

    pub fn conflict(&self) -> Option<&ConflictError> {
        match &self.action {
            PlannedAction::Conflict(err) => Some(err),
            _ => None,
        }
    }
}

/// Turns verdicts into rename proposals for one run.
///
/// Every destination handed out is recorded in a shared claim map, so the
/// planner can be used from several threads and still never hands out the
/// same destination twice. The first claimant wins; later ones get a
/// [`ConflictError::DuplicateDestination`].
#[derive(Debug, Default)]
pub struct RenamePlanner {
    output_dir: Option<PathBuf>,
    claimed: DashMap<PathBuf, PathBuf>,
}

impl RenamePlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place renamed files in `dir` instead of next to their source.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn plan(&self, verdict: MatchVerdict, source: &Path) -> RenamePlanEntry {
        let action = match &verdict {
            MatchVerdict::Exact { record, .. } => self.plan_rename(record, source),
            _ => PlannedAction::ReportOnly,
        };

        if let PlannedAction::Conflict(err) = &action {
            warn!("{}: {}", source.display(), err);
        }

        RenamePlanEntry {
            source: source.to_path_buf(),
            verdict,
            action,
        }
    }

    /// Number of destinations claimed so far in this run.
    pub fn claimed_count(&self) -> usize {
        self.claimed.len()
    }

    fn plan_rename(&self, record: &RomRecord, source: &Path) -> PlannedAction {
        let file_name = match render_target(&record.target_template, record, source) {
            Ok(name) => name,
            Err(err) => return PlannedAction::Conflict(err),
        };

        let dir = self
            .output_dir
            .clone()
            .or_else(|| source.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let destination = resolve_location(&dir.join(file_name));

        if destination == resolve_location(source) {
            return match self.claim(&destination, source) {
                Ok(()) => PlannedAction::AlreadyNamed,
                Err(err) => PlannedAction::Conflict(err),
            };
        }

        // On case-insensitive filesystems `Game.rom` exists as soon as
        // `game.rom` does; that is the source itself, not a collision.
        if destination.exists() && !is_same_file(&destination, source) {
            return PlannedAction::Conflict(ConflictError::DestinationExists { destination });
        }

        match self.claim(&destination, source) {
            Ok(()) => {
                debug!("Planned {} -> {}", source.display(), destination.display());
                PlannedAction::Rename { destination }
            }
            Err(err) => PlannedAction::Conflict(err),
        }
    }

    fn claim(&self, destination: &Path, source: &Path) -> Result<(), ConflictError> {
        match self.claimed.entry(destination.to_path_buf()) {
            Entry::Occupied(existing) => Err(ConflictError::DuplicateDestination {
                destination: destination.to_path_buf(),
                claimed_by: existing.get().clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(source.to_path_buf());
                Ok(())
            }
        }
    }
}

/// Resolve the directory part of `path` to its real location so different
/// spellings of one place (`roms/x`, `./roms/x`) compare equal. The file itself
/// need not exist; unresolvable paths are kept as given.
fn resolve_location(path: &Path) -> PathBuf {
    let Some(name) = path.file_name() else {
        return path.to_path_buf();
    };
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    fs::canonicalize(parent)
        .map(|parent| parent.join(name))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Whether two existing paths name the same file on disk.
pub(crate) fn is_same_file(a: &Path, b: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        match (fs::metadata(a), fs::metadata(b)) {
            (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
            _ => false,
        }
    }
    #[cfg(not(unix))]
    {
        match (fs::canonicalize(a), fs::canonicalize(b)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Render a record's target template for `source`.
///
/// Placeholders: `{name}`, `{game}`, `{ext}` (source extension with its dot)
/// and `{crc32}`. The result must be a bare file name.
pub fn render_target(
    template: &str,
    record: &RomRecord,
    source: &Path,
) -> Result<String, ConflictError> {
    let ext = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let rendered = template
        .replace("{name}", &record.name)
        .replace("{game}", &record.game)
        .replace("{ext}", &ext)
        .replace("{crc32}", record.crc32.as_deref().unwrap_or(""));

    let trimmed = rendered.trim();
    if trimmed.is_empty()
        || trimmed == "."
        || trimmed == ".."
        || trimmed.contains('/')
        || trimmed.contains('\\')
    {
        return Err(ConflictError::InvalidTarget {
            template: template.to_string(),
            rendered,
        });
    }

    Ok(trimmed.to_string())
}
