use crate::database::{DatabaseIndex, RomRecord};
use crate::digest::{DigestKind, FileDigestSet};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Outcome of comparing one file against the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchVerdict {
    /// Every digest the record supplies agrees, and so does the size.
    Exact {
        record: Arc<RomRecord>,
        matched_by: DigestKind,
    },
    /// A digest located the record but the declared size differs.
    SizeMismatch {
        record: Arc<RomRecord>,
        expected: u64,
        actual: u64,
    },
    /// A digest located the record but another digest it supplies disagrees.
    DigestConflict {
        record: Arc<RomRecord>,
        field: DigestKind,
        expected: String,
        actual: String,
    },
    Unknown,
}

impl MatchVerdict {
    pub fn record(&self) -> Option<&Arc<RomRecord>> {
        match self {
            MatchVerdict::Exact { record, .. }
            | MatchVerdict::SizeMismatch { record, .. }
            | MatchVerdict::DigestConflict { record, .. } => Some(record),
            MatchVerdict::Unknown => None,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, MatchVerdict::Exact { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            MatchVerdict::Exact { .. } => "exact",
            MatchVerdict::SizeMismatch { .. } => "size_mismatch",
            MatchVerdict::DigestConflict { .. } => "digest_conflict",
            MatchVerdict::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MatchVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchVerdict::Exact { record, matched_by } => {
                write!(f, "exact match '{}' (by {})", record.name, matched_by)
            }
            MatchVerdict::SizeMismatch {
                record,
                expected,
                actual,
            } => write!(
                f,
                "size mismatch for '{}': expected {} bytes, found {}",
                record.name, expected, actual
            ),
            MatchVerdict::DigestConflict {
                record,
                field,
                expected,
                actual,
            } => write!(
                f,
                "{} conflict for '{}': expected {}, found {}",
                field, record.name, expected, actual
            ),
            MatchVerdict::Unknown => f.write_str("unknown"),
        }
    }
}

/// Classifies files against a shared, read-only index.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    index: &'a DatabaseIndex,
}

impl<'a> Matcher<'a> {
    pub fn new(index: &'a DatabaseIndex) -> Self {
        Self { index }
    }

    /// Look the file up by SHA1, then MD5, then CRC32. The first hit decides
    /// the record; its size is checked before its remaining digests.
    pub fn classify(&self, fds: &FileDigestSet) -> MatchVerdict {
        let Some((matched_by, record)) = DigestKind::BY_PRIORITY
            .into_iter()
            .find_map(|kind| self.index.lookup(kind, fds.get(kind)).map(|r| (kind, r)))
        else {
            debug!("{}: no database entry", fds.path.display());
            return MatchVerdict::Unknown;
        };

        let record = Arc::clone(record);

        if let Some(expected) = record.size {
            if expected != fds.size {
                debug!(
                    "{}: '{}' found by {} but size {} != {}",
                    fds.path.display(),
                    record.name,
                    matched_by,
                    fds.size,
                    expected
                );
                return MatchVerdict::SizeMismatch {
                    record,
                    expected,
                    actual: fds.size,
                };
            }
        }

        let conflict = record
            .supplied_kinds()
            .filter(|kind| *kind != matched_by)
            .find_map(|kind| {
                let expected = record.get(kind)?;
                let actual = fds.get(kind);
                (expected != actual).then(|| (kind, expected.to_string(), actual.to_string()))
            });

        if let Some((field, expected, actual)) = conflict {
            debug!(
                "{}: '{}' found by {} but {} disagrees",
                fds.path.display(),
                record.name,
                matched_by,
                field
            );
            return MatchVerdict::DigestConflict {
                record,
                field,
                expected,
                actual,
            };
        }

        debug!(
            "{}: exact match '{}' by {}",
            fds.path.display(),
            record.name,
            matched_by
        );
        MatchVerdict::Exact { record, matched_by }
    }

    /// Number of database records declaring exactly `size` bytes.
    pub fn size_candidates(&self, size: u64) -> usize {
        self.index.records_with_size(size).len()
    }
}
