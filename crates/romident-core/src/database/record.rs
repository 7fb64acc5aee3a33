use crate::digest::DigestKind;
use crate::error::Result;
use serde::Serialize;

pub const DEFAULT_NAME_TEMPLATE: &str = "{name}";

/// One ROM entry from a DAT database.
///
/// Digests are stored normalised (lowercase hex, CRC32 zero-padded) and any of
/// them may be missing. Records are shared behind `Arc` once indexed and never
/// change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RomRecord {
    pub name: String,
    pub game: String,
    pub database: String,
    pub size: Option<u64>,
    pub crc32: Option<String>,
    pub md5: Option<String>,
    pub sha1: Option<String>,
    pub target_template: String,
}

impl RomRecord {
    pub fn new(name: impl Into<String>, size: Option<u64>) -> Self {
        let name = name.into();
        Self {
            game: name.clone(),
            name,
            database: String::new(),
            size,
            crc32: None,
            md5: None,
            sha1: None,
            target_template: DEFAULT_NAME_TEMPLATE.to_string(),
        }
    }

    /// Set a digest from its database representation. Empty strings leave the
    /// digest unset.
    pub fn with_digest(mut self, kind: DigestKind, raw: &str) -> Result<Self> {
        let value = kind.normalize(raw)?;
        match kind {
            DigestKind::Crc32 => self.crc32 = value,
            DigestKind::Md5 => self.md5 = value,
            DigestKind::Sha1 => self.sha1 = value,
        }
        Ok(self)
    }

    pub fn with_game(mut self, game: impl Into<String>) -> Self {
        self.game = game.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.target_template = template.into();
        self
    }

    pub fn get(&self, kind: DigestKind) -> Option<&str> {
        match kind {
            DigestKind::Crc32 => self.crc32.as_deref(),
            DigestKind::Md5 => self.md5.as_deref(),
            DigestKind::Sha1 => self.sha1.as_deref(),
        }
    }

    /// Digest kinds this record supplies, in lookup priority order.
    pub fn supplied_kinds(&self) -> impl Iterator<Item = DigestKind> + '_ {
        DigestKind::BY_PRIORITY
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
    }
}
