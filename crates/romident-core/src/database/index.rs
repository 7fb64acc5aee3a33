use super::record::RomRecord;
use crate::digest::DigestKind;
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

type DigestTable = HashMap<String, Arc<RomRecord>>;

/// Read-only lookup structure over every loaded ROM record.
///
/// Built once with [`DatabaseIndex::build`]; there are no mutating methods, so
/// a shared reference can be queried from any number of threads.
#[derive(Debug, Default)]
pub struct DatabaseIndex {
    records: Vec<Arc<RomRecord>>,
    by_crc32: DigestTable,
    by_md5: DigestTable,
    by_sha1: DigestTable,
    by_size: HashMap<u64, Vec<Arc<RomRecord>>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub total_records: usize,
    pub unique_crc32: usize,
    pub unique_md5: usize,
    pub unique_sha1: usize,
    pub distinct_sizes: usize,
    pub records_per_database: BTreeMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct NameMatch {
    pub record: Arc<RomRecord>,
    pub score: f64,
}

impl DatabaseIndex {
    /// Index `records` by every digest they supply and by declared size.
    ///
    /// Fails with [`Error::DatabaseIntegrity`] as soon as two records share a
    /// digest value, so a corrupt database is rejected before any matching.
    pub fn build<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = RomRecord>,
    {
        let mut index = DatabaseIndex::default();

        for record in records {
            let record = Arc::new(record);

            for kind in DigestKind::BY_PRIORITY {
                let Some(value) = record.get(kind) else {
                    continue;
                };
                let table = match kind {
                    DigestKind::Crc32 => &mut index.by_crc32,
                    DigestKind::Md5 => &mut index.by_md5,
                    DigestKind::Sha1 => &mut index.by_sha1,
                };
                match table.entry(value.to_string()) {
                    Entry::Occupied(existing) => {
                        return Err(Error::DatabaseIntegrity {
                            kind,
                            value: value.to_string(),
                            first: existing.get().name.clone(),
                            second: record.name.clone(),
                        });
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(Arc::clone(&record));
                    }
                }
            }

            if record.supplied_kinds().next().is_none() {
                warn!("ROM '{}' has no digests and can never be matched", record.name);
            }

            if let Some(size) = record.size {
                index
                    .by_size
                    .entry(size)
                    .or_default()
                    .push(Arc::clone(&record));
            }

            index.records.push(record);
        }

        debug!(
            "Indexed {} records ({} sha1, {} md5, {} crc32)",
            index.records.len(),
            index.by_sha1.len(),
            index.by_md5.len(),
            index.by_crc32.len()
        );

        Ok(index)
    }

    pub fn lookup(&self, kind: DigestKind, value: &str) -> Option<&Arc<RomRecord>> {
        let table = match kind {
            DigestKind::Crc32 => &self.by_crc32,
            DigestKind::Md5 => &self.by_md5,
            DigestKind::Sha1 => &self.by_sha1,
        };
        table.get(value)
    }

    pub fn records_with_size(&self, size: u64) -> &[Arc<RomRecord>] {
        self.by_size.get(&size).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn records(&self) -> &[Arc<RomRecord>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn stats(&self) -> IndexStats {
        let mut records_per_database = BTreeMap::new();
        for record in &self.records {
            *records_per_database
                .entry(record.database.clone())
                .or_insert(0) += 1;
        }

        IndexStats {
            total_records: self.records.len(),
            unique_crc32: self.by_crc32.len(),
            unique_md5: self.by_md5.len(),
            unique_sha1: self.by_sha1.len(),
            distinct_sizes: self.by_size.len(),
            records_per_database,
        }
    }

    /// Case-insensitive substring search over record names. Shorter names that
    /// contain the query rank higher.
    pub fn search_by_name(&self, query: &str) -> Vec<NameMatch> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let mut matches: Vec<NameMatch> = self
            .records
            .iter()
            .filter(|record| record.name.to_lowercase().contains(&needle))
            .map(|record| {
                let name_len = record.name.to_lowercase().chars().count();
                let query_len = needle.chars().count();
                NameMatch {
                    record: Arc::clone(record),
                    score: query_len as f64 / name_len.max(query_len) as f64,
                }
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.record.name.cmp(&b.record.name))
        });
        matches
    }
}
