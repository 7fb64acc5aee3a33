//! Logiqx XML DAT loading.
//!
//! Only the parts of the format needed for identification are read: the header
//! name, each `<game>`/`<machine>` with its description, and the `<rom>`
//! attributes. Everything else in the file is ignored.

use super::record::RomRecord;
use crate::digest::DigestKind;
use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct DatFile {
    header: Option<DatHeader>,
    #[serde(rename = "game", default)]
    games: Vec<DatGame>,
    #[serde(rename = "machine", default)]
    machines: Vec<DatGame>,
}

#[derive(Debug, Deserialize)]
struct DatHeader {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DatGame {
    #[serde(rename = "@name", default)]
    name: String,
    description: Option<String>,
    #[serde(rename = "rom", default)]
    roms: Vec<DatRom>,
}

#[derive(Debug, Deserialize)]
struct DatRom {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@size")]
    size: Option<String>,
    #[serde(rename = "@crc")]
    crc: Option<String>,
    #[serde(rename = "@md5")]
    md5: Option<String>,
    #[serde(rename = "@sha1")]
    sha1: Option<String>,
    #[serde(rename = "@status")]
    status: Option<String>,
}

/// Parse one DAT file into records whose target template is `template`.
pub fn load_dat_file(path: &Path, template: &str) -> Result<Vec<RomRecord>> {
    info!("Loading DAT file: {}", path.display());

    let xml = fs::read_to_string(path).map_err(|err| Error::Dat {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    let fallback_name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    let records = parse_dat(&xml, &fallback_name, template).map_err(|err| match err {
        Error::Dat { message, .. } => Error::Dat {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })?;

    info!("Loaded {} ROMs from {}", records.len(), path.display());
    Ok(records)
}

/// Parse DAT XML held in memory. `fallback_name` names the database when the
/// header does not.
pub fn parse_dat(xml: &str, fallback_name: &str, template: &str) -> Result<Vec<RomRecord>> {
    let dat: DatFile = quick_xml::de::from_str(xml).map_err(|err| Error::Dat {
        path: PathBuf::from(fallback_name),
        message: err.to_string(),
    })?;

    let database = dat
        .header
        .and_then(|header| header.name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| fallback_name.to_string());

    let mut records = Vec::new();

    for game in dat.games.iter().chain(dat.machines.iter()) {
        let game_name = game
            .description
            .as_deref()
            .map(str::trim)
            .filter(|description| !description.is_empty())
            .unwrap_or(game.name.as_str());

        for rom in &game.roms {
            if rom.status.as_deref() == Some("nodump") {
                debug!("Skipping nodump ROM '{}' in '{}'", rom.name, game_name);
                continue;
            }

            let size = rom
                .size
                .as_deref()
                .and_then(|size| size.trim().parse::<u64>().ok());

            let record = RomRecord::new(rom.name.as_str(), size)
                .with_game(game_name)
                .with_database(database.as_str())
                .with_template(template);

            let record = [
                (DigestKind::Crc32, &rom.crc),
                (DigestKind::Md5, &rom.md5),
                (DigestKind::Sha1, &rom.sha1),
            ]
            .into_iter()
            .try_fold(record, |record, (kind, raw)| {
                record.with_digest(kind, raw.as_deref().unwrap_or(""))
            })
            .map_err(|err| Error::Dat {
                path: PathBuf::from(fallback_name),
                message: format!("ROM '{}': {}", rom.name, err),
            })?;

            records.push(record);
        }
    }

    Ok(records)
}

/// Load several DAT files in order. A path given twice is only loaded once.
pub fn load_dat_files(paths: &[PathBuf], template: &str) -> Result<Vec<RomRecord>> {
    let mut seen: HashSet<PathBuf> = HashSet::new();
    let mut records = Vec::new();

    for path in paths {
        let key = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
        if !seen.insert(key) {
            info!("DAT file {} already loaded", path.display());
            continue;
        }
        records.extend(load_dat_file(path, template)?);
    }

    Ok(records)
}

/// All `*.dat` and `*.xml` files directly inside `dir`, sorted by path.
pub fn dat_files_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_dat = path
            .extension()
            .map(|ext| {
                let ext = ext.to_string_lossy().to_lowercase();
                ext == "dat" || ext == "xml"
            })
            .unwrap_or(false);
        if is_dat && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

pub fn load_dat_dir(dir: &Path, template: &str) -> Result<Vec<RomRecord>> {
    load_dat_files(&dat_files_in_dir(dir)?, template)
}
