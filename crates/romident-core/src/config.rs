use crate::database::DEFAULT_NAME_TEMPLATE;
use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ROM_EXTENSIONS: [&str; 23] = [
    ".nes", ".smc", ".sfc", ".gb", ".gbc", ".gba", ".n64", ".z64", ".v64", ".nds", ".iso", ".cue",
    ".bin", ".smd", ".md", ".32x", ".gg", ".sms", ".zip", ".7z", ".rom", ".ccd", ".chd",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub root_paths: Vec<String>,
    pub ignore_patterns: Vec<String>,
    pub dat_files: Vec<String>,
    pub dat_dir: Option<String>,
    pub rom_extensions: Vec<String>,
    pub name_template: String,
    pub output_dir: Option<String>,
    pub recursive: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_paths: Vec::new(),
            ignore_patterns: Vec::new(),
            dat_files: Vec::new(),
            dat_dir: None,
            rom_extensions: DEFAULT_ROM_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            name_template: DEFAULT_NAME_TEMPLATE.to_string(),
            output_dir: None,
            recursive: true,
        }
    }
}

const LIST_KEYS: [&str; 4] = ["root_paths", "ignore_patterns", "dat_files", "rom_extensions"];

/// Load `Config.toml` from the working directory if present, overlaid by
/// `ROMIDENT_*` environment variables.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    load_configuration_from(None)
}

/// Like [`load_configuration`], but an explicit file must exist.
pub fn load_configuration_from(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let file_source = match path {
        Some(path) => ConfigFile::from(path).required(true),
        None => ConfigFile::with_name("Config").required(false),
    };

    // List fields take comma separated values, e.g. ROMIDENT_DAT_FILES=a.dat,b.dat
    let environment = LIST_KEYS.iter().fold(
        Environment::with_prefix("ROMIDENT")
            .try_parsing(true)
            .list_separator(","),
        |env, key| env.with_list_parse_key(key),
    );

    let builder = Config::builder()
        .add_source(file_source)
        .add_source(environment)
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

/// Resolve each root to its real path (keeping the given spelling when it
/// cannot be resolved), then collapse nested and repeated roots.
pub fn canonical_roots(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let resolved = dirs
        .into_iter()
        .map(|dir| fs::canonicalize(&dir).unwrap_or(dir))
        .collect();
    non_overlapping_directories(resolved)
}

/// Remove directories that are subdirectories of other directories in the list.
pub fn non_overlapping_directories(dirs: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for dir in dirs {
        if result.iter().any(|kept| dir.starts_with(kept)) {
            continue;
        }
        result.retain(|kept| !kept.starts_with(&dir));
        result.push(dir);
    }

    result
}
