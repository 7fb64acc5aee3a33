pub mod config;
pub mod database;
pub mod digest;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod plan;
pub mod progress;
pub mod report;
pub mod scanner;

pub use config::AppConfig;
pub use database::{DatabaseIndex, RomRecord};
pub use digest::{DigestKind, FileDigestSet};
pub use engine::{build_index, EngineOptions, FileOutcome, IdentifyEngine, RunReport};
pub use error::{ConflictError, Error};
pub use matcher::{MatchVerdict, Matcher};
pub use plan::{
    apply_plan, apply_plan_with, ApplyOptions, BackupOptions, PlannedAction, RenamePlanEntry,
    RenamePlanner,
};
pub use progress::{ProgressReporter, SilentReporter};
pub use report::{Report, ReportFormat};
