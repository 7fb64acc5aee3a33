use clap::{Args, Parser, Subcommand, ValueEnum};
use romident_core::ReportFormat;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "romident")]
#[command(about = "Identify ROM files against DAT databases and rename them", long_about = None)]
pub struct Cli {
    /// Configuration file to use instead of ./Config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Identify files and print what would happen, without touching them
    Scan(RunArgs),
    /// Identify files and rename the exact matches
    Rename {
        #[command(flatten)]
        run: RunArgs,

        /// Copy each file before renaming it, into DIR or `<root>_backup`
        #[arg(long, value_name = "DIR", num_args = 0..=1)]
        backup: Option<Option<PathBuf>>,
    },
    /// Identify files and write a full report
    Report {
        #[command(flatten)]
        run: RunArgs,

        /// File to write the report to (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print statistics about the loaded databases
    Stats(DatArgs),
    /// Search the loaded databases by ROM name
    Search {
        #[command(flatten)]
        dats: DatArgs,

        /// Name or name fragment to look for
        query: String,

        /// Maximum number of results
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Print configuration values
    PrintConfig,
}

#[derive(Debug, Clone, Default, Args)]
pub struct DatArgs {
    /// DAT file to load (repeatable); replaces the configured list
    #[arg(long = "dat")]
    pub dat_files: Vec<PathBuf>,

    /// Directory whose .dat and .xml files are all loaded
    #[arg(long)]
    pub dat_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Directory or file to process (repeatable); replaces the configured roots
    #[arg(long = "path")]
    pub paths: Vec<PathBuf>,

    #[command(flatten)]
    pub dats: DatArgs,

    /// Move renamed files into this directory instead of renaming in place
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Destination name template, e.g. "{game}{ext}"
    #[arg(long)]
    pub template: Option<String>,

    /// Only look at files directly inside each path
    #[arg(long)]
    pub no_recursive: bool,

    /// Plan without renaming; `scan` and `report` never rename anyway
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
    Html,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ReportFormat::Text,
            OutputFormat::Json => ReportFormat::Json,
            OutputFormat::Csv => ReportFormat::Csv,
            OutputFormat::Html => ReportFormat::Html,
        }
    }
}
