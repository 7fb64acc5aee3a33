mod commands;
mod logging;
mod progress;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, DatArgs, RunArgs};
use dotenv::dotenv;
use progress::CliReporter;
use romident_core::report::ReportSummary;
use romident_core::{
    apply_plan_with, build_index, AppConfig, ApplyOptions, BackupOptions, DatabaseIndex,
    EngineOptions, IdentifyEngine, Report, ReportFormat, RunReport,
};
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let args = Cli::parse();

    let config = match romident_core::config::load_configuration_from(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let result = match args.command {
        Some(Commands::Scan(run)) => run_identify(config, &run, Mode::Scan),
        Some(Commands::Rename { run, backup }) => {
            run_identify(config, &run, Mode::Rename { backup })
        }
        Some(Commands::Report { run, output }) => run_identify(config, &run, Mode::Report { output }),
        Some(Commands::Stats(dats)) => run_stats(config, &dats),
        Some(Commands::Search { dats, query, limit }) => run_search(config, &dats, &query, limit),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:#?}", config);
            Ok(())
        }
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

enum Mode {
    Scan,
    Rename { backup: Option<Option<PathBuf>> },
    Report { output: Option<PathBuf> },
}

fn apply_dat_args(config: &mut AppConfig, dats: &DatArgs) {
    if !dats.dat_files.is_empty() {
        config.dat_files = dats
            .dat_files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
    }
    if let Some(dir) = &dats.dat_dir {
        config.dat_dir = Some(dir.to_string_lossy().into_owned());
    }
}

fn apply_run_args(config: &mut AppConfig, run: &RunArgs) {
    apply_dat_args(config, &run.dats);
    if !run.paths.is_empty() {
        config.root_paths = run
            .paths
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
    }
    if let Some(dir) = &run.output_dir {
        config.output_dir = Some(dir.to_string_lossy().into_owned());
    }
    if let Some(template) = &run.template {
        config.name_template = template.clone();
    }
    if run.no_recursive {
        config.recursive = false;
    }
}

fn load_index(config: &AppConfig) -> anyhow::Result<DatabaseIndex> {
    info!("Loading DAT databases...");
    build_index(config).context("failed to load ROM databases")
}

fn run_identify(mut config: AppConfig, run: &RunArgs, mode: Mode) -> anyhow::Result<()> {
    apply_run_args(&mut config, run);
    if config.root_paths.is_empty() {
        bail!("no paths to scan; pass --path or set root_paths in the configuration");
    }

    let index = load_index(&config)?;
    let roots: Vec<PathBuf> = config.root_paths.iter().map(PathBuf::from).collect();
    let engine = IdentifyEngine::new(&index, EngineOptions::from_config(&config));
    let reporter = CliReporter::new();
    let run_report = engine.run(&roots, &reporter)?;

    let format = ReportFormat::from(run.format);
    let report = match &mode {
        Mode::Rename { backup } => {
            let options = ApplyOptions {
                dry_run: run.dry_run,
                backup: backup
                    .as_ref()
                    .map(|dir| BackupOptions::new(dir.clone(), &roots)),
            };
            let outcome = apply_plan_with(&run_report.plan_entries(), &options);
            if outcome.error_count > 0 {
                error!("{} renames failed", outcome.error_count);
            }
            Report::new(&run_report, Some(&outcome), run.dry_run)
        }
        Mode::Scan | Mode::Report { .. } => Report::new(&run_report, None, true),
    };

    let rendered = report.render(format)?;
    match &mode {
        Mode::Report {
            output: Some(output),
        } => {
            write_report(output, &rendered)?;
            info!("Report written to {}", output.display());
        }
        _ => print!("{}", rendered),
    }

    print_summary(&run_report, &report.summary);
    Ok(())
}

fn write_report(output: &Path, rendered: &str) -> anyhow::Result<()> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(output, rendered).with_context(|| format!("failed to write {}", output.display()))
}

fn print_summary(run: &RunReport, summary: &ReportSummary) {
    info!(
        "Scan: {}, Hash: {}",
        format!("{:.2}s", run.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", run.hash_duration.as_secs_f64()).green(),
    );
    info!(
        "{} of {} files identified ({}), {} size mismatches, {} digest conflicts, {} unknown",
        format!("{}", summary.exact).green(),
        summary.total_files,
        format!("{:.1}%", summary.identification_rate * 100.0).green(),
        format!("{}", summary.size_mismatch).yellow(),
        format!("{}", summary.digest_conflict).red(),
        format!("{}", summary.unknown).yellow(),
    );
    if summary.conflicts > 0 || summary.failed_renames > 0 {
        info!(
            "{} rename conflicts, {} failed renames",
            format!("{}", summary.conflicts).red(),
            format!("{}", summary.failed_renames).red(),
        );
    }
}

fn run_stats(mut config: AppConfig, dats: &DatArgs) -> anyhow::Result<()> {
    apply_dat_args(&mut config, dats);
    let index = load_index(&config)?;
    let stats = index.stats();

    println!("{}", "Database statistics".bold());
    println!("  Total ROMs:      {}", stats.total_records.to_string().cyan());
    println!("  Unique CRC32:    {}", stats.unique_crc32);
    println!("  Unique MD5:      {}", stats.unique_md5);
    println!("  Unique SHA1:     {}", stats.unique_sha1);
    println!("  Distinct sizes:  {}", stats.distinct_sizes);
    for (database, count) in &stats.records_per_database {
        println!("  {}: {}", database.cyan(), count);
    }
    Ok(())
}

fn run_search(mut config: AppConfig, dats: &DatArgs, query: &str, limit: usize) -> anyhow::Result<()> {
    apply_dat_args(&mut config, dats);
    let index = load_index(&config)?;
    let matches = index.search_by_name(query);

    if matches.is_empty() {
        println!("No ROMs match '{}'", query);
        return Ok(());
    }

    for found in matches.iter().take(limit) {
        let record = &found.record;
        println!(
            "{:>5.1}%  {}  [{}]  {}",
            found.score * 100.0,
            record.name.green(),
            record.database,
            record.sha1.as_deref().or(record.md5.as_deref()).or(record.crc32.as_deref()).unwrap_or("-"),
        );
    }
    if matches.len() > limit {
        println!("... {} more", matches.len() - limit);
    }
    Ok(())
}
