use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use romident_core::digest::digest_file;
use romident_core::plan::ApplyStatus;
use romident_core::{
    apply_plan, build_index, AppConfig, EngineOptions, Error, FileOutcome, IdentifyEngine,
    MatchVerdict, PlannedAction, Report, ReportFormat, SilentReporter,
};

fn listing(dir: &Path) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                paths.extend(listing(&path));
            }
            paths.push(path);
        }
    }
    paths.sort();
    paths
}

fn rom_bytes(seed: u8, len: usize) -> Vec<u8> {
    (0..len).map(|i| seed.wrapping_add((i % 200) as u8)).collect()
}

/// Create a ROM directory and a DAT describing some of its files.
/// Layout:
///   roms/
///     game.rom        (1024 bytes, listed as "Game (USA).rom")
///     short.rom       (1023 bytes, SHA1 listed under a 1024-byte entry)
///     clone.rom       (same bytes as game.rom, collides on destination)
///     mystery.rom     (not in the DAT)
///     nested/hack.gb  (in the DAT by CRC only)
///     notes.txt       (not a ROM extension)
fn create_fixture(root: &Path) -> (PathBuf, PathBuf) {
    fs::create_dir_all(root.join("roms").join("nested")).unwrap();
    let roms = fs::canonicalize(root.join("roms")).unwrap();

    let game = rom_bytes(1, 1024);
    let short = rom_bytes(7, 1023);
    fs::write(roms.join("game.rom"), &game).unwrap();
    fs::write(roms.join("short.rom"), &short).unwrap();
    fs::write(roms.join("clone.rom"), &game).unwrap();
    fs::write(roms.join("mystery.rom"), rom_bytes(99, 512)).unwrap();
    fs::write(roms.join("nested").join("hack.gb"), rom_bytes(42, 256)).unwrap();
    fs::write(roms.join("notes.txt"), "not a rom").unwrap();

    let game_fds = digest_file(&roms.join("game.rom")).unwrap();
    let short_fds = digest_file(&roms.join("short.rom")).unwrap();
    let hack_fds = digest_file(&roms.join("nested").join("hack.gb")).unwrap();

    let dat = format!(
        r#"<?xml version="1.0"?>
<datafile>
    <header><name>Fixture</name></header>
    <game name="Game (USA)">
        <description>Game (USA)</description>
        <rom name="Game (USA).rom" size="1024" crc="{}" md5="{}" sha1="{}"/>
    </game>
    <game name="Short (Europe)">
        <rom name="Short (Europe).rom" size="1024" sha1="{}"/>
    </game>
    <game name="Hack (World)">
        <rom name="Hack (World).gb" size="256" crc="{}"/>
    </game>
</datafile>
"#,
        game_fds.crc32,
        game_fds.md5.to_uppercase(),
        game_fds.sha1,
        short_fds.sha1,
        hack_fds.crc32,
    );
    let dat_path = root.join("fixture.dat");
    fs::write(&dat_path, dat).unwrap();

    (roms, dat_path)
}

fn config_for(dat_path: &Path) -> AppConfig {
    AppConfig {
        dat_files: vec![dat_path.to_string_lossy().into_owned()],
        ..AppConfig::default()
    }
}

fn outcome_for<'a>(outcomes: &'a [FileOutcome], name: &str) -> &'a FileOutcome {
    outcomes
        .iter()
        .find(|outcome| outcome.path().file_name().unwrap() == name)
        .unwrap()
}

#[test]
fn test_full_identify_pipeline() {
    let tmp = tempdir().unwrap();
    let (roms, dat_path) = create_fixture(tmp.path());
    let config = config_for(&dat_path);

    let index = build_index(&config).unwrap();
    assert_eq!(index.len(), 3);

    let engine = IdentifyEngine::new(&index, EngineOptions::from_config(&config));
    let run = engine.run(&[roms.clone()], &SilentReporter).unwrap();

    // notes.txt is filtered out by extension
    assert_eq!(run.outcomes.len(), 5);

    let paths: Vec<_> = run.outcomes.iter().map(|o| o.path().to_path_buf()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted, "outcomes should be in path order");

    // clone.rom sorts before game.rom, so it claims the destination first.
    let clone = outcome_for(&run.outcomes, "clone.rom").entry().unwrap();
    assert!(clone.verdict.is_exact());
    assert_eq!(clone.destination(), Some(roms.join("Game (USA).rom").as_path()));

    let game = outcome_for(&run.outcomes, "game.rom").entry().unwrap();
    assert!(game.verdict.is_exact());
    assert!(game.conflict().is_some());

    let short = outcome_for(&run.outcomes, "short.rom").entry().unwrap();
    match &short.verdict {
        MatchVerdict::SizeMismatch {
            expected, actual, ..
        } => {
            assert_eq!(*expected, 1024);
            assert_eq!(*actual, 1023);
        }
        other => panic!("expected size mismatch, got {:?}", other),
    }
    assert_eq!(short.action, PlannedAction::ReportOnly);

    let mystery = outcome_for(&run.outcomes, "mystery.rom").entry().unwrap();
    assert_eq!(mystery.verdict, MatchVerdict::Unknown);

    let hack = outcome_for(&run.outcomes, "hack.gb").entry().unwrap();
    assert!(hack.verdict.is_exact());
    assert_eq!(
        hack.destination(),
        Some(roms.join("nested").join("Hack (World).gb").as_path())
    );
}

#[test]
fn test_same_root_spelled_twice_is_scanned_once() {
    let tmp = tempdir().unwrap();
    let (roms, dat_path) = create_fixture(tmp.path());
    let config = config_for(&dat_path);

    let index = build_index(&config).unwrap();
    let engine = IdentifyEngine::new(&index, EngineOptions::from_config(&config));
    let run = engine
        .run(
            &[roms.clone(), roms.join("nested").join("..")],
            &SilentReporter,
        )
        .unwrap();

    assert_eq!(run.outcomes.len(), 5);
    let renames: Vec<_> = run
        .plan_entries()
        .into_iter()
        .filter(|entry| entry.destination().is_some())
        .collect();
    assert_eq!(renames.len(), 2);
}

#[test]
fn test_identify_files_plans_in_path_order() {
    let tmp = tempdir().unwrap();
    let (roms, dat_path) = create_fixture(tmp.path());
    let config = config_for(&dat_path);

    let index = build_index(&config).unwrap();
    let engine = IdentifyEngine::new(&index, EngineOptions::from_config(&config));
    // game.rom given first, but clone.rom sorts first and wins the name.
    let run = engine.identify_files(
        &[roms.join("game.rom"), roms.join("clone.rom")],
        &SilentReporter,
    );

    assert_eq!(run.outcomes[0].path(), roms.join("clone.rom").as_path());
    let clone = outcome_for(&run.outcomes, "clone.rom").entry().unwrap();
    assert!(clone.destination().is_some());
    let game = outcome_for(&run.outcomes, "game.rom").entry().unwrap();
    assert!(game.conflict().is_some());
}

#[test]
fn test_dry_run_leaves_tree_untouched() {
    let tmp = tempdir().unwrap();
    let (roms, dat_path) = create_fixture(tmp.path());
    let config = config_for(&dat_path);
    let before = listing(tmp.path());

    let index = build_index(&config).unwrap();
    let engine = IdentifyEngine::new(&index, EngineOptions::from_config(&config));
    let run = engine.run(&[roms], &SilentReporter).unwrap();
    let outcome = apply_plan(&run.plan_entries(), true);

    assert_eq!(outcome.success_count, 2);
    assert!(outcome
        .results
        .iter()
        .all(|result| result.status == ApplyStatus::WouldRename));
    assert_eq!(listing(tmp.path()), before);
}

#[test]
fn test_apply_renames_identified_files() {
    let tmp = tempdir().unwrap();
    let (roms, dat_path) = create_fixture(tmp.path());
    let config = config_for(&dat_path);

    let index = build_index(&config).unwrap();
    let engine = IdentifyEngine::new(&index, EngineOptions::from_config(&config));
    let run = engine.run(&[roms.clone()], &SilentReporter).unwrap();
    let outcome = apply_plan(&run.plan_entries(), false);

    assert_eq!(outcome.success_count, 2);
    assert_eq!(outcome.error_count, 0);
    assert!(roms.join("Game (USA).rom").exists());
    assert!(!roms.join("clone.rom").exists());
    // The conflicting duplicate is left alone.
    assert!(roms.join("game.rom").exists());
    assert!(roms.join("nested").join("Hack (World).gb").exists());
    assert!(roms.join("short.rom").exists());

    let report = Report::new(&run, Some(&outcome), false);
    assert_eq!(report.summary.applied_renames, 2);
    assert_eq!(report.summary.conflicts, 1);

    // A second run sees the renamed file as already correctly named.
    let rerun = engine.run(&[roms.clone()], &SilentReporter).unwrap();
    let renamed = outcome_for(&rerun.outcomes, "Game (USA).rom").entry().unwrap();
    assert_eq!(renamed.action, PlannedAction::AlreadyNamed);
}

#[test]
fn test_output_dir_collects_renames() {
    let tmp = tempdir().unwrap();
    let (roms, dat_path) = create_fixture(tmp.path());
    let out = tmp.path().join("sorted");
    let config = AppConfig {
        output_dir: Some(out.to_string_lossy().into_owned()),
        ..config_for(&dat_path)
    };

    let index = build_index(&config).unwrap();
    let engine = IdentifyEngine::new(&index, EngineOptions::from_config(&config));
    let run = engine.run(&[roms], &SilentReporter).unwrap();
    apply_plan(&run.plan_entries(), false);

    assert!(out.join("Game (USA).rom").exists());
    assert!(out.join("Hack (World).gb").exists());
}

#[test]
fn test_duplicate_digest_in_dat_is_fatal() {
    let tmp = tempdir().unwrap();
    let dat_path = tmp.path().join("broken.dat");
    fs::write(
        &dat_path,
        r#"<datafile>
            <game name="A"><rom name="a.rom" size="1" crc="00000001"/></game>
            <game name="B"><rom name="b.rom" size="1" crc="00000001"/></game>
        </datafile>"#,
    )
    .unwrap();

    match build_index(&config_for(&dat_path)) {
        Err(Error::DatabaseIntegrity { first, second, .. }) => {
            assert_eq!(first, "a.rom");
            assert_eq!(second, "b.rom");
        }
        other => panic!("expected integrity error, got {:?}", other.map(|i| i.len())),
    }
}

#[test]
fn test_no_dat_configured_is_error() {
    assert!(matches!(
        build_index(&AppConfig::default()),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_dat_dir_is_loaded() {
    let tmp = tempdir().unwrap();
    let (_, dat_path) = create_fixture(tmp.path());
    let config = AppConfig {
        dat_dir: Some(dat_path.parent().unwrap().to_string_lossy().into_owned()),
        ..AppConfig::default()
    };

    let index = build_index(&config).unwrap();
    assert_eq!(index.len(), 3);
    assert_eq!(index.stats().records_per_database.get("Fixture"), Some(&3));
}

#[test]
fn test_report_renders_run() {
    let tmp = tempdir().unwrap();
    let (roms, dat_path) = create_fixture(tmp.path());
    let config = config_for(&dat_path);

    let index = build_index(&config).unwrap();
    let engine = IdentifyEngine::new(&index, EngineOptions::from_config(&config));
    let run = engine.run(&[roms], &SilentReporter).unwrap();
    let report = Report::new(&run, None, true);

    assert_eq!(report.summary.total_files, 5);
    assert_eq!(report.summary.exact, 3);
    assert_eq!(report.summary.size_mismatch, 1);
    assert_eq!(report.summary.unknown, 1);

    let text = report.render(ReportFormat::Text).unwrap();
    assert!(text.contains("Identified 3 ROMs (60.0%)"));
}
