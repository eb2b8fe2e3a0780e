//! Integration tests for the launch sequence
//!
//! These run the real `ProcessRunner` against small `sh` snippets that stand
//! in for the pre-flight programs. Each snippet touches a marker file so the
//! tests can see exactly which steps ran.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use launchseq::config::{StepOverride, StepOverrides};
use launchseq::{
    LaunchConfig, LaunchError, LaunchMode, LaunchVariant, ProcessRunner, Sequencer, Settings,
    Stage, StepKind,
};

/// Step that records itself in `dir` and exits with `code`.
fn marker_step(dir: &Path, name: &str, code: i32) -> Option<StepOverride> {
    let marker = dir.join(name);
    Some(StepOverride {
        program: "sh".to_string(),
        args: vec![
            "-c".to_string(),
            format!("touch '{}'; exit {}", marker.display(), code),
        ],
    })
}

fn settings_with_codes(dir: &Path, codes: [i32; 4]) -> Settings {
    Settings {
        steps: StepOverrides {
            wait_for_db: marker_step(dir, "wait-for-db", codes[0]),
            test_imports: marker_step(dir, "test-imports", codes[1]),
            test_ftp: marker_step(dir, "test-ftp", codes[2]),
            init_db: marker_step(dir, "init-db", codes[3]),
        },
        ..Settings::default()
    }
}

fn config(settings: Settings, debug: Option<&str>, path: Option<&Path>) -> LaunchConfig {
    LaunchConfig {
        debug: debug.map(str::to_string),
        node_env: None,
        path: path.map(|p| p.display().to_string()),
        settings,
    }
}

fn ran(dir: &Path, name: &str) -> bool {
    dir.join(name).exists()
}

fn install_tool(dir: &Path, name: &str) -> PathBuf {
    let tool = dir.join(name);
    fs::write(&tool, "#!/bin/sh\nexit 0\n").expect("write tool");
    fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).expect("chmod tool");
    tool
}

// =============================================================================
// Failure policy
// =============================================================================

#[test]
fn test_db_wait_failure_exits_with_its_code_and_runs_nothing_else() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = config(settings_with_codes(dir.path(), [3, 0, 0, 0]), None, None);

    let mut sequencer = Sequencer::new(&config, ProcessRunner);
    let err = sequencer.prepare().unwrap_err();

    assert!(matches!(err, LaunchError::StepFailed { code: 3, .. }));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(sequencer.stage(), Stage::Aborted);
    assert!(ran(dir.path(), "wait-for-db"));
    assert!(!ran(dir.path(), "test-imports"));
    assert!(!ran(dir.path(), "test-ftp"));
    assert!(!ran(dir.path(), "init-db"));
}

#[test]
fn test_ftp_failure_still_runs_init_and_launches() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = config(settings_with_codes(dir.path(), [0, 0, 1, 0]), None, None);

    let mut sequencer = Sequencer::new(&config, ProcessRunner);
    let prepared = sequencer.prepare().expect("ftp failure is tolerated");

    assert!(ran(dir.path(), "init-db"));
    assert_eq!(prepared.tolerated().collect::<Vec<_>>(), vec![StepKind::TestFtp]);
    assert_eq!(sequencer.stage(), Stage::ProdLaunch);
}

#[test]
fn test_missing_ftp_program_is_tolerated() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut settings = settings_with_codes(dir.path(), [0, 0, 0, 0]);
    settings.steps.test_ftp = Some(StepOverride {
        program: "/nonexistent/test_ftp".to_string(),
        args: vec![],
    });
    let config = config(settings, None, None);

    let mut sequencer = Sequencer::new(&config, ProcessRunner);
    assert!(sequencer.prepare().is_ok());
    assert!(ran(dir.path(), "init-db"));
}

#[test]
fn test_init_failure_is_fatal() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = config(settings_with_codes(dir.path(), [0, 0, 0, 12]), None, None);

    let err = Sequencer::new(&config, ProcessRunner).prepare().unwrap_err();
    assert_eq!(err.exit_code(), 12);
}

#[test]
fn test_missing_fatal_program_exits_127() {
    let dir = tempfile::tempdir().expect("temp dir");
    let mut settings = settings_with_codes(dir.path(), [0, 0, 0, 0]);
    settings.steps.test_imports = Some(StepOverride {
        program: "/nonexistent/test_imports".to_string(),
        args: vec![],
    });
    let config = config(settings, None, None);

    let err = Sequencer::new(&config, ProcessRunner).prepare().unwrap_err();
    assert_eq!(err.exit_code(), 127);
    assert!(!ran(dir.path(), "test-ftp"));
}

// =============================================================================
// Launch scenarios
// =============================================================================

#[test]
fn test_production_with_process_manager() {
    let steps = tempfile::tempdir().expect("temp dir");
    let bin = tempfile::tempdir().expect("temp dir");
    let manager = install_tool(bin.path(), "gunicorn");
    let config = config(
        settings_with_codes(steps.path(), [0, 0, 0, 0]),
        None,
        Some(bin.path()),
    );

    let prepared = Sequencer::new(&config, ProcessRunner)
        .prepare()
        .expect("sequence should pass");
    let launch = prepared.launch;

    assert_eq!(launch.mode, LaunchMode::Production);
    assert_eq!(launch.variant, LaunchVariant::ProcessManager);
    assert_eq!(launch.command.program, manager.display().to_string());
    let args = launch.command.args.join(" ");
    assert!(args.contains("--workers 4"));
    assert!(args.contains("--worker-class uvicorn.workers.UvicornWorker"));
    assert!(args.contains("--bind 0.0.0.0:8000"));
    assert!(args.contains("--access-logfile - --error-logfile -"));
    assert!(args.contains("--log-level info"));
}

#[test]
fn test_production_without_process_manager_never_uses_workers_4() {
    let steps = tempfile::tempdir().expect("temp dir");
    let bin = tempfile::tempdir().expect("temp dir");
    let config = config(
        settings_with_codes(steps.path(), [0, 0, 0, 0]),
        None,
        Some(bin.path()),
    );

    let launch = Sequencer::new(&config, ProcessRunner)
        .prepare()
        .expect("sequence should pass")
        .launch;

    assert_eq!(launch.variant, LaunchVariant::Fallback);
    assert_eq!(launch.command.program, "uvicorn");
    let args = launch.command.args.join(" ");
    assert!(args.contains("--workers 1"));
    assert!(!args.contains("--workers 4"));
    assert!(args.contains("--port 8000"));
}

#[test]
fn test_debug_true_launches_reloading_dev_server() {
    let steps = tempfile::tempdir().expect("temp dir");
    let bin = tempfile::tempdir().expect("temp dir");
    install_tool(bin.path(), "gunicorn");
    let config = config(
        settings_with_codes(steps.path(), [0, 0, 0, 0]),
        Some("true"),
        Some(bin.path()),
    );

    let launch = Sequencer::new(&config, ProcessRunner)
        .prepare()
        .expect("sequence should pass")
        .launch;

    assert_eq!(launch.variant, LaunchVariant::Development);
    assert_eq!(
        launch.command.to_string(),
        "uvicorn app.main:app --host 0.0.0.0 --port 8000 --reload --log-level debug"
    );
}
