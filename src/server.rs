//! Typed server launch commands.
//!
//! - `DevServerArgs`: app server with auto-reload and debug logging
//! - `ProcessManagerArgs`: process manager with N async workers, logs on stdio
//! - `FallbackServerArgs`: app server with a single worker
//!
//! The production branch is chosen by probing `PATH` for the process manager.

use std::path::{Path, PathBuf};

use nix::unistd::{AccessFlags, access};
use strum::Display;
use tracing::{debug, info};

use crate::command::{CommandArgs, CommandSpec};
use crate::config::{LaunchConfig, Settings};
use crate::mode::LaunchMode;

// ============================================================================
// Development server
// ============================================================================

/// Auto-reloading single process bound to all interfaces.
#[derive(Debug, Clone)]
pub struct DevServerArgs {
    pub server: String,
    pub app: String,
    pub host: String,
    pub port: u16,
}

impl CommandArgs for DevServerArgs {
    fn program(&self) -> &str {
        &self.server
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            self.app.clone(),
            "--host".to_string(),
            self.host.clone(),
            "--port".to_string(),
            self.port.to_string(),
            "--reload".to_string(),
            "--log-level".to_string(),
            "debug".to_string(),
        ]
    }

    fn label(&self) -> &str {
        "dev-server"
    }
}

// ============================================================================
// Process manager
// ============================================================================

/// Multi-worker process manager with access and error logs on stdio.
#[derive(Debug, Clone)]
pub struct ProcessManagerArgs {
    /// Resolved location of the process manager executable.
    pub manager: String,
    pub app: String,
    pub workers: u32,
    pub worker_class: String,
    pub bind: String,
}

impl CommandArgs for ProcessManagerArgs {
    fn program(&self) -> &str {
        &self.manager
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            self.app.clone(),
            "--workers".to_string(),
            self.workers.to_string(),
            "--worker-class".to_string(),
            self.worker_class.clone(),
            "--bind".to_string(),
            self.bind.clone(),
            // "-" sends the log to stdout / stderr respectively
            "--access-logfile".to_string(),
            "-".to_string(),
            "--error-logfile".to_string(),
            "-".to_string(),
            "--log-level".to_string(),
            "info".to_string(),
        ]
    }

    fn label(&self) -> &str {
        "process-manager"
    }
}

// ============================================================================
// Single-worker fallback
// ============================================================================

/// App server run directly when no process manager is installed.
#[derive(Debug, Clone)]
pub struct FallbackServerArgs {
    pub server: String,
    pub app: String,
    pub host: String,
    pub port: u16,
}

impl CommandArgs for FallbackServerArgs {
    fn program(&self) -> &str {
        &self.server
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![
            self.app.clone(),
            "--host".to_string(),
            self.host.clone(),
            "--port".to_string(),
            self.port.to_string(),
            "--workers".to_string(),
            "1".to_string(),
            "--log-level".to_string(),
            "info".to_string(),
        ]
    }

    fn label(&self) -> &str {
        "fallback-server"
    }
}

// ============================================================================
// Planning
// ============================================================================

/// Which server configuration was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum LaunchVariant {
    Development,
    ProcessManager,
    Fallback,
}

/// The server command the launcher will hand off to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerLaunch {
    pub mode: LaunchMode,
    pub variant: LaunchVariant,
    pub command: CommandSpec,
}

/// Build the server command for `mode`.
///
/// In production the process manager is looked up on the configured `PATH`;
/// its absence silently downgrades to the single-worker fallback.
pub fn plan_server(mode: LaunchMode, config: &LaunchConfig) -> ServerLaunch {
    let settings = &config.settings;
    let (variant, command) = match mode {
        LaunchMode::Development => (
            LaunchVariant::Development,
            dev_server(settings).to_spec(),
        ),
        LaunchMode::Production => {
            match find_in_path(&settings.process_manager, config.path.as_deref()) {
                Some(found) => {
                    debug!("Found {} at {}", settings.process_manager, found.display());
                    (
                        LaunchVariant::ProcessManager,
                        process_manager(settings, &found).to_spec(),
                    )
                }
                None => {
                    info!(
                        "{} not found on PATH, using single-worker {}",
                        settings.process_manager, settings.server
                    );
                    (LaunchVariant::Fallback, fallback_server(settings).to_spec())
                }
            }
        }
    };
    ServerLaunch {
        mode,
        variant,
        command,
    }
}

fn dev_server(settings: &Settings) -> DevServerArgs {
    DevServerArgs {
        server: settings.server.clone(),
        app: settings.app.clone(),
        host: settings.host.clone(),
        port: settings.port,
    }
}

fn process_manager(settings: &Settings, found: &Path) -> ProcessManagerArgs {
    ProcessManagerArgs {
        manager: found.display().to_string(),
        app: settings.app.clone(),
        workers: settings.workers,
        worker_class: settings.worker_class.clone(),
        bind: settings.bind_address(),
    }
}

fn fallback_server(settings: &Settings) -> FallbackServerArgs {
    FallbackServerArgs {
        server: settings.server.clone(),
        app: settings.app.clone(),
        host: settings.host.clone(),
        port: settings.port,
    }
}

/// Locate an executable the way a shell's `command -v` would.
///
/// A name containing `/` is checked as-is; otherwise each `PATH` entry is
/// tried in order. Empty entries mean the current directory.
pub fn find_in_path(name: &str, path: Option<&str>) -> Option<PathBuf> {
    if name.contains('/') {
        let candidate = PathBuf::from(name);
        return is_executable(&candidate).then_some(candidate);
    }
    let path = path?;
    std::env::split_paths(path)
        .map(|dir| {
            if dir.as_os_str().is_empty() {
                PathBuf::from(".").join(name)
            } else {
                dir.join(name)
            }
        })
        .find(|candidate| is_executable(candidate))
}

/// A regular file the current user may execute.
fn is_executable(path: &Path) -> bool {
    let is_file = std::fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
    is_file && access(path, AccessFlags::X_OK).is_ok()
}
