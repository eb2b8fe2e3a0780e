//! Hand-off to the server process.
//!
//! Two strategies produce the same observable result, a single foreground
//! server whose exit status becomes the container's:
//! - `Exec` replaces the launcher's process image. Only returns on failure.
//! - `Supervise` spawns the server in its own process group, relays
//!   termination signals to it and returns its exit status.

use std::os::unix::process::CommandExt;
use std::time::Duration;

use strum::{Display, EnumString};
use tracing::{debug, info};

use crate::command::CommandSpec;
use crate::error::{LaunchError, Result};
use crate::process_guard::{self, CommandProcessGroup, ProcessGuard};
use crate::server::ServerLaunch;
use crate::step_runner::StepStatus;

/// Time a supervised server gets between SIGTERM and SIGKILL when the
/// launcher itself has to bail out.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// How the launcher gives way to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum HandoffStrategy {
    #[default]
    Exec,
    Supervise,
}

/// Start the server. Returns the exit status the launcher should exit with.
pub fn hand_off(launch: &ServerLaunch, strategy: HandoffStrategy) -> Result<i32> {
    info!(
        "Starting {} server ({}): {}",
        launch.mode, launch.variant, launch.command
    );
    match strategy {
        HandoffStrategy::Exec => exec_server(&launch.command),
        HandoffStrategy::Supervise => supervise_server(&launch.command),
    }
}

fn exec_server(spec: &CommandSpec) -> Result<i32> {
    let source = spec.to_command().exec();
    Err(LaunchError::Spawn {
        program: spec.program.clone(),
        source,
    })
}

/// Spawn, forward signals, wait, and report the child's status.
pub fn supervise_server(spec: &CommandSpec) -> Result<i32> {
    let guard = ProcessGuard::new(SHUTDOWN_GRACE);
    let mut child = spec
        .to_command()
        .in_new_process_group()
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
    let pid = child.id();
    guard.register_child(pid);
    debug!("Supervising {} as PID {}", spec.label, pid);

    // Installed after registration so an early signal is never swallowed
    // with nobody to forward it to.
    let forwarding = process_guard::init_signal_forwarding()
        .map_err(|e| LaunchError::handoff(format!("signal forwarding: {}", e)))?;
    info!("Forwarding signals to {} (PID {})", spec.label, pid);

    let status = child.wait();
    forwarding.close();
    let status = status?;
    guard.unregister_child(pid);

    let status = StepStatus::from(status);
    info!("{} exited with status {}", spec.label, status.code());
    Ok(status.code())
}
