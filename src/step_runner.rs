//! Synchronous pre-flight step execution.
//!
//! `run_step` is the only place a step's exit status is interpreted:
//! a fatal step that fails becomes a `LaunchError` carrying its exit code,
//! a tolerated step that fails is logged at warn level and reported as
//! [`StepOutcome::Tolerated`].

use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;
use std::time::Instant;

use tracing::{info, warn};

use crate::command::{CommandArgs, CommandSpec};
use crate::error::{LaunchError, Result};
use crate::process_guard::CommandProcessGroup;
use crate::steps::PreflightStep;

/// How a child process finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Exited normally with this code.
    Exited(i32),
    /// Killed by this signal number.
    Signaled(i32),
}

impl StepStatus {
    pub fn success(&self) -> bool {
        matches!(self, Self::Exited(0))
    }

    /// Shell-style status: the exit code, or `128 + signal`.
    pub fn code(&self) -> i32 {
        match self {
            Self::Exited(code) => *code,
            Self::Signaled(sig) => 128 + sig,
        }
    }
}

impl From<ExitStatus> for StepStatus {
    fn from(status: ExitStatus) -> Self {
        match (status.code(), status.signal()) {
            (Some(code), _) => Self::Exited(code),
            (None, Some(sig)) => Self::Signaled(sig),
            (None, None) => Self::Exited(1),
        }
    }
}

/// Result of a step that did not abort the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    /// A fault-tolerant step failed with this status; the sequence continues.
    Tolerated(StepStatus),
}

/// Executes a command to completion.
pub trait StepRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<StepStatus>;
}

/// Runs commands as real child processes with inherited stdio.
#[derive(Debug, Default)]
pub struct ProcessRunner;

impl StepRunner for ProcessRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<StepStatus> {
        let status = spec
            .to_command()
            .die_with_parent()
            .status()
            .map_err(|source| LaunchError::Spawn {
                program: spec.program.clone(),
                source,
            })?;
        Ok(status.into())
    }
}

/// Logs commands instead of running them; every command succeeds.
#[derive(Debug, Default)]
pub struct DryRunRunner;

impl StepRunner for DryRunRunner {
    fn run(&mut self, spec: &CommandSpec) -> Result<StepStatus> {
        info!("[DRY RUN] Skipped: {}", spec);
        Ok(StepStatus::Exited(0))
    }
}

/// Run one pre-flight step and apply its failure policy.
pub fn run_step<R: StepRunner + ?Sized>(
    runner: &mut R,
    step: &PreflightStep,
) -> Result<StepOutcome> {
    let spec = step.to_spec();
    info!("{}...", step.kind.description());
    info!("Command: {}", spec);

    let started = Instant::now();
    let result = runner.run(&spec);
    let elapsed = started.elapsed();

    let status = match result {
        Ok(status) => status,
        Err(e) if step.is_fault_tolerant() => {
            warn!("{} could not run ({}), continuing", step.label(), e);
            return Ok(StepOutcome::Tolerated(StepStatus::Exited(e.exit_code())));
        }
        Err(e) => return Err(e),
    };

    if status.success() {
        info!("{} completed successfully in {:.2?}", step.label(), elapsed);
        return Ok(StepOutcome::Succeeded);
    }

    if step.is_fault_tolerant() {
        warn!(
            "{} failed with exit code {}, continuing",
            step.label(),
            status.code()
        );
        return Ok(StepOutcome::Tolerated(status));
    }

    match status {
        StepStatus::Exited(code) => Err(LaunchError::StepFailed {
            step: step.label().to_string(),
            code,
        }),
        StepStatus::Signaled(signal) => Err(LaunchError::StepTerminated {
            step: step.label().to_string(),
            signal,
        }),
    }
}
