//! The launch sequence.
//!
//! ```text
//! START -> DB_WAIT -> IMPORT_CHECK -> FTP_CHECK -> DB_INIT -> MODE_SELECT
//!       -> DEV_LAUNCH | PROD_LAUNCH
//! ```
//!
//! Any fatal step failure moves to `ABORTED` and short-circuits the rest.
//! The sequencer stops at the launch stage with a planned [`ServerLaunch`];
//! handing off to it is the caller's job.

use strum::Display;
use tracing::{debug, error};

use crate::config::LaunchConfig;
use crate::error::Result;
use crate::mode::{LaunchMode, select_mode};
use crate::server::{ServerLaunch, plan_server};
use crate::step_runner::{StepOutcome, StepRunner, run_step};
use crate::steps::{StepKind, preflight_steps};

/// Where the sequence currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Start,
    DbWait,
    ImportCheck,
    FtpCheck,
    DbInit,
    ModeSelect,
    DevLaunch,
    ProdLaunch,
    Aborted,
}

impl From<StepKind> for Stage {
    fn from(kind: StepKind) -> Self {
        match kind {
            StepKind::WaitForDb => Self::DbWait,
            StepKind::TestImports => Self::ImportCheck,
            StepKind::TestFtp => Self::FtpCheck,
            StepKind::InitDb => Self::DbInit,
        }
    }
}

/// What the pre-flight phase produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedLaunch {
    pub launch: ServerLaunch,
    /// Outcome of every step that ran, in order.
    pub outcomes: Vec<(StepKind, StepOutcome)>,
}

impl PreparedLaunch {
    /// Steps whose failure was tolerated.
    pub fn tolerated(&self) -> impl Iterator<Item = StepKind> + '_ {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, StepOutcome::Tolerated(_)))
            .map(|(kind, _)| *kind)
    }
}

/// Drives the pre-flight steps and server planning for one launch.
pub struct Sequencer<'a, R: StepRunner> {
    config: &'a LaunchConfig,
    runner: R,
    stage: Stage,
}

impl<'a, R: StepRunner> Sequencer<'a, R> {
    pub fn new(config: &'a LaunchConfig, runner: R) -> Self {
        Self {
            config,
            runner,
            stage: Stage::Start,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Hand back the runner, e.g. to inspect a test double.
    pub fn into_runner(self) -> R {
        self.runner
    }

    fn enter(&mut self, stage: Stage) {
        debug!("{} -> {}", self.stage, stage);
        self.stage = stage;
    }

    /// Run every pre-flight step, select the mode and plan the server.
    pub fn prepare(&mut self) -> Result<PreparedLaunch> {
        let mut outcomes = Vec::new();
        for step in preflight_steps(&self.config.settings) {
            self.enter(step.kind.into());
            match run_step(&mut self.runner, &step) {
                Ok(outcome) => outcomes.push((step.kind, outcome)),
                Err(e) => {
                    error!("{}", e);
                    self.enter(Stage::Aborted);
                    return Err(e);
                }
            }
        }

        self.enter(Stage::ModeSelect);
        let mode = select_mode(self.config);
        self.enter(match mode {
            LaunchMode::Development => Stage::DevLaunch,
            LaunchMode::Production => Stage::ProdLaunch,
        });

        Ok(PreparedLaunch {
            launch: plan_server(mode, self.config),
            outcomes,
        })
    }
}
