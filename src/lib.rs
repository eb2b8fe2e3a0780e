//! launchseq library
//!
//! Pre-flight checks and server hand-off for a containerised web backend.

pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod handoff;
pub mod logging;
pub mod mode;
pub mod process_guard;
pub mod sequencer;
pub mod server;
pub mod step_runner;
pub mod steps;

// Re-export main types for convenience
pub use command::{CommandArgs, CommandSpec};
pub use config::{LaunchConfig, Settings};
pub use error::{LaunchError, Result};
pub use handoff::{HandoffStrategy, hand_off};
pub use mode::{LaunchMode, select_mode};
pub use process_guard::{ChildRegistry, CommandProcessGroup, ProcessGuard};
pub use sequencer::{PreparedLaunch, Sequencer, Stage};
pub use server::{LaunchVariant, ServerLaunch, find_in_path, plan_server};
pub use step_runner::{DryRunRunner, ProcessRunner, StepOutcome, StepRunner, StepStatus, run_step};
pub use steps::{PreflightStep, StepKind, preflight_steps};
