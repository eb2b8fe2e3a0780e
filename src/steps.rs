//! Pre-flight steps.
//!
//! The four checks that run before the server starts, in this fixed order:
//! - `wait-for-db`: blocks until the database is reachable
//! - `test-imports`: verifies the application's dependencies import
//! - `test-ftp`: FTP connectivity check, the only tolerated failure
//! - `init-db`: applies schema and seed data
//!
//! Each external program owns its own retries and timeouts.

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::command::CommandArgs;
use crate::config::{Settings, StepOverride};

/// Identity of a pre-flight step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum StepKind {
    WaitForDb,
    TestImports,
    TestFtp,
    InitDb,
}

impl StepKind {
    /// Whether a failure of this step is logged and skipped instead of
    /// aborting the launch.
    pub fn is_fault_tolerant(&self) -> bool {
        matches!(self, Self::TestFtp)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::WaitForDb => "Waiting for database",
            Self::TestImports => "Testing imports",
            Self::TestFtp => "Testing FTP connection",
            Self::InitDb => "Initializing database",
        }
    }

    fn default_command(&self, python: &str) -> (String, Vec<String>) {
        match self {
            Self::WaitForDb => ("./wait-for-db.sh".to_string(), vec![]),
            Self::TestImports => (python.to_string(), vec!["test_imports.py".to_string()]),
            Self::TestFtp => (python.to_string(), vec!["test_ftp.py".to_string()]),
            Self::InitDb => (python.to_string(), vec!["init_db.py".to_string()]),
        }
    }

    fn override_in<'a>(&self, settings: &'a Settings) -> Option<&'a StepOverride> {
        match self {
            Self::WaitForDb => settings.steps.wait_for_db.as_ref(),
            Self::TestImports => settings.steps.test_imports.as_ref(),
            Self::TestFtp => settings.steps.test_ftp.as_ref(),
            Self::InitDb => settings.steps.init_db.as_ref(),
        }
    }
}

/// One resolved pre-flight command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreflightStep {
    pub kind: StepKind,
    pub program: String,
    pub args: Vec<String>,
}

impl PreflightStep {
    /// Resolve the command for `kind`, preferring a settings override.
    pub fn resolve(kind: StepKind, settings: &Settings) -> Self {
        let (program, args) = match kind.override_in(settings) {
            Some(o) => (o.program.clone(), o.args.clone()),
            None => kind.default_command(&settings.python),
        };
        Self {
            kind,
            program,
            args,
        }
    }

    pub fn is_fault_tolerant(&self) -> bool {
        self.kind.is_fault_tolerant()
    }
}

impl CommandArgs for PreflightStep {
    fn program(&self) -> &str {
        &self.program
    }

    fn to_cli_args(&self) -> Vec<String> {
        self.args.clone()
    }

    fn label(&self) -> &str {
        match self.kind {
            StepKind::WaitForDb => "wait-for-db",
            StepKind::TestImports => "test-imports",
            StepKind::TestFtp => "test-ftp",
            StepKind::InitDb => "init-db",
        }
    }
}

/// All pre-flight steps in execution order.
pub fn preflight_steps(settings: &Settings) -> Vec<PreflightStep> {
    StepKind::iter()
        .map(|kind| PreflightStep::resolve(kind, settings))
        .collect()
}
