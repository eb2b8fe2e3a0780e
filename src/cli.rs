use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::handoff::HandoffStrategy;

/// launchseq - pre-flight checks, then hand off to the web server
#[derive(Parser, Debug)]
#[command(name = "launchseq")]
#[command(about = "Run pre-flight checks and start the application server")]
#[command(version)]
pub struct Cli {
    /// JSON settings file overriding server and step commands
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Keep the launcher running as a supervisor that forwards signals,
    /// instead of replacing it with the server process
    #[arg(long, global = true)]
    pub supervise: bool,

    /// Log every command that would run without executing anything
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the pre-flight steps and start the server (default)
    Run,
    /// Print the selected mode and server command; run nothing
    Plan,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn strategy(&self) -> HandoffStrategy {
        if self.supervise {
            HandoffStrategy::Supervise
        } else {
            HandoffStrategy::Exec
        }
    }
}
