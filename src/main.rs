//! launchseq - main entry point
//!
//! Runs the pre-flight steps in order and then becomes the application server.

use anyhow::Context;
use tracing::{error, info};

use launchseq::cli::{Cli, Commands};
use launchseq::{
    DryRunRunner, LaunchConfig, LaunchError, ProcessRunner, Sequencer, ServerLaunch, StepRunner,
    hand_off, logging, plan_server, select_mode,
};

fn main() {
    logging::init_tracing();
    let cli = Cli::parse_args();

    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            exit_code_for(&e)
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = LaunchConfig::from_process_env(cli.config.as_deref())
        .context("Failed to load launch configuration")?;

    match cli.command {
        Some(Commands::Plan) => {
            let mode = select_mode(&config);
            let launch = plan_server(mode, &config);
            println!("mode: {}", launch.mode);
            println!("variant: {}", launch.variant);
            println!("command: {}", launch.command);
            Ok(0)
        }
        Some(Commands::Run) | None if cli.dry_run => {
            let launch = prepare(&config, DryRunRunner)?;
            info!("[DRY RUN] Would start: {}", launch.command);
            Ok(0)
        }
        Some(Commands::Run) | None => {
            let launch = prepare(&config, ProcessRunner)?;
            let code = hand_off(&launch, cli.strategy()).context("Failed to start server")?;
            Ok(code)
        }
    }
}

fn prepare<R: StepRunner>(config: &LaunchConfig, runner: R) -> anyhow::Result<ServerLaunch> {
    let mut sequencer = Sequencer::new(config, runner);
    Ok(sequencer.prepare()?.launch)
}

/// Exit status for a failed launch: the first `LaunchError` in the chain
/// decides, anything else is a generic failure.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<LaunchError>())
        .map(LaunchError::exit_code)
        .unwrap_or(1)
}
