//! CLI entry point - the composition root.
//!
//! Installs logging, loads settings and dispatches to the command handlers.
//! Logs go to stderr so JSON output on stdout stays machine readable.

use std::time::Duration;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use podfetch_cli::handlers::{evict, simulate};
use podfetch_cli::{Cli, CliConfig, CliError, Commands};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Simulate {
            episodes,
            fail,
            policy,
            retry_delay,
            step_ms,
        } => {
            let config = CliConfig::load(cli.config.as_deref())?;
            let args = simulate::SimulateArgs {
                episodes,
                fail,
                policy,
                retry_delay_secs: retry_delay,
                step_interval: Duration::from_millis(step_ms),
            };
            simulate::execute(config, args).await?;
        }
        Commands::Evict {
            policy,
            episodes,
            now,
        } => {
            evict::execute(&episodes, policy, now)?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        let code = e.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        std::process::exit(code);
    }
}
