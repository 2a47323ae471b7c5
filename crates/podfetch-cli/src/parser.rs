//! Main CLI parser and top-level argument handling.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface definition for podfetch.
///
/// Global options apply to every subcommand.
#[derive(Parser)]
#[command(name = "podfetch")]
#[command(about = "Drive the podcast download orchestrator from the terminal")]
#[command(version)]
pub struct Cli {
    /// Download settings file (JSON)
    #[arg(long, global = true, env = "PODFETCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use podfetch_core::domain::RetentionPolicy;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_args() {
        let cli = Cli::parse_from(["podfetch", "--verbose", "--config", "/tmp/s.json", "simulate"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/s.json")));
    }

    #[test]
    fn test_simulate_args() {
        let cli = Cli::parse_from([
            "podfetch",
            "simulate",
            "--episodes",
            "4",
            "--fail",
            "demo-2",
            "--fail",
            "demo-3",
            "--policy",
            "keep-latest=2",
        ]);
        let Some(Commands::Simulate {
            episodes,
            fail,
            policy,
            ..
        }) = cli.command
        else {
            panic!("expected simulate");
        };
        assert_eq!(episodes, 4);
        assert_eq!(fail, vec!["demo-2", "demo-3"]);
        assert_eq!(policy, Some(RetentionPolicy::KeepLatest(2)));
    }

    #[test]
    fn test_evict_rejects_bad_policy() {
        let result = Cli::try_parse_from([
            "podfetch",
            "evict",
            "--policy",
            "forever",
            "--episodes",
            "eps.json",
        ]);
        assert!(result.is_err());
    }
}
