//! Command-line interface for the health analyst.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::domain::models::Config;
use crate::domain::RunError;
use crate::infrastructure::config::ConfigLoader;

#[derive(Parser, Debug)]
#[command(
    name = "health-analyst",
    version,
    about = "Answer questions about wearable health data with a bounded analysis loop"
)]
pub struct Cli {
    /// Emit machine-readable JSON instead of human output
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to health-analyst.yaml in the working directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one analysis and print the report
    Ask(commands::ask::AskArgs),
    /// List the data-retrieval tools the analyst can call
    Tools,
    /// Print the effective configuration
    Config,
}

/// Load configuration from `path`, or through the default hierarchy.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}

/// Report a command failure and exit with a non-zero status.
pub fn handle_error(err: &anyhow::Error, json_mode: bool) -> ! {
    let run_error = err.downcast_ref::<RunError>();
    if json_mode {
        let body = serde_json::json!({
            "error": format!("{err:#}"),
            "category": run_error.map(RunError::category),
        });
        println!("{}", serde_json::to_string_pretty(&body).unwrap_or_default());
    } else {
        eprintln!("{} {err:#}", console::style("Error:").red().bold());
    }

    let code = match run_error {
        Some(RunError::Cancelled { .. }) => 130,
        Some(_) => 2,
        None => 1,
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ask_with_period() {
        let cli = Cli::try_parse_from([
            "health-analyst",
            "--json",
            "ask",
            "How did I sleep last week?",
            "--subject",
            "42",
            "--period",
            "last week",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Ask(args) => {
                assert_eq!(args.subject, 42);
                assert_eq!(args.period.as_deref(), Some("last week"));
                assert_eq!(args.timezone, "UTC");
            }
            other => panic!("expected ask, got {other:?}"),
        }
    }

    #[test]
    fn test_date_flags_conflict() {
        let result = Cli::try_parse_from([
            "health-analyst",
            "ask",
            "q",
            "--subject",
            "1",
            "--date",
            "yesterday",
            "--period",
            "last week",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_requires_to() {
        let result = Cli::try_parse_from(["health-analyst", "ask", "q", "--subject", "1", "--from", "2025-04-01"]);
        assert!(result.is_err());
    }
}
