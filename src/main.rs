//! Health analyst CLI entry point.

use anyhow::Result;
use clap::Parser;

use health_analyst::cli::{self, Cli, Commands};
use health_analyst::infrastructure::logging::LoggerImpl;
use health_analyst::services::ToolCatalog;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        cli::handle_error(&err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli::load_config(cli.config.as_deref())?;
    let _logger = LoggerImpl::init(&config.logging)?;

    match cli.command {
        Commands::Ask(args) => cli::commands::ask::execute(args, config, cli.json).await,
        Commands::Tools => {
            cli::commands::tools::execute(&ToolCatalog::wearable(), cli.json);
            Ok(())
        }
        Commands::Config => {
            cli::commands::config::execute(config, cli.json);
            Ok(())
        }
    }
}
