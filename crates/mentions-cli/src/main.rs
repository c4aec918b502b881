mod commands;

use clap::{Parser, Subcommand};
use mentions_core::{AppConfig, ConfigError};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mentions-cli")]
#[command(about = "Brand mention aggregation command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one aggregation cycle and print its summaries
    Run {
        /// Keep mentions in memory instead of sending them downstream
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the fetch targets and subscribers for the configured brands
    Targets,
    /// Evaluate the matcher for one brand against a piece of text
    Match {
        /// Brand or competitor name (case-insensitive)
        #[arg(long)]
        brand: String,

        /// Text to match
        text: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    execute(cli, mentions_core::load_app_config).await
}

/// Run the parsed command. Configuration is only loaded for subcommands.
async fn execute(
    cli: Cli,
    load_config: impl FnOnce() -> Result<AppConfig, ConfigError>,
) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        println!("mentions-cli ready; see --help for commands");
        return Ok(());
    };

    let config = load_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match command {
        Commands::Run { dry_run } => commands::run_cycle(&config, dry_run).await,
        Commands::Targets => commands::print_targets(&config),
        Commands::Match { brand, text } => commands::match_text(&config, &brand, &text),
    }
}
