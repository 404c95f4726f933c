use anyhow::Result;
use clap::{Parser, Subcommand};
use nbp_rates::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for nbp_rates::AppCommand {
    fn from(cmd: Commands) -> nbp_rates::AppCommand {
        match cmd {
            Commands::Run => nbp_rates::AppCommand::Run,
            Commands::Fetch => nbp_rates::AppCommand::Fetch,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Refresh rates daily and browse them interactively (default)
    Run,
    /// Fetch and save rates once
    Fetch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Setup => nbp_rates::cli::setup::setup(),
        cmd => nbp_rates::run_command(cmd.into(), cli.config_path.as_deref()).await,
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
