use anyhow::Result;
use clap::{Parser, Subcommand};
use equalweight::core::log::init_logging;

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

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Prompt for a portfolio value and write the recommended trades (default)
    Trades,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => equalweight::cli::setup::setup(),
        Some(Commands::Trades) | None => {
            let stdin = std::io::stdin();
            equalweight::run(cli.config_path.as_deref(), stdin.lock(), std::io::stdout()).await
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
