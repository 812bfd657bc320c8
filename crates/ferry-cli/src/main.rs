//! CLI entry point - the composition root.
//!
//! Loads `.env`, parses arguments, installs the log subscriber and
//! dispatches to a handler. Handler errors become exit codes here.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ferry_cli::error::exit_code_for;
use ferry_cli::{Cli, Commands, handlers};

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    // Load environment variables before clap reads FERRY_* fallbacks
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.default_log_filter());

    let result = match &cli.command {
        Commands::Upload(args) => handlers::upload::execute(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(exit_code_for(&e));
    }
}
