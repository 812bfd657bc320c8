//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for the ferry upload engine.
#[derive(Parser, Debug)]
#[command(name = "ferry")]
#[command(about = "Upload files through a bounded pool of workers")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Default log filter when `RUST_LOG` is not set.
    pub const fn default_log_filter(&self) -> &'static str {
        if self.verbose { "debug" } else { "warn" }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parser_builds() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_verbose() {
        let cli = Cli::parse_from(["ferry", "upload", "--simulate", "a.jpg", "-v"]);
        assert!(cli.verbose);
        assert_eq!(cli.default_log_filter(), "debug");

        let cli = Cli::parse_from(["ferry", "upload", "--simulate", "a.jpg"]);
        assert_eq!(cli.default_log_filter(), "warn");
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["ferry"]).is_err());
    }
}
