//! CLI argument parsing.

use clap::{Parser, Subcommand};

/// Telegram relay bot: download, cache, re-upload.
#[derive(Parser, Debug)]
#[command(name = "dorarelay", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the bot and this process's worker (default)
    Run,
    /// Print the current Prometheus metrics and exit
    Stats,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_run() {
        let cli = Cli::parse_from(["dorarelay"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_stats_subcommand_parses() {
        let cli = Cli::parse_from(["dorarelay", "stats"]);
        assert!(matches!(cli.command, Some(Commands::Stats)));
    }
}
