//! Command-line interface for thread search.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::logging::LogLevel;
use crate::models::OutputFormat;

/// Rebuild post threads, embed them, and search them semantically.
#[derive(Debug, Parser)]
#[command(name = "tsearch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        help = "Log level: error, warn, info, debug, or trace (overrides --verbose)"
    )]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Rebuild threads from a posts file and print totals
    Threads(commands::ThreadsArgs),

    /// Embed new threads and store them, resuming from the checkpoint
    Ingest(commands::IngestArgs),

    /// Search stored threads
    Search(commands::SearchArgs),

    /// Look up stored threads by exact text (local index only)
    FindText(commands::FindTextArgs),

    /// Remove stored threads by id
    Delete(commands::DeleteArgs),

    /// Check embedding and vector store status
    Status,

    /// Run the HTTP proxy
    Serve(commands::ServeArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_ingest_flags() {
        let cli = Cli::parse_from([
            "tsearch", "ingest", "posts.json", "--batch-size", "10", "--from", "40", "--reset",
        ]);
        match cli.command {
            Commands::Ingest(args) => {
                assert_eq!(args.batch_size, Some(10));
                assert_eq!(args.from, Some(40));
                assert!(args.reset);
                assert!(!args.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_format() {
        let cli = Cli::parse_from(["tsearch", "search", "rust", "-n", "5", "--format", "json"]);
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(matches!(cli.command, Commands::Search(ref a) if a.limit == Some(5)));
    }

    #[test]
    fn test_config_init_force_is_long_only() {
        let cli = Cli::parse_from(["tsearch", "config", "init", "--force", "-f", "json"]);
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(matches!(
            cli.command,
            Commands::Config(commands::ConfigCommand::Init { force: true })
        ));
    }

    #[test]
    fn test_parse_log_level() {
        let cli = Cli::parse_from(["tsearch", "--log-level", "trace", "status"]);
        assert_eq!(cli.log_level, Some(LogLevel::Trace));
        assert!(Cli::try_parse_from(["tsearch", "--log-level", "loud", "status"]).is_err());
    }

    #[test]
    fn test_parse_find_text_name() {
        let cli = Cli::parse_from(["tsearch", "find-text", "exact words"]);
        assert!(matches!(cli.command, Commands::FindText(ref a) if a.text == "exact words"));
    }
}
