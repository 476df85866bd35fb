//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Singer tap for the Pulumi Cloud API
#[derive(Parser, Debug)]
#[command(name = "tap-pulumi-cloud")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (JSON, or YAML by extension)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// State file (JSON); read at start and written back after `read`
    #[arg(short, long, global = true)]
    pub state: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the available streams
    Discover,

    /// Extract records from streams
    Read {
        /// Streams to sync (comma-separated, empty = all)
        #[arg(long)]
        streams: Option<String>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

/// Split a `--streams` value into names
pub fn parse_stream_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_read_with_streams() {
        let cli = Cli::parse_from([
            "tap-pulumi-cloud",
            "--config",
            "config.json",
            "read",
            "--streams",
            "stacks,audit_logs",
            "--state",
            "state.json",
        ]);

        assert_eq!(cli.config, Some(PathBuf::from("config.json")));
        assert_eq!(cli.state, Some(PathBuf::from("state.json")));
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Read { streams } => assert_eq!(streams.as_deref(), Some("stacks,audit_logs")),
            Commands::Discover => panic!("expected read"),
        }
    }

    #[test]
    fn test_parse_discover_verbose() {
        let cli = Cli::parse_from(["tap-pulumi-cloud", "discover", "-v", "-c", "c.yaml"]);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Discover));
    }

    #[test]
    fn test_parse_stream_list() {
        assert_eq!(
            parse_stream_list(" stacks, ,audit_logs,"),
            vec!["stacks".to_string(), "audit_logs".to_string()]
        );
        assert!(parse_stream_list("").is_empty());
    }
}
