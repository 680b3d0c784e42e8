//! CLI module for esctl.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::client::Persistency;
use crate::models::OutputFormat;
use crate::models::config::CONFIG_ENV_VAR;
use crate::utils::logging::LogOptions;

/// Administration client for Elasticsearch clusters.
#[derive(Debug, Parser)]
#[command(name = "esctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = CONFIG_ENV_VAR,
        value_name = "PATH",
        help = "Configuration file (default: ~/.esctlrc)"
    )]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, value_name = "NAME", help = "Context to use")]
    pub context: Option<String>,

    #[arg(
        long = "es-version",
        global = true,
        value_name = "VERSION",
        value_parser = parse_major_version,
        help = "Request responses compatible with this Elasticsearch major version"
    )]
    pub es_version: Option<u8>,

    #[arg(
        long,
        short = 'v',
        global = true,
        action = ArgAction::Count,
        conflicts_with = "quiet",
        help = "Increase verbosity (-v info, -vv debug)"
    )]
    pub verbose: u8,

    #[arg(long, short = 'q', global = true, help = "Only log errors")]
    pub quiet: bool,

    #[arg(long, global = true, value_name = "PATH", help = "Also write debug logs to this file")]
    pub log_file: Option<PathBuf>,

    #[arg(long, global = true, help = "Show debug logs on the console")]
    pub debug: bool,

    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn log_options(&self) -> LogOptions {
        LogOptions {
            verbose: self.verbose,
            quiet: self.quiet,
            debug: self.debug,
            log_file: self.log_file.clone(),
        }
    }
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Cluster health, statistics and routing
    #[command(subcommand)]
    Cluster(commands::ClusterCommand),

    /// Create, open, close, delete and list indices
    #[command(subcommand)]
    Index(commands::IndexCommand),

    /// Read and change logger levels
    #[command(subcommand)]
    Logging(commands::LoggingCommand),

    /// Node listing and diagnostics
    #[command(subcommand)]
    Node(commands::NodeCommand),

    /// Compact cat views
    #[command(subcommand)]
    Cat(commands::CatCommand),

    /// Inspect the local configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

/// Column or row projection for listing commands.
#[derive(Debug, Clone, Default, Args)]
pub struct ListingArgs {
    #[arg(
        long,
        short = 'a',
        value_delimiter = ',',
        value_name = "NAMES",
        help = "Attribute(s) to include, comma separated"
    )]
    pub attribute: Option<Vec<String>>,
}

impl ListingArgs {
    pub fn attributes(&self) -> Option<&[String]> {
        self.attribute.as_deref()
    }
}

/// Where a dynamic setting change is stored.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct PersistencyArgs {
    #[arg(long, conflicts_with = "persistent", help = "Store the setting as transient (default)")]
    pub transient: bool,

    #[arg(long, help = "Store the setting as persistent")]
    pub persistent: bool,
}

impl PersistencyArgs {
    pub fn persistency(&self) -> Persistency {
        if self.persistent {
            Persistency::Persistent
        } else {
            Persistency::Transient
        }
    }
}

/// Accept `7`, `7.17` or `8.11.1` and keep the major version.
pub fn parse_major_version(value: &str) -> Result<u8, String> {
    value
        .trim()
        .split('.')
        .next()
        .and_then(|major| major.parse::<u8>().ok())
        .filter(|major| *major > 0)
        .ok_or_else(|| format!("invalid Elasticsearch version: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_major_version() {
        assert_eq!(parse_major_version("7"), Ok(7));
        assert_eq!(parse_major_version("8.11.1"), Ok(8));
        assert!(parse_major_version("latest").is_err());
        assert!(parse_major_version("0").is_err());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "esctl",
            "cluster",
            "health",
            "--context",
            "prod",
            "-vv",
            "--es-version",
            "7.10",
            "-f",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.context.as_deref(), Some("prod"));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.es_version, Some(7));
        assert_eq!(cli.format, Some(OutputFormat::Json));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["esctl", "-v", "-q", "node", "list"]).is_err());
    }

    #[test]
    fn test_attribute_list() {
        let cli = Cli::try_parse_from(["esctl", "index", "list", "-a", "index,status"]).unwrap();
        match cli.command {
            Commands::Index(commands::IndexCommand::List { listing }) => {
                assert_eq!(
                    listing.attributes(),
                    Some(["index".to_string(), "status".to_string()].as_slice())
                );
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_persistency_flags() {
        let cli = Cli::try_parse_from([
            "esctl",
            "logging",
            "reset",
            "discovery",
            "--persistent",
        ])
        .unwrap();
        match cli.command {
            Commands::Logging(commands::LoggingCommand::Reset { persistency, .. }) => {
                assert_eq!(persistency.persistency(), Persistency::Persistent);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(
            Cli::try_parse_from(["esctl", "logging", "reset", "x", "--transient", "--persistent"])
                .is_err()
        );
    }
}
