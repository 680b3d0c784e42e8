//! Logging command implementation.

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use tracing::{debug, info};

use super::print_listing;
use crate::cli::output::{Properties, get_formatter};
use crate::cli::{ListingArgs, PersistencyArgs};
use crate::client::{ClusterSettings, EsClient};
use crate::models::OutputFormat;
use crate::utils::text::ensure_prefix;

const LOGGER_PREFIX: &str = "logger";

/// Logging subcommands.
#[derive(Debug, Subcommand)]
pub enum LoggingCommand {
    /// Get a logger value
    Get {
        /// Logger to read
        logger: String,

        #[command(flatten)]
        persistency: PersistencyArgs,
    },

    /// Set a logger value
    Set {
        /// Logger to set
        logger: String,

        /// Log level
        #[arg(value_enum, ignore_case = true)]
        level: LogLevel,

        #[command(flatten)]
        persistency: PersistencyArgs,
    },

    /// Reset a logger to its default value
    Reset {
        /// Logger to reset
        logger: String,

        #[command(flatten)]
        persistency: PersistencyArgs,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

/// Full setting name for a logger.
pub fn logger_setting(logger: &str) -> String {
    ensure_prefix(logger, LOGGER_PREFIX)
}

/// Handle the logging command.
pub async fn handle_logging(
    cmd: LoggingCommand,
    client: &EsClient,
    format: OutputFormat,
) -> Result<()> {
    let settings = ClusterSettings::new(client);
    let formatter = get_formatter(format);

    match cmd {
        LoggingCommand::Get {
            logger,
            persistency,
        } => {
            let persistency = persistency.persistency();
            let logger = logger_setting(&logger);
            debug!("Persistency is {}", persistency);

            let level = settings
                .get(&logger, persistency)
                .await
                .with_context(|| format!("failed to read logger {logger}"))?
                .unwrap_or_default();

            let mut view = Properties::new();
            view.push(logger, level);
            print_listing(view.into(), &ListingArgs::default(), format);
        }
        LoggingCommand::Set {
            logger,
            level,
            persistency,
        } => {
            let persistency = persistency.persistency();
            let logger = logger_setting(&logger);
            info!("Changing logger {} to {} ({})", logger, level.as_str(), persistency);

            settings
                .set(&logger, Some(level.as_str()), persistency)
                .await
                .with_context(|| format!("failed to set logger {logger}"))?;
            print!(
                "{}",
                formatter.format_success(&format!("Logger {logger} set to {}", level.as_str()))
            );
        }
        LoggingCommand::Reset {
            logger,
            persistency,
        } => {
            let persistency = persistency.persistency();
            let logger = logger_setting(&logger);
            info!("Resetting logger {} ({})", logger, persistency);

            settings
                .set(&logger, None, persistency)
                .await
                .with_context(|| format!("failed to reset logger {logger}"))?;
            print!("{}", formatter.format_success(&format!("Logger {logger} reset")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    use crate::cli::{Cli, Commands};

    #[test]
    fn test_logger_setting() {
        assert_eq!(
            logger_setting("org.elasticsearch.transport"),
            "logger.org.elasticsearch.transport"
        );
        assert_eq!(logger_setting("logger._root"), "logger._root");
    }

    #[test]
    fn test_set_level_parsing() {
        let cli = Cli::try_parse_from(["esctl", "logging", "set", "discovery", "DEBUG"]).unwrap();
        match cli.command {
            Commands::Logging(LoggingCommand::Set { level, .. }) => {
                assert_eq!(level, LogLevel::Debug);
                assert_eq!(level.as_str(), "DEBUG");
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["esctl", "logging", "set", "discovery", "LOUD"]).is_err());
    }
}
