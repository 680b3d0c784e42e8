//! Process-wide tracing setup.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable overriding the console filter.
pub const LOG_ENV_VAR: &str = "ESCTL_LOG";

/// HTTP stack internals stay quiet unless asked for through `ESCTL_LOG`.
const QUIET_DEPENDENCIES: &str = "hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn";

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub verbose: u8,
    pub quiet: bool,
    pub debug: bool,
    pub log_file: Option<PathBuf>,
}

impl LogOptions {
    pub fn console_level(&self) -> Level {
        if self.quiet {
            Level::ERROR
        } else if self.debug {
            Level::DEBUG
        } else {
            match self.verbose {
                0 => Level::WARN,
                1 => Level::INFO,
                _ => Level::DEBUG,
            }
        }
    }

    fn console_filter(&self) -> EnvFilter {
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{},{}",
                self.console_level().as_str().to_lowercase(),
                QUIET_DEPENDENCIES
            ))
        })
    }
}

/// Install the global subscriber: stderr at the requested level, plus a
/// debug-level file when `log_file` is set.
pub fn init(options: &LogOptions) -> Result<()> {
    let console = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(options.console_filter());

    let file = match &options.log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_filter(EnvFilter::new(format!("debug,{QUIET_DEPENDENCIES}"))),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .context("logging already initialized")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_level() {
        let level = |verbose, quiet, debug| {
            LogOptions {
                verbose,
                quiet,
                debug,
                log_file: None,
            }
            .console_level()
        };

        assert_eq!(level(0, false, false), Level::WARN);
        assert_eq!(level(1, false, false), Level::INFO);
        assert_eq!(level(2, false, false), Level::DEBUG);
        assert_eq!(level(5, false, false), Level::DEBUG);
        assert_eq!(level(0, true, false), Level::ERROR);
        assert_eq!(level(0, false, true), Level::DEBUG);
    }
}
