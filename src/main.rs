use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::debug;

use esctl::cli::commands::{
    handle_cat, handle_cluster, handle_config, handle_index, handle_logging, handle_node,
};
use esctl::cli::output::get_formatter;
use esctl::cli::{Cli, Commands};
use esctl::client::EsClient;
use esctl::error::{EXIT_FAILURE, exit_status};
use esctl::models::{ConfigStore, OutputFormat};
use esctl::transport::Transport;
use esctl::utils::logging;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = cli.format.unwrap_or_default();

    if let Err(err) = logging::init(&cli.log_options()) {
        eprint!("{}", get_formatter(format).format_error(&format!("{err:#}")));
        return ExitCode::from(EXIT_FAILURE);
    }

    match run(cli, format).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", get_formatter(format).format_error(&format!("{err:#}")));
            ExitCode::from(exit_status(&err))
        }
    }
}

async fn run(cli: Cli, format: OutputFormat) -> Result<()> {
    let store = ConfigStore::load(cli.config.as_deref())?;

    let command = match cli.command {
        Commands::Config(cmd) => return handle_config(cmd, &store, format),
        command => command,
    };

    let context = store.resolve_context(store.context_name(cli.context.as_deref()))?;
    let client = EsClient::new(Transport::from_context(&context, cli.es_version)?);
    debug!("Using context '{}'", context.name);

    match command {
        Commands::Cluster(cmd) => handle_cluster(cmd, &client, format).await,
        Commands::Index(cmd) => handle_index(cmd, &client, format).await,
        Commands::Logging(cmd) => handle_logging(cmd, &client, format).await,
        Commands::Node(cmd) => handle_node(cmd, &client, format).await,
        Commands::Cat(cmd) => handle_cat(cmd, &client, format).await,
        Commands::Config(cmd) => handle_config(cmd, &store, format),
    }
}
