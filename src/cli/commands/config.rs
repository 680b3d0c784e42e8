//! Config command implementation.

use anyhow::Result;
use clap::Subcommand;

use super::print_listing;
use crate::cli::ListingArgs;
use crate::cli::output::{Column, Table};
use crate::models::OutputFormat;
use crate::models::config::ConfigStore;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Manage contexts
    #[command(subcommand)]
    Context(ContextCommand),
}

#[derive(Debug, Subcommand)]
pub enum ContextCommand {
    /// List all contexts
    List {
        #[command(flatten)]
        listing: ListingArgs,
    },
}

/// Handle the config command. Never contacts the cluster.
pub fn handle_config(cmd: ConfigCommand, store: &ConfigStore, format: OutputFormat) -> Result<()> {
    match cmd {
        ConfigCommand::Context(ContextCommand::List { listing }) => {
            print_listing(contexts_view(store).into(), &listing, format);
        }
    }
    Ok(())
}

pub fn contexts_view(store: &ConfigStore) -> Table {
    let mut table = Table::new(vec![
        Column::new("name"),
        Column::new("user"),
        Column::new("cluster"),
    ]);
    for (name, context) in store.contexts() {
        table.push_row(vec![
            name.clone(),
            context.user.clone().unwrap_or_default(),
            context.cluster.clone(),
        ]);
    }
    table
}
