//! Index command implementation.

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::{Map, Value};
use tracing::info;

use super::print_listing;
use crate::cli::ListingArgs;
use crate::cli::output::{Column, Table, get_formatter};
use crate::client::EsClient;
use crate::models::OutputFormat;

/// Index subcommands.
#[derive(Debug, Subcommand)]
pub enum IndexCommand {
    /// Create an index
    Create {
        /// Index to create
        index: String,

        /// Number of primary shards
        #[arg(long)]
        shards: Option<u32>,

        /// Number of replicas per primary shard
        #[arg(long)]
        replicas: Option<u32>,
    },

    /// Open an index
    Open {
        /// Index to open
        index: String,
    },

    /// Close an index
    Close {
        /// Index to close
        index: String,
    },

    /// Delete an index
    Delete {
        /// Index to delete
        index: String,
    },

    /// List all indices
    List {
        #[command(flatten)]
        listing: ListingArgs,
    },
}

/// Handle the index command.
pub async fn handle_index(cmd: IndexCommand, client: &EsClient, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        IndexCommand::Create {
            index,
            shards,
            replicas,
        } => {
            info!(
                "Creating index {} with {} shards and {} replicas",
                index,
                shards.map_or_else(|| "default".to_string(), |n| n.to_string()),
                replicas.map_or_else(|| "default".to_string(), |n| n.to_string())
            );
            client
                .create_index(&index, shards, replicas)
                .await
                .with_context(|| format!("failed to create index {index}"))?;
            print!("{}", formatter.format_success(&format!("Index {index} created")));
        }
        IndexCommand::Open { index } => {
            info!("Opening index {}", index);
            client
                .open_index(&index)
                .await
                .with_context(|| format!("failed to open index {index}"))?;
            print!("{}", formatter.format_success(&format!("Index {index} opened")));
        }
        IndexCommand::Close { index } => {
            info!("Closing index {}", index);
            client
                .close_index(&index)
                .await
                .with_context(|| format!("failed to close index {index}"))?;
            print!("{}", formatter.format_success(&format!("Index {index} closed")));
        }
        IndexCommand::Delete { index } => {
            info!("Deleting index {}", index);
            client
                .delete_index(&index)
                .await
                .with_context(|| format!("failed to delete index {index}"))?;
            print!("{}", formatter.format_success(&format!("Index {index} deleted")));
        }
        IndexCommand::List { listing } => {
            let indices = client.cat_indices().await.context("failed to list indices")?;
            print_listing(indices_view(&indices).into(), &listing, format);
        }
    }
    Ok(())
}

pub fn indices_columns() -> Vec<Column> {
    vec![
        Column::new("index"),
        Column::new("health"),
        Column::new("status"),
        Column::titled("uuid", "UUID"),
        Column::titled("pri", "Primary"),
        Column::titled("rep", "Replica"),
        Column::new("docs.count"),
        Column::new("docs.deleted"),
        Column::new("store.size"),
        Column::titled("pri.store.size", "Primary Store Size"),
    ]
}

pub fn indices_view(indices: &[Map<String, Value>]) -> Table {
    Table::from_records(indices_columns(), indices)
}
