//! Node command implementation.

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use serde_json::{Map, Value};

use super::print_listing;
use crate::cli::ListingArgs;
use crate::cli::output::{Column, Table};
use crate::client::EsClient;
use crate::models::OutputFormat;

/// Node subcommands.
#[derive(Debug, Subcommand)]
pub enum NodeCommand {
    /// List nodes
    List {
        #[command(flatten)]
        listing: ListingArgs,
    },

    /// Print hot threads on each node
    HotThreads {
        /// Type of threads to sample
        #[arg(value_enum, default_value_t = HotThreadsType::Cpu)]
        thread_type: HotThreadsType,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum HotThreadsType {
    #[default]
    Cpu,
    Wait,
    Block,
}

impl HotThreadsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HotThreadsType::Cpu => "cpu",
            HotThreadsType::Wait => "wait",
            HotThreadsType::Block => "block",
        }
    }
}

/// Handle the node command.
pub async fn handle_node(cmd: NodeCommand, client: &EsClient, format: OutputFormat) -> Result<()> {
    match cmd {
        NodeCommand::List { listing } => {
            let nodes = client.cat_nodes().await.context("failed to list nodes")?;
            print_listing(nodes_view(&nodes).into(), &listing, format);
        }
        NodeCommand::HotThreads { thread_type } => {
            let report = client
                .hot_threads(thread_type.as_str())
                .await
                .context("failed to retrieve hot threads")?;
            println!("{}", report.trim_end());
        }
    }
    Ok(())
}

pub fn nodes_view(nodes: &[Map<String, Value>]) -> Table {
    Table::from_records(
        vec![
            Column::titled("ip", "IP"),
            Column::titled("heap.percent", "Heap %"),
            Column::titled("ram.percent", "RAM %"),
            Column::new("cpu"),
            Column::new("load_1m"),
            Column::new("load_5m"),
            Column::new("load_15m"),
            Column::titled("node.role", "Role"),
            Column::new("master"),
            Column::new("name"),
        ],
        nodes,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use serde_json::json;

    use crate::cli::{Cli, Commands};

    #[test]
    fn test_nodes_view() {
        let nodes: Vec<Map<String, Value>> = serde_json::from_value(json!([{
            "ip": "10.0.0.1",
            "heap.percent": "42",
            "ram.percent": "90",
            "cpu": "3",
            "load_1m": "0.10",
            "load_5m": "0.20",
            "load_15m": "0.30",
            "node.role": "dim",
            "master": "*",
            "name": "node-1"
        }]))
        .unwrap();
        let table = nodes_view(&nodes);

        assert_eq!(table.columns[4].header, "Load 1M");
        assert_eq!(table.columns[7].header, "Role");
        assert_eq!(
            table.rows[0],
            vec!["10.0.0.1", "42", "90", "3", "0.10", "0.20", "0.30", "dim", "*", "node-1"]
        );
    }

    #[test]
    fn test_hot_threads_default_type() {
        let cli = Cli::try_parse_from(["esctl", "node", "hot-threads"]).unwrap();
        match cli.command {
            Commands::Node(NodeCommand::HotThreads { thread_type }) => {
                assert_eq!(thread_type, HotThreadsType::Cpu);
            }
            other => panic!("unexpected command: {other:?}"),
        }

        assert!(Cli::try_parse_from(["esctl", "node", "hot-threads", "gpu"]).is_err());
    }
}
