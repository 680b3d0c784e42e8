//! Cluster command implementation.

use anyhow::{Context, Result};
use clap::{Subcommand, ValueEnum};
use console::style;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::print_listing;
use crate::cli::output::{Properties, get_formatter};
use crate::cli::{ListingArgs, PersistencyArgs};
use crate::client::{ClusterSettings, EsClient, is_nothing_to_explain};
use crate::models::OutputFormat;
use crate::utils::text::{display_value, flatten_json};

const ROUTING_ALLOCATION_ENABLE: &str = "cluster.routing.allocation.enable";

/// Cluster subcommands.
#[derive(Debug, Subcommand)]
pub enum ClusterCommand {
    /// Retrieve the cluster health
    Health {
        #[command(flatten)]
        listing: ListingArgs,
    },

    /// Retrieve the cluster statistics
    Stats {
        #[command(flatten)]
        listing: ListingArgs,
    },

    /// Shard allocation diagnostics
    #[command(subcommand)]
    Allocation(AllocationCommand),

    /// Shard routing settings
    #[command(subcommand)]
    Routing(RoutingCommand),
}

#[derive(Debug, Subcommand)]
pub enum AllocationCommand {
    /// Provide explanations for shard allocations in the cluster
    Explain {
        #[command(flatten)]
        listing: ListingArgs,
    },
}

#[derive(Debug, Subcommand)]
pub enum RoutingCommand {
    /// Shard allocation routing
    #[command(subcommand)]
    Allocation(RoutingAllocationCommand),
}

#[derive(Debug, Subcommand)]
pub enum RoutingAllocationCommand {
    /// Change the routing allocation status
    Enable {
        /// Routing allocation status
        #[arg(value_enum)]
        status: AllocationStatus,

        #[command(flatten)]
        persistency: PersistencyArgs,
    },
}

/// Values accepted by `cluster.routing.allocation.enable`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AllocationStatus {
    All,
    Primaries,
    #[value(name = "new_primaries")]
    NewPrimaries,
    None,
}

impl AllocationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationStatus::All => "all",
            AllocationStatus::Primaries => "primaries",
            AllocationStatus::NewPrimaries => "new_primaries",
            AllocationStatus::None => "none",
        }
    }
}

/// Handle the cluster command.
pub async fn handle_cluster(
    cmd: ClusterCommand,
    client: &EsClient,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        ClusterCommand::Health { listing } => {
            let health = client
                .cluster_health()
                .await
                .context("failed to retrieve cluster health")?;
            print_listing(health_view(&health).into(), &listing, format);
        }
        ClusterCommand::Stats { listing } => {
            let stats = client
                .cluster_stats()
                .await
                .context("failed to retrieve cluster stats")?;
            print_listing(stats_view(&stats).into(), &listing, format);
        }
        ClusterCommand::Allocation(AllocationCommand::Explain { listing }) => {
            let view = match client.allocation_explain().await {
                Ok(explain) => explain_view(&explain),
                Err(err) if is_nothing_to_explain(&err) => {
                    warn!(
                        "Unable to find any unassigned shards to explain. \
                         This may indicate that all shards are allocated."
                    );
                    Properties::new()
                }
                Err(err) => return Err(err).context("failed to explain shard allocation"),
            };
            print_listing(view.into(), &listing, format);
        }
        ClusterCommand::Routing(RoutingCommand::Allocation(
            RoutingAllocationCommand::Enable {
                status,
                persistency,
            },
        )) => {
            let persistency = persistency.persistency();
            info!(
                "Changing cluster routing allocation to: {} ({})",
                status.as_str(),
                persistency
            );
            ClusterSettings::new(client)
                .set(ROUTING_ALLOCATION_ENABLE, Some(status.as_str()), persistency)
                .await
                .context("failed to change cluster routing allocation")?;
            print!(
                "{}",
                get_formatter(format).format_success(&format!(
                    "Cluster routing allocation set to {} ({})",
                    status.as_str(),
                    persistency
                ))
            );
        }
    }
    Ok(())
}

/// Color a cluster health status the way it reads.
pub fn colorize_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "green" => style(status).green().to_string(),
        "yellow" => style(status).yellow().to_string(),
        "red" => style(status).red().to_string(),
        _ => status.to_string(),
    }
}

/// Health attributes sorted by name, with the status colored.
pub fn health_view(health: &Map<String, Value>) -> Properties {
    let mut keys: Vec<&String> = health.keys().collect();
    keys.sort();

    let mut view = Properties::new();
    for key in keys {
        let value = display_value(&health[key]);
        if key == "status" {
            view.push(key.as_str(), colorize_status(&value));
        } else {
            view.push(key.as_str(), value);
        }
    }
    view
}

/// Flattened statistics; plugins collapse to `classname@version` entries.
pub fn stats_view(stats: &Map<String, Value>) -> Properties {
    let mut flat = flatten_json(stats);
    if let Some(Value::Array(plugins)) = flat.get("nodes.plugins") {
        let plugins: Vec<String> = plugins
            .iter()
            .map(|plugin| {
                format!(
                    "{}@{}",
                    plugin.get("classname").map(display_value).unwrap_or_default(),
                    plugin.get("version").map(display_value).unwrap_or_default()
                )
            })
            .collect();
        flat.insert("nodes.plugins".to_string(), Value::String(plugins.join(" ")));
    }
    Properties::from_map(&flat)
}

/// Allocation explanation summary plus the first decider of every node.
pub fn explain_view(explain: &Map<String, Value>) -> Properties {
    let text = |value: Option<&Value>| value.map(display_value).unwrap_or_default();

    let mut view = Properties::new();
    view.push("index", text(explain.get("index")));
    view.push("can_allocate", text(explain.get("can_allocate")));
    view.push("explanation", text(explain.get("allocate_explanation")));

    match explain.get("unassigned_info") {
        Some(unassigned) => {
            view.push(
                "last_allocation_status",
                text(unassigned.get("last_allocation_status")),
            );
            view.push("reason", text(unassigned.get("reason")));
        }
        None => warn!("Allocation explanation has no unassigned_info"),
    }

    let decisions = explain
        .get("node_allocation_decisions")
        .and_then(Value::as_array);
    let Some(decisions) = decisions else {
        warn!("Allocation explanation has no node_allocation_decisions");
        return view;
    };

    for decision in decisions {
        let Some(node) = decision.get("node_name").and_then(Value::as_str) else {
            warn!("Skipping node allocation decision without node_name");
            continue;
        };
        let explanation = decision
            .get("deciders")
            .and_then(Value::as_array)
            .and_then(|deciders| deciders.first())
            .and_then(|decider| decider.get("explanation"));
        match explanation {
            Some(explanation) => view.push(node, display_value(explanation)),
            None => {
                warn!("No decider explanation for node {}", node);
                view.push(node, "");
            }
        }
    }
    view
}
