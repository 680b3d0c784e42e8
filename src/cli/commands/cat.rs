//! Cat command implementation.

use anyhow::{Context, Result};
use clap::Subcommand;
use console::style;
use serde_json::{Map, Value};

use super::print_listing;
use crate::cli::ListingArgs;
use crate::cli::output::{Column, Table};
use crate::client::EsClient;
use crate::models::OutputFormat;
use crate::utils::text::display_value;

const DISK_PERCENT: &str = "disk.percent";

/// Cat subcommands.
#[derive(Debug, Subcommand)]
pub enum CatCommand {
    /// Show how shards are spread across nodes and their disk usage
    Allocation {
        #[command(flatten)]
        listing: ListingArgs,
    },
}

/// Handle the cat command.
pub async fn handle_cat(cmd: CatCommand, client: &EsClient, format: OutputFormat) -> Result<()> {
    match cmd {
        CatCommand::Allocation { listing } => {
            let allocation = client
                .cat_allocation()
                .await
                .context("failed to retrieve shard allocation")?;
            print_listing(allocation_view(&allocation).into(), &listing, format);
        }
    }
    Ok(())
}

/// Disk usage above 90% is red, above 75% yellow.
pub fn colorize_disk_percent(percent: &str) -> String {
    match percent.trim().parse::<f64>() {
        Ok(p) if p > 90.0 => style(percent).red().to_string(),
        Ok(p) if p > 75.0 => style(percent).yellow().to_string(),
        _ => percent.to_string(),
    }
}

pub fn allocation_view(allocation: &[Map<String, Value>]) -> Table {
    let records: Vec<Map<String, Value>> = allocation
        .iter()
        .map(|node| {
            let mut node = node.clone();
            if let Some(percent) = node.get(DISK_PERCENT).map(display_value) {
                node.insert(
                    DISK_PERCENT.to_string(),
                    Value::String(colorize_disk_percent(&percent)),
                );
            }
            node
        })
        .collect();

    Table::from_records(
        vec![
            Column::new("shards"),
            Column::new("disk.indices"),
            Column::new("disk.used"),
            Column::new("disk.avail"),
            Column::new("disk.total"),
            Column::titled(DISK_PERCENT, "Disk %"),
            Column::new("host"),
            Column::titled("ip", "IP"),
            Column::new("node"),
        ],
        &records,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_disk_percent_thresholds() {
        console::set_colors_enabled(true);
        assert_eq!(colorize_disk_percent("95"), style("95").red().to_string());
        assert_eq!(colorize_disk_percent("80"), style("80").yellow().to_string());
        assert_eq!(colorize_disk_percent("75"), "75");
        assert_eq!(colorize_disk_percent(""), "");
    }

    #[test]
    fn test_allocation_view() {
        let allocation: Vec<Map<String, Value>> = serde_json::from_value(json!([
            {"shards": "12", "disk.percent": "40", "host": "10.0.0.1", "ip": "10.0.0.1", "node": "node-1"},
            {"shards": "0", "disk.percent": null, "node": "UNASSIGNED"}
        ]))
        .unwrap();
        let table = allocation_view(&allocation);

        assert_eq!(table.columns[5].header, "Disk %");
        assert_eq!(table.rows[0][5], "40");
        assert_eq!(table.rows[0][8], "node-1");
        assert_eq!(table.rows[1][5], "");
        assert_eq!(table.rows[1][8], "UNASSIGNED");
    }
}
