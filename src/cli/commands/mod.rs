mod cat;
mod cluster;
mod config;
mod index;
mod logging;
mod node;

pub use cat::CatCommand;
pub use cluster::{
    AllocationCommand, AllocationStatus, ClusterCommand, RoutingAllocationCommand, RoutingCommand,
};
pub use config::{ConfigCommand, ContextCommand};
pub use index::IndexCommand;
pub use logging::{LogLevel, LoggingCommand};
pub use node::{HotThreadsType, NodeCommand};

pub use cat::handle_cat;
pub use cluster::handle_cluster;
pub use config::handle_config;
pub use index::handle_index;
pub use logging::handle_logging;
pub use node::handle_node;

use crate::cli::ListingArgs;
use crate::cli::output::{Listing, get_formatter};
use crate::models::OutputFormat;

/// Apply `--attribute` projection and print the listing.
fn print_listing(listing: Listing, args: &ListingArgs, format: OutputFormat) {
    let listing = listing.project(args.attributes());
    print!("{}", get_formatter(format).format_listing(&listing));
}
