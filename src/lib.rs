pub mod cli;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;
pub mod utils;

pub use cli::{Cli, Commands};
pub use client::EsClient;
pub use models::{Context, OutputFormat};
pub use transport::Transport;
