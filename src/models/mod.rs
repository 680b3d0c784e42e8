pub mod config;
pub mod context;
mod format;

pub use config::{ConfigDocument, ConfigStore};
pub use context::{Cluster, Context, Settings, User};
pub use format::OutputFormat;
