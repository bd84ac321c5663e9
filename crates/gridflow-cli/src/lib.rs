pub mod cli;
pub mod config;

pub use cli::{AnalyzeArgs, Cli, Commands, OutputFormat};
pub use config::{load_config, GridflowConfig};
