use crate::config::LayeredArgs;
use clap::Parser;

pub mod config;
pub mod serve;

pub use config::{PluginArgs, PluginConfig};
pub use serve::serve;

#[derive(Parser, Debug)]
#[command(name = "mayavol")]
#[command(
    version,
    about = "Docker volume plugin for OpenEBS volumes managed by Maya",
    long_about = None
)]
pub struct Cli {
    #[command(flatten)]
    pub args: LayeredArgs<PluginArgs>,
}
