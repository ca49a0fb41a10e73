use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "farmwatch", version, about = "Farm condition monitoring and alert sweeps")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to config.yaml
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one alert sweep over the farm roster (default)
    Sweep,
    /// Validate config and test datasource connections
    Check,
    /// List loaded crop profiles and extreme-event rules
    Rules,
}
