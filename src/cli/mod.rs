//! CLI interface for sgw-sniper
//!
//! Provides subcommands for:
//! - `run`: start the bid sniper daemon
//! - `schedule`: favorite an item with a max-bid note
//! - `query`: run saved searches and alert on new results
//! - `config`: show the effective configuration

mod query;
mod run;
mod schedule;

pub use query::QueryArgs;
pub use run::RunArgs;
pub use schedule::ScheduleArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sgw-sniper")]
#[command(about = "Auction bid sniper and alerting daemon for ShopGoodwill")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the bid sniper daemon
    Run(RunArgs),
    /// Favorite an item and attach a max-bid note
    Schedule(ScheduleArgs),
    /// Run saved searches and alert on new results
    Query(QueryArgs),
    /// Show the effective configuration
    Config,
}
