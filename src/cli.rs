//! CLI command definitions.
//!
//! The main entry point is the `Cli` struct which contains subcommands.

use clap::{Args, Parser, Subcommand};

/// Tasks are considered long overdue after this many days past the due date.
pub const OVERDUE_DAYS: i64 = 15;

/// Personal task manager server and admin tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Path to database file (overrides config)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Port for the HTTP server (overrides config)
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server (default if no subcommand given)
    Serve,

    /// List registered tasks across all users
    Tasks(TasksArgs),
}

#[derive(Args, Debug)]
pub struct TasksArgs {
    /// Show only tasks overdue by more than 15 days
    #[arg(long)]
    pub overdue: bool,
}
