use am_core::config::{DEFAULT_CLOSE_CALL_WINDOW_SECS, DEFAULT_TIMESTAMP_LEEWAY_SECS};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "am_cli")]
#[command(about = "Merge message archives without duplicating history")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Copy contacts, conversations and messages missing from the target.
    Merge {
        /// Archive file or profile directory to read from.
        #[arg(long)]
        source: String,
        /// Archive file or profile directory to merge into.
        #[arg(long)]
        target: String,
        /// Classify everything, commit nothing.
        #[arg(long)]
        pretend: bool,
        #[arg(long = "timestamp-leeway", default_value_t = DEFAULT_TIMESTAMP_LEEWAY_SECS)]
        timestamp_leeway: i64,
        #[arg(long = "close-call-window", default_value_t = DEFAULT_CLOSE_CALL_WINDOW_SECS)]
        close_call_window: i64,
        /// Print the audit as JSON instead of the summary.
        #[arg(long)]
        json: bool,
    },
    /// Run the archive sanity checks.
    Check {
        #[arg(long)]
        profile: String,
    },
}
