mod cli;
mod commands {
    pub mod check;
    pub mod merge;
}

use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_logging();

    let cli = Cli::parse();
    let result = match cli.cmd {
        Command::Merge {
            source,
            target,
            pretend,
            timestamp_leeway,
            close_call_window,
            json,
        } => commands::merge::run_merge(
            &source,
            &target,
            commands::merge::MergeArgs {
                pretend,
                timestamp_leeway,
                close_call_window,
                json,
            },
        ),
        Command::Check { profile } => commands::check::run_check(&profile),
    };

    if let Err(err) = result {
        eprintln!("{}: {}", err.code, err.message);
        std::process::exit(1);
    }
}
