mod cli;
mod commands;
mod config;
mod error;
mod jenkins;
mod logs;
mod monitor;
mod output;
mod queue;
mod stages;
mod stats;
mod tui;

use clap::Parser;
use cli::Cli;
use log::{debug, LevelFilter};

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!(
        "Starting jenkins-cli {} (child: {})",
        env!("CARGO_PKG_VERSION"),
        std::env::var_os(monitor::CHILD_ENV).is_some()
    );

    if let Err(e) = cli.execute().await {
        eprintln!("{} {e:#}", output::bright_red("Error:"));
        std::process::exit(1);
    }
}
