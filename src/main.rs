use std::process::ExitCode;

use clap::Parser;
use log::LevelFilter;

use stock_watch::app::{commands, AppState};
use stock_watch::cli::Cli;
use stock_watch::config::load_settings;
use stock_watch::Result;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = load_settings(&cli.config)?;
    if let Some(path) = cli.data_file {
        settings.data_file = path;
    }
    if let Some(path) = cli.cache_file {
        settings.cache_file = path;
    }

    let mut state = AppState::open(settings)?;
    commands::run(&mut state, cli.command)
}

/// `RUST_LOG` wins when set; otherwise `-v` raises the default `warn` level.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}
