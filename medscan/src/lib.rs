//! Command line front end for `scan-effect`.
//!
//! Loads the TOML config, sets up logging and dispatches the `medscan`
//! subcommands to the handlers in `logic`.

#[macro_use]
extern crate derivative;

pub mod cli;
pub mod config;
mod logic;

use anyhow::Result;
use cli::Cli;

/// Initializes the logger.
///
/// Log lines carry a local timestamp, level, file name and line number.
/// `RUST_LOG` still overrides the level picked here.
pub fn init_logger(verbose: bool) {
    use std::io::Write;

    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::builder()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            let style = buf.default_level_style(record.level());
            let ts = chrono::Local::now().format("%H:%M:%S");

            writeln!(
                buf,
                "[{} {style}{}{style:#} {} {}] {}",
                ts,
                record.level(),
                record
                    .file()
                    .unwrap_or("None")
                    .split('/')
                    .next_back()
                    .unwrap_or("None"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    config::init(cli.config.as_deref())?;
    logic::dispatch(cli.command, &config::all())
}
