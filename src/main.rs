// Headless front end: replays gesture scripts against the editing engine.
// The interactive shell drives the same `Project` API directly.

use std::process::ExitCode;

use clap::Parser;
use minipaint::{cli, log_info, logger};

fn main() -> ExitCode {
    logger::init();
    log_info!("MiniPaint {} (headless)", env!("CARGO_PKG_VERSION"));

    let args = cli::CliArgs::parse();
    cli::run(args)
}
