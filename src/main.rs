//! CLI entry point for the photomosaic builder

use clap::Parser;
use photomosaic::MosaicError;
use photomosaic::io::cli::{Cli, MosaicRunner, init_logging};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet);
    let mut runner = MosaicRunner::new(cli);
    match runner.process() {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            report(&error);
            ExitCode::from(error.exit_code())
        }
    }
}

// Allow print for the user-facing failure message
#[allow(clippy::print_stderr)]
fn report(error: &MosaicError) {
    eprintln!("error: {error}");
    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}
