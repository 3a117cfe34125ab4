//! # rctkit Command-Line Entry Point
//!
//! ```bash
//! rctkit analyze --source https://example.org/social_pressure.csv --output results
//! rctkit balance --source data.csv --covariates age,income,sex
//! rctkit missing --config run.json
//! ```
//!
//! Fatal errors (unreachable source, missing columns, an impossible
//! unadjusted comparison) exit non-zero. Artifact write failures are
//! reported but do not change the exit status.

#![warn(clippy::all, rust_2018_idioms)]

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::run_command(cli.command)
}
