//! autocli-sample: resolves its own configuration with autocli
//!
//! A small program that declares a few arguments, resolves them against the
//! command line, `./sample.conf` and the environment, and prints the result.

use anyhow::Result;
use std::process::ExitCode;

mod cli;

fn main() -> Result<ExitCode> {
    cli::run()
}
