//! Command-line entry point for the sample program
//!
//! Everything the library leaves to its caller lives here: installing the
//! log subscriber, deciding the exit code and printing errors.

use anyhow::Result;
use autocli::{Action, Channel, CliRuntime, ConfigValue, DeclareOptions, Nargs, RuntimeOptions};
use serde::Serialize;
use std::collections::BTreeMap;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Looked up in the working directory.
const CONFIG_FILE: &str = "sample.conf";

const EXIT_INVALID: u8 = 2;

#[derive(Serialize)]
struct Report<'a> {
    config: BTreeMap<&'a str, &'a ConfigValue>,
    sources: BTreeMap<&'a str, Channel>,
}

pub fn run() -> Result<ExitCode> {
    // RUST_LOG in the environment always takes precedence; WARN otherwise.
    let filter = EnvFilter::from_default_env().add_directive(Level::WARN.into());
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    let options = RuntimeOptions::new()
        .description("Some CLI app")
        .config_path(std::env::current_dir()?.join(CONFIG_FILE));
    let mut runtime = CliRuntime::new(options);
    declare_arguments(&mut runtime)?;
    runtime.resolve();

    if let Some(help) = runtime.help() {
        print!("{}", help);
        return Ok(ExitCode::SUCCESS);
    }

    let missing = runtime.missing_required();
    if !runtime.errors().is_empty() || !missing.is_empty() {
        for error in runtime.errors() {
            eprintln!("{}", error);
        }
        for key in missing {
            eprintln!("missing required value: {}", key);
        }
        return Ok(ExitCode::from(EXIT_INVALID));
    }

    let config = runtime.config();
    let declared = runtime
        .declarations()
        .iter()
        .filter_map(|d| Some((d.key(), config.get(d.key())?, config.source_of(d.key())?)));

    if config.get_bool("json") == Some(true) {
        let mut report = Report { config: BTreeMap::new(), sources: BTreeMap::new() };
        for (key, value, channel) in declared {
            report.config.insert(key, value);
            report.sources.insert(key, channel);
        }
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for (key, value, channel) in declared {
            println!("{}: {} ({})", key, value, channel);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn declare_arguments(runtime: &mut CliRuntime) -> Result<()> {
    runtime.declare(
        ["-s", "--sample"],
        DeclareOptions::new().dest("sample_var").required(true).help("A required argument"),
    )?;
    runtime.declare(
        ["-o", "--option"],
        DeclareOptions::new().dest("optional_var").help("An optional argument"),
    )?;
    runtime.declare(
        ["-c", "--config"],
        DeclareOptions::new()
            .nargs(Nargs::OneOrMore)
            .config(true)
            .metavar("PATH")
            .help("Config files or directories to load"),
    )?;
    runtime.declare(
        ["--json"],
        DeclareOptions::new().action(Action::StoreTrue).help("Print the configuration as JSON"),
    )?;
    Ok(())
}
