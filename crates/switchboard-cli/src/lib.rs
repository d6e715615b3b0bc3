//! Runtime for the `switchboard` command-line tool.
//!
//! The tool loads configuration, connects to the proxy, and runs exactly one
//! command: `send`, `request`, or `watch`. Output streams and configuration
//! loading are injectable so the runtime can be exercised in tests.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use switchboard::{Client, ClientOptions};
use tracing::info;

mod cli;
mod commands;
mod config;
mod errors;
mod telemetry;

use cli::Cli;
use commands::Action;
use config::{ConfigLoader, OrthoConfigLoader};
use config::split_config_arguments;
pub(crate) use errors::AppError;

const CLI_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::run");

/// Runs the tool with `args`, writing command output to `stdout` and
/// diagnostics to `stderr`.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    let arguments: Vec<OsString> = args.into_iter().collect();
    let split = split_config_arguments(&arguments);
    let cli = match Cli::try_parse_from(&split.command_arguments) {
        Ok(cli) => cli,
        Err(error) if !error.use_stderr() => {
            // Help and version output.
            return match write!(stdout, "{error}") {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::FAILURE,
            };
        }
        Err(error) => return report(stderr, &AppError::CliUsage(error)),
    };

    match execute(cli, &split.config_arguments, stdout, loader) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report(stderr, &error),
    }
}

fn execute<W, L>(
    cli: Cli,
    config_arguments: &[OsString],
    stdout: &mut W,
    loader: &L,
) -> Result<(), AppError>
where
    W: Write,
    L: ConfigLoader,
{
    let action = Action::prepare(cli.command)?;
    let config = loader.load(config_arguments)?;
    telemetry::initialise(&config)?;

    let client = Client::connect(&ClientOptions::from(&config))?;
    info!(
        target: CLI_TARGET,
        proxy = %config.proxy_socket(),
        client_id = %client.client_id(),
        "running command"
    );
    let outcome = action.run(&client, stdout);
    let closed = client.shutdown();
    outcome?;
    closed?;
    Ok(())
}

fn report<E: Write>(stderr: &mut E, error: &AppError) -> ExitCode {
    drop(writeln!(stderr, "switchboard: {error}"));
    ExitCode::FAILURE
}

#[cfg(test)]
mod tests;
