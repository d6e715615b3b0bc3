//! Entry point for the `switchboard` command-line tool.
//!
//! Delegates to [`switchboard_cli::run`], which loads configuration, connects
//! to the proxy, and runs one command.

use std::io::{self, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr = io::stderr();
    switchboard_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}
