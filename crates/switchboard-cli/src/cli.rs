//! Argument definitions for the `switchboard` binary.

use clap::{Parser, Subcommand};

/// Sends messages to, and watches messages from, a JSON message proxy.
///
/// Configuration flags such as `--proxy-socket` must precede the command.
#[derive(Parser, Debug)]
#[command(name = "switchboard", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// The action to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CliCommand {
    /// Sends a JSON object without waiting and prints its correlation token.
    Send {
        /// The message, as a JSON object.
        #[arg(value_name = "JSON")]
        message: String,
    },
    /// Sends a JSON object and prints the proxy's reply.
    Request {
        /// The message, as a JSON object.
        #[arg(value_name = "JSON")]
        message: String,
    },
    /// Prints inbound messages as JSON lines.
    Watch {
        /// Only print messages of this kind; may be repeated.
        #[arg(long = "kind", value_name = "KIND")]
        kinds: Vec<String>,
        /// Stop after this many messages.
        #[arg(long, value_name = "N")]
        count: Option<usize>,
    },
}
