//! Command execution against a connected client.

use std::io::Write;
use std::sync::mpsc;

use switchboard::{Client, Message};
use tracing::debug;

use crate::AppError;
use crate::cli::CliCommand;

const COMMAND_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::commands");

/// A validated command, ready to run once connected.
#[derive(Debug, PartialEq)]
pub(crate) enum Action {
    Send(Message),
    Request(Message),
    Watch {
        kinds: Vec<String>,
        count: Option<usize>,
    },
}

impl Action {
    /// Validates `command` without touching the network.
    pub(crate) fn prepare(command: CliCommand) -> Result<Self, AppError> {
        match command {
            CliCommand::Send { message } => parse_message(&message).map(Self::Send),
            CliCommand::Request { message } => parse_message(&message).map(Self::Request),
            CliCommand::Watch { kinds, count } => Ok(Self::Watch { kinds, count }),
        }
    }

    pub(crate) fn run<W: Write>(self, client: &Client, stdout: &mut W) -> Result<(), AppError> {
        match self {
            Self::Send(message) => {
                let token = client.send(message)?;
                writeln!(stdout, "{token}").map_err(AppError::WriteOutput)
            }
            Self::Request(message) => {
                let reply = client.send_and_wait(message)?;
                write_json_line(stdout, &reply)
            }
            Self::Watch { kinds, count } => watch(client, kinds, count, stdout),
        }
    }
}

fn parse_message(text: &str) -> Result<Message, AppError> {
    Message::from_json_str(text).map_err(AppError::InvalidMessage)
}

fn watch<W: Write>(
    client: &Client,
    kinds: Vec<String>,
    count: Option<usize>,
    stdout: &mut W,
) -> Result<(), AppError> {
    let (tx, rx) = mpsc::channel();
    if kinds.is_empty() {
        client.add_persistent_listener(Vec::new(), move |message| drop(tx.send(message)))?;
    } else {
        client.on_kinds(kinds, move |_, message| drop(tx.send(message)))?;
    }

    let limit = count.unwrap_or(usize::MAX);
    let mut printed = 0_usize;
    for message in rx.iter().take(limit) {
        write_json_line(stdout, &message)?;
        printed += 1;
    }
    debug!(target: COMMAND_TARGET, printed, "watch finished");
    Ok(())
}

fn write_json_line<W: Write>(stdout: &mut W, message: &Message) -> Result<(), AppError> {
    let line = serde_json::to_string(message).map_err(AppError::EncodeOutput)?;
    writeln!(stdout, "{line}").map_err(AppError::WriteOutput)?;
    stdout.flush().map_err(AppError::WriteOutput)
}
