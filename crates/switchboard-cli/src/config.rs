//! Configuration loading for the command-line tool.
//!
//! Leading configuration flags are split off the argument list and handed to
//! `ortho_config`; everything from the first other token onwards is the
//! command.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use switchboard_config::Config;

use crate::AppError;

/// CLI flags recognised by the configuration loader.
///
/// Must list every field of [`Config`] as a kebab-case flag, plus
/// `--config-path`.
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--proxy-socket",
    "--log-filter",
    "--log-format",
    "--reply-timeout-ms",
    "--connect-timeout-ms",
    "--unhandled-capacity",
    "--max-frame-bytes",
];

pub(crate) trait ConfigLoader {
    /// Loads configuration from the program name and configuration flags.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    if !text.starts_with("--") {
        return FlagAction::Skip;
    }
    let (flag, inline_value) = text
        .split_once('=')
        .map_or((&*text, false), |(name, _)| (name, true));
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !inline_value,
        }
    } else {
        FlagAction::Skip
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    /// Program name followed by the configuration flags and their values.
    pub(crate) config_arguments: Vec<OsString>,
    /// Program name followed by the command and its arguments.
    pub(crate) command_arguments: Vec<OsString>,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let mut arguments = args.iter();
    let program: Vec<OsString> = arguments.next().cloned().into_iter().collect();
    let mut config_arguments = program.clone();
    let mut rest = arguments.as_slice();

    while let Some((argument, tail)) = rest.split_first() {
        match classify(argument) {
            FlagAction::Include { needs_value } => {
                config_arguments.push(argument.clone());
                rest = tail;
                if needs_value {
                    if let Some((value, after_value)) = rest.split_first() {
                        config_arguments.push(value.clone());
                        rest = after_value;
                    }
                }
            }
            FlagAction::Skip => break,
        }
    }

    let mut command_arguments = program;
    command_arguments.extend(rest.iter().cloned());
    ConfigArgumentSplit {
        config_arguments,
        command_arguments,
    }
}
