//! Scenario state shared by the CLI step definitions.

use std::ffi::OsString;
use std::net::TcpListener;
use std::process::ExitCode;

use anyhow::{Context, Result};
use switchboard::Message;
use switchboard_config::{Config, SocketEndpoint};

use super::{FakeProxy, ProxyScript};
use crate::AppError;
use crate::config::ConfigLoader;

pub(crate) const CLIENT_ID: u32 = 5;

struct StaticConfigLoader {
    config: Config,
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

#[derive(Default)]
pub(crate) struct TestWorld {
    pub(crate) config: Config,
    pub(crate) proxy: Option<FakeProxy>,
    pub(crate) stdout: Vec<u8>,
    pub(crate) stderr: Vec<u8>,
    pub(crate) exit_code: Option<ExitCode>,
}

impl TestWorld {
    pub(crate) fn start_proxy(&mut self, script: ProxyScript) -> Result<()> {
        let proxy = FakeProxy::spawn(CLIENT_ID, script)?;
        self.config.proxy_socket = proxy.endpoint();
        self.proxy = Some(proxy);
        Ok(())
    }

    /// Points the configuration at a port nothing listens on.
    pub(crate) fn point_at_closed_port(&mut self) -> Result<()> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind a throwaway listener")?;
        let port = listener.local_addr().context("throwaway listener address")?.port();
        drop(listener);
        self.config.proxy_socket = SocketEndpoint::tcp("127.0.0.1", port);
        Ok(())
    }

    pub(crate) fn run(&mut self, command: &str) {
        self.stdout.clear();
        self.stderr.clear();
        let loader = StaticConfigLoader {
            config: self.config.clone(),
        };
        let exit = crate::run_with_loader(
            Self::build_args(command),
            &mut self.stdout,
            &mut self.stderr,
            &loader,
        );
        self.exit_code = Some(exit);
    }

    /// Splits on whitespace only, so JSON arguments keep their quotes.
    fn build_args(command: &str) -> Vec<OsString> {
        std::iter::once(OsString::from("switchboard"))
            .chain(command.split_whitespace().map(OsString::from))
            .collect()
    }

    pub(crate) fn stdout_text(&self) -> String {
        String::from_utf8(self.stdout.clone()).expect("stdout utf8")
    }

    pub(crate) fn stderr_text(&self) -> String {
        String::from_utf8(self.stderr.clone()).expect("stderr utf8")
    }

    /// Parses each stdout line as a message.
    pub(crate) fn printed_messages(&self) -> Vec<Message> {
        self.stdout_text()
            .lines()
            .map(|line| Message::from_json_str(line).expect("stdout line is a message"))
            .collect()
    }

    pub(crate) fn proxy(&self) -> &FakeProxy {
        self.proxy.as_ref().expect("fake proxy started")
    }
}
