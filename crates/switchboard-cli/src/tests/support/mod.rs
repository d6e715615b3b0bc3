//! Shared harness for CLI behaviour tests.

mod fake_proxy;
mod world;

pub(crate) use fake_proxy::{FakeProxy, ProxyScript};
pub(crate) use world::{CLIENT_ID, TestWorld};
