//! Behavioural and integration tests for the routing engine and client.

mod support;
