//! Correlation tokens linking a request to its reply.
//!
//! Tokens are 40 characters drawn from `[A-Za-z0-9]` by the thread-local
//! generator. With 62^40 possible values a collision between requests that
//! are outstanding at the same time is not a practical concern, but the
//! guarantee is probabilistic: tokens are not suitable as secrets.

use std::fmt;

use rand::Rng;
use rand::distr::Alphanumeric;

/// Number of characters in a generated token.
pub const TOKEN_LENGTH: usize = 40;

/// Opaque value sent as `@extra` and echoed back by the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationToken(String);

impl CorrelationToken {
    /// Generates a fresh random token.
    #[must_use]
    pub fn generate() -> Self {
        let token = rand::rng()
            .sample_iter(Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();
        Self(token)
    }

    /// Wraps an existing token, e.g. one read back from a message.
    #[must_use]
    pub fn from_string(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationToken {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
