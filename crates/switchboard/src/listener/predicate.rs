//! Message predicates combined by listeners with logical AND.

use std::fmt;

use crate::message::{ClientId, Message};
use crate::token::CorrelationToken;

/// A test applied to an inbound message.
pub struct Predicate {
    description: &'static str,
    test: Box<dyn Fn(&Message) -> bool + Send>,
}

impl Predicate {
    /// Wraps an arbitrary test.
    #[must_use]
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + 'static,
    {
        Self::described("custom", test)
    }

    fn described<F>(description: &'static str, test: F) -> Self
    where
        F: Fn(&Message) -> bool + Send + 'static,
    {
        Self {
            description,
            test: Box::new(test),
        }
    }

    /// Holds when the message's `@client_id` equals `client_id`.
    #[must_use]
    pub fn client_id(client_id: ClientId) -> Self {
        Self::described("client_id", move |message| {
            message.client_id() == Some(client_id)
        })
    }

    /// Holds when the message's `@extra` equals `token`.
    #[must_use]
    pub fn extra(token: &CorrelationToken) -> Self {
        let expected = token.as_str().to_owned();
        Self::described("extra", move |message| {
            message.extra() == Some(expected.as_str())
        })
    }

    /// Holds when the message's `@type` is one of `kinds`.
    #[must_use]
    pub fn of_kinds<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let accepted: Vec<String> = kinds.into_iter().map(Into::into).collect();
        Self::described("of_kinds", move |message| {
            message
                .message_kind()
                .is_some_and(|kind| accepted.iter().any(|candidate| candidate == kind))
        })
    }

    /// Applies the predicate to `message`.
    #[must_use]
    pub fn test(&self, message: &Message) -> bool {
        (self.test)(message)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Predicate")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Whether every predicate holds, stopping at the first failure.
pub(super) fn all_hold(predicates: &[Predicate], message: &Message) -> bool {
    predicates.iter().all(|predicate| predicate.test(message))
}
