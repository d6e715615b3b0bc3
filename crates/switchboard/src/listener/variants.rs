//! Standard listener shapes.

use std::sync::Arc;

use super::execution::spawn_handler;
use super::predicate::{Predicate, all_hold};
use super::{KindHandler, Listener, MessageHandler, OnceHandler, Verdict};
use crate::message::{ClientId, Message};
use crate::token::CorrelationToken;

/// Listener retired after its first match.
pub struct OnceListener {
    predicates: Vec<Predicate>,
    handler: Option<OnceHandler>,
}

impl OnceListener {
    /// Builds a once listener over an arbitrary predicate set.
    #[must_use]
    pub fn new<F>(predicates: Vec<Predicate>, handler: F) -> Self
    where
        F: FnOnce(Arc<Message>) + Send + 'static,
    {
        Self {
            predicates,
            handler: Some(Box::new(handler)),
        }
    }

    /// Matches the reply carrying `token` for session `client_id`.
    #[must_use]
    pub fn correlated<F>(client_id: ClientId, token: &CorrelationToken, handler: F) -> Self
    where
        F: FnOnce(Arc<Message>) + Send + 'static,
    {
        Self::new(
            vec![Predicate::client_id(client_id), Predicate::extra(token)],
            handler,
        )
    }
}

impl Listener for OnceListener {
    fn process(&mut self, message: &Arc<Message>) -> Verdict {
        if !all_hold(&self.predicates, message) {
            return Verdict::Continue;
        }
        if let Some(handler) = self.handler.take() {
            let owned = Arc::clone(message);
            spawn_handler(self.label(), move || handler(owned));
        }
        Verdict::StopRemove
    }

    fn label(&self) -> &'static str {
        "once"
    }
}

/// Listener that stays registered and fires on every match.
pub struct PersistentListener {
    predicates: Vec<Predicate>,
    handler: MessageHandler,
}

impl PersistentListener {
    /// Builds a persistent listener over an arbitrary predicate set.
    #[must_use]
    pub fn new<F>(predicates: Vec<Predicate>, handler: F) -> Self
    where
        F: Fn(Arc<Message>) + Send + Sync + 'static,
    {
        Self {
            predicates,
            handler: Arc::new(handler),
        }
    }
}

impl Listener for PersistentListener {
    fn process(&mut self, message: &Arc<Message>) -> Verdict {
        if !all_hold(&self.predicates, message) {
            return Verdict::Continue;
        }
        let handler = Arc::clone(&self.handler);
        let owned = Arc::clone(message);
        spawn_handler(self.label(), move || handler(owned));
        Verdict::StopKeep
    }

    fn label(&self) -> &'static str {
        "persistent"
    }
}

/// Persistent listener for a set of message kinds on one session.
///
/// The handler receives the matched `@type` alongside the message.
pub struct KindListener {
    predicates: Vec<Predicate>,
    handler: KindHandler,
}

impl KindListener {
    /// Matches messages for `client_id` whose `@type` is one of `kinds`.
    #[must_use]
    pub fn new<I, S, F>(client_id: ClientId, kinds: I, handler: F) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, Arc<Message>) + Send + Sync + 'static,
    {
        Self {
            predicates: vec![Predicate::client_id(client_id), Predicate::of_kinds(kinds)],
            handler: Arc::new(handler),
        }
    }
}

impl Listener for KindListener {
    fn process(&mut self, message: &Arc<Message>) -> Verdict {
        if !all_hold(&self.predicates, message) {
            return Verdict::Continue;
        }
        let handler = Arc::clone(&self.handler);
        let owned = Arc::clone(message);
        spawn_handler(self.label(), move || {
            let kind = owned.message_kind().unwrap_or_default().to_owned();
            handler(&kind, owned);
        });
        Verdict::StopKeep
    }

    fn label(&self) -> &'static str {
        "kind"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::Duration;

    use rstest::rstest;

    use super::*;
    use crate::message::{CLIENT_ID_FIELD, EXTRA_FIELD};

    const WAIT: Duration = Duration::from_secs(2);
    const QUIET: Duration = Duration::from_millis(100);

    fn shared(message: Message) -> Arc<Message> {
        Arc::new(message)
    }

    #[rstest]
    fn once_listener_fires_and_asks_for_removal() {
        let token = CorrelationToken::from_string("t-1");
        let (tx, rx) = mpsc::channel();
        let mut listener = OnceListener::correlated(ClientId::new(3), &token, move |message| {
            tx.send(message).expect("deliver reply");
        });

        let reply = shared(
            Message::kind("pong")
                .with(EXTRA_FIELD, "t-1")
                .with(CLIENT_ID_FIELD, 3),
        );
        assert_eq!(listener.process(&reply), Verdict::StopRemove);
        let received = rx.recv_timeout(WAIT).expect("handler ran");
        assert!(Arc::ptr_eq(&received, &reply));
    }

    #[rstest]
    #[case(Message::kind("pong").with(EXTRA_FIELD, "t-2").with(CLIENT_ID_FIELD, 3))]
    #[case(Message::kind("pong").with(EXTRA_FIELD, "t-1").with(CLIENT_ID_FIELD, 4))]
    #[case(Message::kind("pong"))]
    fn once_listener_passes_on_non_matching_messages(#[case] message: Message) {
        let token = CorrelationToken::from_string("t-1");
        let (tx, rx) = mpsc::channel::<Arc<Message>>();
        let mut listener = OnceListener::correlated(ClientId::new(3), &token, move |message| {
            tx.send(message).expect("deliver reply");
        });
        assert_eq!(listener.process(&shared(message)), Verdict::Continue);
        assert!(rx.recv_timeout(QUIET).is_err());
    }

    #[rstest]
    fn persistent_listener_fires_every_time() {
        let (tx, rx) = mpsc::channel();
        let mut listener =
            PersistentListener::new(vec![Predicate::of_kinds(["tick"])], move |message| {
                tx.send(message).expect("deliver tick");
            });
        for _ in 0..3 {
            assert_eq!(
                listener.process(&shared(Message::kind("tick"))),
                Verdict::StopKeep
            );
        }
        for _ in 0..3 {
            rx.recv_timeout(WAIT).expect("tick handled");
        }
        assert_eq!(
            listener.process(&shared(Message::kind("tock"))),
            Verdict::Continue
        );
    }

    #[rstest]
    fn kind_listener_reports_matched_kind() {
        let (tx, rx) = mpsc::channel();
        let mut listener =
            KindListener::new(ClientId::new(7), ["updateA", "updateB"], move |kind, _| {
                tx.send(kind.to_owned()).expect("deliver kind");
            });
        let message = shared(Message::kind("updateB").with(CLIENT_ID_FIELD, 7));
        assert_eq!(listener.process(&message), Verdict::StopKeep);
        assert_eq!(rx.recv_timeout(WAIT).expect("handler ran"), "updateB");
    }

    #[rstest]
    fn kind_listener_ignores_other_sessions() {
        let mut listener = KindListener::new(ClientId::new(7), ["updateA"], |_, _| {});
        let message = shared(Message::kind("updateA").with(CLIENT_ID_FIELD, 8));
        assert_eq!(listener.process(&message), Verdict::Continue);
    }
}
