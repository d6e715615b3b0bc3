//! Off-thread execution of listener handlers.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use tracing::{error, warn};

use super::HANDLER_TARGET;

/// Runs `handler` on its own thread. A panic is caught on that thread and
/// logged; it never reaches the dispatcher.
pub(super) fn spawn_handler<F>(label: &'static str, handler: F)
where
    F: FnOnce() + Send + 'static,
{
    let spawned = thread::Builder::new()
        .name(format!("switchboard-{label}"))
        .spawn(move || {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(handler)) {
                warn!(
                    target: HANDLER_TARGET,
                    listener = label,
                    panic = panic_message(payload.as_ref()),
                    "listener handler panicked"
                );
            }
        });

    if let Err(source) = spawned {
        error!(
            target: HANDLER_TARGET,
            listener = label,
            error = %source,
            "failed to spawn listener handler"
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
