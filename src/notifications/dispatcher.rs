//! Detached delivery of notifier calls.

use super::{Notifier, NotifyResult};
use std::future::Future;
use std::sync::Arc;

/// Run a notifier call on its own task. The caller never waits and never sees the outcome;
/// failures are logged at `warn`.
///
/// ```ignore
/// dispatch(notifier.clone(), "ticket_claimed", move |n| async move {
///     n.ticket_claimed(ticket_id, requester_id, staff_id).await
/// });
/// ```
pub fn dispatch<F, Fut>(notifier: Arc<dyn Notifier>, event: &'static str, call: F)
where
    F: FnOnce(Arc<dyn Notifier>) -> Fut + 'static,
    Fut: Future<Output = NotifyResult> + 'static,
{
    actix::spawn(async move {
        if let Err(e) = call(notifier).await {
            log::warn!("Notifier {} failed: {}", event, e);
        }
    });
}
