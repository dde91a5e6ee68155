//! Subscriber bookkeeping and the dispatcher task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use airtouch_message::{Message, MessageKind};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Something a subscriber gets told about.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// A decoded message from the console.
    Message(Message),
    /// Reconnecting failed; the connection is now disconnected.
    ConnectionLost,
}

/// Which messages a handler receives. Every subscriber gets
/// [`ConnectionEvent::ConnectionLost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subscription {
    All,
    Kind(MessageKind),
}

impl Subscription {
    fn matches(&self, event: &ConnectionEvent) -> bool {
        match (self, event) {
            (_, ConnectionEvent::ConnectionLost) | (Subscription::All, _) => true,
            (Subscription::Kind(kind), ConnectionEvent::Message(message)) => {
                message.kind() == *kind
            }
        }
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub(crate) type Handler = Arc<dyn Fn(&ConnectionEvent) + Send + Sync>;

struct Entry {
    id: SubscriptionId,
    subscription: Subscription,
    handler: Handler,
}

#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    entries: RwLock<Vec<Entry>>,
}

impl Subscribers {
    pub(crate) fn add(&self, subscription: Subscription, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.push(Entry {
            id,
            subscription,
            handler,
        });
        id
    }

    /// Returns whether the id was registered.
    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        entries.len() != before
    }

    /// Invoke every matching handler, in registration order.
    ///
    /// Handlers run outside the lock, so they may subscribe or unsubscribe.
    pub(crate) fn dispatch(&self, event: &ConnectionEvent) {
        let handlers: Vec<Handler> = {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            entries
                .iter()
                .filter(|entry| entry.subscription.matches(event))
                .map(|entry| Arc::clone(&entry.handler))
                .collect()
        };
        trace!(handlers = handlers.len(), ?event, "dispatching event");
        for handler in handlers {
            handler(event);
        }
    }
}

/// Deliver queued events one at a time until cancelled or the queue closes.
pub(crate) async fn dispatch_loop(
    subscribers: Arc<Subscribers>,
    mut events: mpsc::Receiver<ConnectionEvent>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            _ = cancel.cancelled() => return,
            event = events.recv() => match event {
                Some(event) => event,
                None => return,
            },
        };
        subscribers.dispatch(&event);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use airtouch_message::{AcErrorInformation, ZoneStatus};

    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<ConnectionEvent>>>, Handler) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: Handler = Arc::new(move |event: &ConnectionEvent| {
            sink.lock().unwrap().push(event.clone());
        });
        (seen, handler)
    }

    #[test]
    fn kind_filter_and_connection_lost() {
        let subscribers = Subscribers::default();
        let (zones, zone_handler) = recorder();
        let (all, all_handler) = recorder();
        subscribers.add(Subscription::Kind(MessageKind::ZoneStatus), zone_handler);
        subscribers.add(Subscription::All, all_handler);

        let zone = ConnectionEvent::Message(ZoneStatus::Request.into());
        let ac = ConnectionEvent::Message(AcErrorInformation::Request { ac_number: 0 }.into());
        subscribers.dispatch(&zone);
        subscribers.dispatch(&ac);
        subscribers.dispatch(&ConnectionEvent::ConnectionLost);

        assert_eq!(
            *zones.lock().unwrap(),
            vec![zone.clone(), ConnectionEvent::ConnectionLost]
        );
        assert_eq!(
            *all.lock().unwrap(),
            vec![zone, ac, ConnectionEvent::ConnectionLost]
        );
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let subscribers = Subscribers::default();
        let (seen, handler) = recorder();
        let id = subscribers.add(Subscription::All, handler);

        subscribers.dispatch(&ConnectionEvent::ConnectionLost);
        assert!(subscribers.remove(id));
        assert!(!subscribers.remove(id));
        subscribers.dispatch(&ConnectionEvent::ConnectionLost);

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn handler_may_unsubscribe_itself() {
        let subscribers = Arc::new(Subscribers::default());
        let calls = Arc::new(AtomicU64::new(0));
        let slot: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let handler: Handler = {
            let subscribers = Arc::clone(&subscribers);
            let calls = Arc::clone(&calls);
            let slot = Arc::clone(&slot);
            Arc::new(move |_: &ConnectionEvent| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = slot.lock().unwrap().take() {
                    subscribers.remove(id);
                }
            })
        };
        let id = subscribers.add(Subscription::All, handler);
        *slot.lock().unwrap() = Some(id);

        subscribers.dispatch(&ConnectionEvent::ConnectionLost);
        subscribers.dispatch(&ConnectionEvent::ConnectionLost);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispatch_loop_preserves_queue_order() {
        let subscribers = Arc::new(Subscribers::default());
        let (seen, handler) = recorder();
        subscribers.add(Subscription::All, handler);

        let (tx, rx) = mpsc::channel(8);
        let task = tokio::spawn(dispatch_loop(
            Arc::clone(&subscribers),
            rx,
            CancellationToken::new(),
        ));
        for ac_number in 0..5 {
            tx.send(ConnectionEvent::Message(
                AcErrorInformation::Request { ac_number }.into(),
            ))
            .await
            .unwrap();
        }
        drop(tx);
        task.await.unwrap();

        let numbers: Vec<u8> = seen
            .lock()
            .unwrap()
            .iter()
            .map(|event| match event {
                ConnectionEvent::Message(Message::AcErrorInformation(m)) => m.ac_number(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(numbers, vec![0, 1, 2, 3, 4]);
    }
}
