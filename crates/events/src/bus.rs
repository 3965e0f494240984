//! Multi-subscriber event bus
//!
//! The orchestrator owns one [`EventBus`] and every consumer (CLI
//! renderer, tests, tracing bridge) holds its own [`Subscription`]. A
//! subscription may filter by [`EventKind`]; dropping it unsubscribes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::{AppEvent, EventEmitter, EventKind, EventMessage, EventMeta, EventSender};

struct Subscriber {
    id: u64,
    kinds: Option<Vec<EventKind>>,
    sender: UnboundedSender<EventMessage>,
}

impl Subscriber {
    fn wants(&self, kind: EventKind) -> bool {
        self.kinds.as_ref().is_none_or(|kinds| kinds.contains(&kind))
    }
}

#[derive(Default)]
struct BusInner {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl BusInner {
    fn remove(&self, id: u64) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|subscriber| subscriber.id != id);
    }
}

/// Cloneable handle to a shared publish/subscribe channel
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every event published after this call
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.register(None)
    }

    /// Receive only events whose kind is listed
    #[must_use]
    pub fn subscribe_to(&self, kinds: &[EventKind]) -> Subscription {
        self.register(Some(kinds.to_vec()))
    }

    fn register(&self, kinds: Option<Vec<EventKind>>) -> Subscription {
        let (sender, receiver) = unbounded_channel();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { id, kinds, sender });
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
            receiver,
        }
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver a message to every interested subscriber
    pub fn publish(&self, message: &EventMessage) {
        let kind = message.kind();
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // A failed send means the receiving half is gone
        subscribers.retain(|subscriber| {
            !subscriber.wants(kind) || subscriber.sender.send(message.clone()).is_ok()
        });
    }
}

impl EventEmitter for EventBus {
    fn event_sender(&self) -> Option<&EventSender> {
        None
    }

    fn emit_with_meta(&self, meta: EventMeta, event: AppEvent) {
        self.publish(&EventMessage::new(meta, event));
    }
}

/// Receiving end of a bus registration
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
    receiver: UnboundedReceiver<EventMessage>,
}

impl Subscription {
    /// Wait for the next message; `None` once the bus is gone
    pub async fn recv(&mut self) -> Option<EventMessage> {
        self.receiver.recv().await
    }

    /// Take the next message if one is already queued
    pub fn try_recv(&mut self) -> Option<EventMessage> {
        self.receiver.try_recv().ok()
    }

    /// Take every queued message
    pub fn drain(&mut self) -> Vec<EventMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.receiver.try_recv() {
            messages.push(message);
        }
        messages
    }

    /// Stop receiving events
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(self.id);
        }
    }
}
