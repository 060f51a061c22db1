//! In-process implementation of the backend event channels.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use orbit_core::error::{OrbitError, Result};
use orbit_core::event::{
    EventChannels, EventHandler, EventPayload, ListenerId, StreamEvent, SubmissionId,
};

struct Registration {
    channel: String,
    handler: EventHandler,
}

/// Named channels with synchronous, in-order delivery.
///
/// `emit` snapshots the channel's handlers and invokes them without holding
/// the registry lock, so a handler may unlisten (itself or others) while it
/// runs. Listeners removed mid-dispatch may still see that one event.
#[derive(Default)]
pub struct LocalEventBus {
    next_id: AtomicU64,
    listeners: RwLock<HashMap<ListenerId, Registration>>,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `payload`, tagged with `submission`, to every listener on
    /// `channel` in registration order. Returns the number of handlers invoked.
    pub fn emit(&self, channel: &str, submission: SubmissionId, payload: EventPayload) -> usize {
        let handlers: Vec<EventHandler> = {
            let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner);
            let mut matching: Vec<_> = listeners
                .iter()
                .filter(|(_, registration)| registration.channel == channel)
                .map(|(id, registration)| (*id, registration.handler.clone()))
                .collect();
            matching.sort_by_key(|(id, _)| *id);
            matching.into_iter().map(|(_, handler)| handler).collect()
        };

        if handlers.is_empty() {
            tracing::trace!("[LocalEventBus] No listeners on '{}'", channel);
        }

        for handler in &handlers {
            handler(submission, payload.clone());
        }
        handlers.len()
    }

    /// Convenience for emitting a typed stream event.
    pub fn emit_event(&self, submission: SubmissionId, event: &StreamEvent) -> usize {
        self.emit(event.channel(), submission, event.payload())
    }

    /// Total number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of listeners on one channel.
    pub fn listener_count_on(&self, channel: &str) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|registration| registration.channel == channel)
            .count()
    }
}

impl EventChannels for LocalEventBus {
    fn listen(&self, channel: &str, handler: EventHandler) -> Result<ListenerId> {
        if channel.is_empty() {
            return Err(OrbitError::channel("channel name must not be empty"));
        }

        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                id,
                Registration {
                    channel: channel.to_string(),
                    handler,
                },
            );
        tracing::trace!("[LocalEventBus] {} listening on '{}'", id, channel);
        Ok(id)
    }

    fn unlisten(&self, id: ListenerId) {
        let removed = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
        if removed.is_some() {
            tracing::trace!("[LocalEventBus] {} removed", id);
        }
    }
}

impl std::fmt::Debug for LocalEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalEventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
