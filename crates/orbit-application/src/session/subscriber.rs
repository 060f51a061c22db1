//! Per-submission stream subscriber.

use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use orbit_core::error::Result;
use orbit_core::event::{
    EventChannels, EventHandler, EventPayload, StreamEvent, SubmissionId, STREAM_CHUNK,
    STREAM_DONE, STREAM_ERROR,
};
use orbit_core::session::ReplaceMode;
use tokio::sync::watch;

use super::state::SessionShared;
use super::subscription::SubscriptionSet;

/// Lifecycle of a [`StreamSubscriber`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberPhase {
    /// Created, listeners not yet registered.
    Idle,
    /// Listening; chunks are applied to the placeholder.
    Streaming,
    /// Finished; every later event is ignored.
    Terminated,
}

/// How a submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Termination {
    /// `stream_done`: placeholder keeps its streamed text.
    Done,
    /// `stream_error`: placeholder is overwritten by the payload.
    StreamError(String),
    /// The invocation itself failed: placeholder becomes `Error: {details}`.
    InvocationFailed(String),
    /// A single-shot answer: placeholder is overwritten by the response.
    Delivered(String),
    /// External reset: history is already gone, nothing to write.
    Reset,
}

impl Termination {
    fn placeholder_text(&self) -> Option<String> {
        match self {
            Self::Done | Self::Reset => None,
            Self::StreamError(text) | Self::Delivered(text) => Some(text.clone()),
            Self::InvocationFailed(details) => Some(format!("Error: {details}")),
        }
    }
}

/// Feeds one submission's channel events into the history.
///
/// Only events tagged with this subscriber's [`SubmissionId`] are applied,
/// and only while it holds the single-flight slot.
///
/// Lock order is always session state first, then `phase`; listener
/// handles are released only after the session lock is dropped.
pub struct StreamSubscriber {
    id: SubmissionId,
    shared: Arc<SessionShared>,
    phase: Mutex<SubscriberPhase>,
    subscriptions: OnceLock<SubscriptionSet>,
    /// Flips to `true` on the first own event or on termination.
    observed: watch::Sender<bool>,
}

impl StreamSubscriber {
    pub(crate) fn new(id: SubmissionId, shared: Arc<SessionShared>) -> Arc<Self> {
        Arc::new(Self {
            id,
            shared,
            phase: Mutex::new(SubscriberPhase::Idle),
            subscriptions: OnceLock::new(),
            observed: watch::channel(false).0,
        })
    }

    pub fn id(&self) -> SubmissionId {
        self.id
    }

    /// Resolves once an event of this submission has arrived, or it has ended.
    pub(crate) async fn first_event(&self) {
        let mut rx = self.observed.subscribe();
        // The sender lives as long as `self`, so this only ends on `true`.
        let _ = rx.wait_for(|seen| *seen).await;
    }

    pub(crate) fn has_observed_event(&self) -> bool {
        *self.observed.borrow()
    }

    fn mark_observed(&self) {
        self.observed.send_if_modified(|seen| !std::mem::replace(seen, true));
    }

    pub fn phase(&self) -> SubscriberPhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether the listener handles have been released.
    pub fn is_released(&self) -> bool {
        self.subscriptions
            .get()
            .is_none_or(SubscriptionSet::is_released)
    }

    /// Registers the chunk, done and error listeners (Idle → Streaming).
    pub(crate) fn attach(self: &Arc<Self>, channels: Arc<dyn EventChannels>) -> Result<()> {
        let handlers = vec![
            (STREAM_CHUNK, self.handler(STREAM_CHUNK)),
            (STREAM_DONE, self.handler(STREAM_DONE)),
            (STREAM_ERROR, self.handler(STREAM_ERROR)),
        ];
        let set = SubscriptionSet::subscribe(channels, handlers)?;
        if self.subscriptions.set(set).is_err() {
            tracing::warn!("[StreamSubscriber] {} attached twice", self.id);
            return Ok(());
        }

        let streaming = self.shared.read(|_| {
            let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
            if *phase == SubscriberPhase::Idle {
                *phase = SubscriberPhase::Streaming;
                true
            } else {
                false
            }
        });

        if streaming {
            tracing::debug!("[StreamSubscriber] {} streaming", self.id);
        } else {
            // Terminated while listeners were being registered.
            self.release();
        }
        Ok(())
    }

    fn handler(self: &Arc<Self>, channel: &'static str) -> EventHandler {
        let weak: Weak<Self> = Arc::downgrade(self);
        Arc::new(move |submission: SubmissionId, payload: EventPayload| {
            let Some(subscriber) = weak.upgrade() else {
                return;
            };
            if submission != subscriber.id {
                tracing::trace!(
                    "[StreamSubscriber] {} ignored {} event of {}",
                    subscriber.id,
                    channel,
                    submission
                );
                return;
            }
            if let Some(event) = StreamEvent::from_channel(channel, payload) {
                subscriber.on_event(event);
            }
        })
    }

    /// Applies one event of this submission.
    pub(crate) fn on_event(&self, event: StreamEvent) {
        self.mark_observed();
        match event {
            StreamEvent::Chunk(fragment) => {
                let applied = self.shared.update(|state| {
                    let phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
                    if *phase != SubscriberPhase::Streaming || !state.holds_slot(self.id) {
                        return false;
                    }
                    state.history.replace_last(&fragment, ReplaceMode::Append)
                });
                if !applied {
                    tracing::trace!(
                        "[StreamSubscriber] {} ignored chunk outside its stream",
                        self.id
                    );
                }
            }
            StreamEvent::Done => {
                self.terminate(Termination::Done);
            }
            StreamEvent::Error(message) => {
                tracing::warn!(
                    "[StreamSubscriber] {} stream error: {}",
                    self.id,
                    message
                );
                self.terminate(Termination::StreamError(message));
            }
        }
    }

    /// Moves to Terminated and releases the listeners.
    ///
    /// Returns `false` if the subscriber had already terminated, in which
    /// case nothing is written.
    pub(crate) fn terminate(&self, termination: Termination) -> bool {
        let transitioned = self.shared.update(|state| {
            let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
            if *phase == SubscriberPhase::Terminated {
                return false;
            }
            *phase = SubscriberPhase::Terminated;

            if state.holds_slot(self.id) {
                if let Some(text) = termination.placeholder_text() {
                    state.history.replace_last(&text, ReplaceMode::Replace);
                }
                state.loading = false;
                state.release_slot(self.id);
            }
            true
        });

        self.release();
        self.mark_observed();

        if transitioned {
            tracing::debug!(
                "[StreamSubscriber] {} terminated ({:?})",
                self.id,
                termination
            );
        }
        transitioned
    }

    /// Releases the listener handles; safe to call any number of times.
    pub(crate) fn release(&self) {
        if let Some(set) = self.subscriptions.get() {
            set.release();
        }
    }
}

impl std::fmt::Debug for StreamSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamSubscriber")
            .field("id", &self.id)
            .field("phase", &self.phase())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_core::session::Message;
    use orbit_infrastructure::LocalEventBus;

    fn streaming(
        id: SubmissionId,
        holds_slot: bool,
    ) -> (Arc<SessionShared>, Arc<StreamSubscriber>, Arc<LocalEventBus>) {
        let shared = Arc::new(SessionShared::new());
        shared.update(|state| {
            state.history.append_pair(Message::user("Hi"), Message::ai(""));
            state.loading = true;
            state.active = holds_slot.then_some(id);
        });
        let bus = Arc::new(LocalEventBus::new());
        let subscriber = StreamSubscriber::new(id, shared.clone());
        subscriber.attach(bus.clone()).unwrap();
        (shared, subscriber, bus)
    }

    fn last_text(shared: &SessionShared) -> String {
        shared.view().history.last().unwrap().text.clone()
    }

    #[test]
    fn chunks_apply_only_while_holding_the_slot() {
        let id = SubmissionId(1);
        let (shared, subscriber, bus) = streaming(id, true);
        bus.emit_event(id, &StreamEvent::Chunk("Hel".into()));
        assert_eq!(last_text(&shared), "Hel");

        // Slot lost without a termination, e.g. a reset that raced the attach.
        shared.update(|state| state.active = None);
        bus.emit_event(id, &StreamEvent::Chunk("lo".into()));

        assert_eq!(last_text(&shared), "Hel");
        assert_eq!(subscriber.phase(), SubscriberPhase::Streaming);
    }

    #[test]
    fn subscriber_without_the_slot_never_writes() {
        let id = SubmissionId(2);
        let (shared, subscriber, bus) = streaming(id, false);

        bus.emit_event(id, &StreamEvent::Chunk("stray".into()));
        bus.emit_event(id, &StreamEvent::Error("boom".into()));

        assert_eq!(last_text(&shared), "");
        assert!(shared.view().loading);
        assert_eq!(subscriber.phase(), SubscriberPhase::Terminated);
        assert!(subscriber.is_released());
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn first_own_event_is_observed() {
        let id = SubmissionId(3);
        let (_shared, subscriber, bus) = streaming(id, true);

        bus.emit_event(SubmissionId(99), &StreamEvent::Chunk("other".into()));
        assert!(!subscriber.has_observed_event());

        bus.emit_event(id, &StreamEvent::Chunk("mine".into()));
        assert!(subscriber.has_observed_event());
    }
}
