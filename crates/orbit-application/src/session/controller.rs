use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use orbit_core::backend::{Backend, StreamRequest};
use orbit_core::config::{BackendConfig, DeliveryMode};
use orbit_core::error::{OrbitError, Result};
use orbit_core::event::{EventChannels, SubmissionId};
use orbit_core::session::{Message, Track, TrackEncoding};
use tokio::sync::watch;

use super::state::{SessionShared, SessionView};
use super::subscriber::{StreamSubscriber, Termination};

/// Message shown in place of the answer when the backend stays silent past
/// the timeout.
const TIMEOUT_DETAILS: &str = "Request timed out.";

/// Knobs taken from `[backend]` in the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControllerOptions {
    pub delivery: DeliveryMode,
    pub track_encoding: TrackEncoding,
    /// How long the backend may stay silent before the invocation counts as
    /// failed: until the first stream event, or for the whole single-shot
    /// call. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl From<&BackendConfig> for ControllerOptions {
    fn from(config: &BackendConfig) -> Self {
        Self {
            delivery: config.delivery,
            track_encoding: config.track_encoding,
            timeout: (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs)),
        }
    }
}

/// Result of [`QueryController::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Blank query; nothing happened.
    Ignored,
    /// Another submission is still streaming; nothing happened.
    Rejected,
    /// The backend accepted the query.
    Accepted,
    /// The invocation failed; the placeholder now reads `Error: {details}`.
    Failed(String),
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// Why the conversation is being wiped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetReason {
    /// Explicit clear gesture.
    Clear,
    /// The window came back into focus.
    FocusRegained,
}

/// Submits queries to the backend and keeps the conversation history in
/// sync with the stream events they produce.
///
/// At most one submission is in flight at a time. Each accepted submission
/// gets its own [`StreamSubscriber`]; its listeners are released exactly
/// once, whichever terminal path is taken first.
pub struct QueryController {
    shared: Arc<SessionShared>,
    backend: Arc<dyn Backend>,
    channels: Arc<dyn EventChannels>,
    options: ControllerOptions,
    next_id: AtomicU64,
    current: Mutex<Option<Arc<StreamSubscriber>>>,
}

impl QueryController {
    /// Creates a controller with default options.
    ///
    /// # Arguments
    ///
    /// * `backend` - Invocation surface of the backend process
    /// * `channels` - Event channels the backend publishes stream progress on
    pub fn new(backend: Arc<dyn Backend>, channels: Arc<dyn EventChannels>) -> Self {
        Self::with_options(backend, channels, ControllerOptions::default())
    }

    pub fn with_options(
        backend: Arc<dyn Backend>,
        channels: Arc<dyn EventChannels>,
        options: ControllerOptions,
    ) -> Self {
        Self {
            shared: Arc::new(SessionShared::new()),
            backend,
            channels,
            options,
            next_id: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    /// Submits a query.
    ///
    /// Appends the user message and an empty AI placeholder, attaches a
    /// subscriber for this submission and invokes the backend. Failures are
    /// written into the placeholder and reported as
    /// [`SubmitOutcome::Failed`]; this method never returns an error.
    ///
    /// # Arguments
    ///
    /// * `query` - Text typed by the user
    /// * `tracks` - Selected tracks to send along as context (may be empty)
    pub async fn submit(&self, query: &str, tracks: &[Track]) -> SubmitOutcome {
        if query.trim().is_empty() {
            tracing::debug!("[QueryController] Ignoring blank query");
            return SubmitOutcome::Ignored;
        }

        let id = SubmissionId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let subscriber = StreamSubscriber::new(id, self.shared.clone());

        // Slot and `current` change together so a concurrent reset sees both.
        let claimed = self.shared.update(|state| {
            if state.active.is_some() {
                return false;
            }
            state.active = Some(id);
            state.loading = true;
            state
                .history
                .append_pair(Message::user(query), Message::ai(""));
            *self.current.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(subscriber.clone());
            true
        });
        if !claimed {
            tracing::warn!(
                "[QueryController] Rejected submission: a response is still streaming"
            );
            return SubmitOutcome::Rejected;
        }
        tracing::info!(
            "[QueryController] {} started ({} track(s), {:?})",
            id,
            tracks.len(),
            self.options.delivery
        );

        if let Err(e) = subscriber.attach(self.channels.clone()) {
            return self.fail(&subscriber, e);
        }

        let request = StreamRequest::compose(id, query, tracks, self.options.track_encoding);
        match self.options.delivery {
            DeliveryMode::Streaming => match self.invoke_stream(&subscriber, request).await {
                Ok(()) => SubmitOutcome::Accepted,
                Err(e) if subscriber.has_observed_event() => {
                    // The stream already delivered; keep what arrived.
                    tracing::warn!("[QueryController] {} ended with: {}", id, e);
                    subscriber.terminate(Termination::Done);
                    SubmitOutcome::Accepted
                }
                Err(e) => self.fail(&subscriber, e),
            },
            DeliveryMode::SingleShot => {
                let message = request.message();
                match self.with_timeout(self.backend.ask(&message)).await {
                    Ok(response) => {
                        subscriber.terminate(Termination::Delivered(response));
                        SubmitOutcome::Accepted
                    }
                    Err(e) => self.fail(&subscriber, e),
                }
            }
        }
    }

    /// Runs the streaming invocation. The timeout only applies until the
    /// first event of this submission arrives; a stream that is delivering
    /// is never cut off.
    async fn invoke_stream(
        &self,
        subscriber: &StreamSubscriber,
        request: StreamRequest,
    ) -> Result<()> {
        let invocation = self.backend.stream(request);
        let Some(limit) = self.options.timeout else {
            return invocation.await;
        };
        tokio::pin!(invocation);

        tokio::select! {
            result = &mut invocation => result,
            waited = tokio::time::timeout(limit, subscriber.first_event()) => match waited {
                Ok(()) => invocation.await,
                Err(_) => Err(OrbitError::backend(TIMEOUT_DETAILS)),
            },
        }
    }

    async fn with_timeout<T>(
        &self,
        invocation: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, invocation)
                .await
                .map_err(|_| OrbitError::backend(TIMEOUT_DETAILS))?,
            None => invocation.await,
        }
    }

    fn fail(&self, subscriber: &StreamSubscriber, error: OrbitError) -> SubmitOutcome {
        let details = error.details();
        tracing::error!(
            "[QueryController] {} failed: {}",
            subscriber.id(),
            error
        );
        subscriber.terminate(Termination::InvocationFailed(details.clone()));
        SubmitOutcome::Failed(details)
    }

    /// Drops the live subscriber (if any), clears the history and the
    /// loading flag. Events still in flight for the old submission are
    /// ignored, even after a new submission has started.
    pub fn reset(&self, reason: ResetReason) {
        let live = self.shared.update(|state| {
            state.history.reset();
            state.loading = false;
            state.active = None;
            self.current
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
        });

        // Outside the session lock: terminate takes it again.
        if let Some(subscriber) = &live {
            subscriber.terminate(Termination::Reset);
        }

        tracing::info!(
            "[QueryController] Session reset ({:?}, live submission: {})",
            reason,
            live.is_some()
        );
    }

    /// Current history and loading flag.
    pub fn snapshot(&self) -> SessionView {
        self.shared.view()
    }

    /// Receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<SessionView> {
        self.shared.watch()
    }

    pub fn is_loading(&self) -> bool {
        self.shared.read(|state| state.loading)
    }

    pub fn history(&self) -> Vec<Message> {
        self.shared.read(|state| state.history.messages().to_vec())
    }

    /// The subscriber of the most recent submission, if it is still held.
    pub fn current_subscriber(&self) -> Option<Arc<StreamSubscriber>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
