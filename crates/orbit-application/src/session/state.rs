//! Shared session state behind the controller and its subscribers.

use std::sync::{Mutex, MutexGuard, PoisonError};

use orbit_core::event::SubmissionId;
use orbit_core::session::{History, Message};
use tokio::sync::watch;

/// What the UI renders: the conversation and whether an answer is pending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub history: Vec<Message>,
    pub loading: bool,
}

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) history: History,
    pub(crate) loading: bool,
    /// Submission currently holding the single-flight slot.
    pub(crate) active: Option<SubmissionId>,
}

impl SessionState {
    fn view(&self) -> SessionView {
        SessionView {
            history: self.history.messages().to_vec(),
            loading: self.loading,
        }
    }

    pub(crate) fn holds_slot(&self, id: SubmissionId) -> bool {
        self.active == Some(id)
    }

    /// Frees the single-flight slot if `id` holds it.
    pub(crate) fn release_slot(&mut self, id: SubmissionId) {
        if self.holds_slot(id) {
            self.active = None;
        }
    }
}

/// State plus the channel that mirrors it to the UI.
///
/// Every mutation runs under one mutex and publishes a fresh view before the
/// lock is dropped, so watchers never observe views out of order.
pub(crate) struct SessionShared {
    state: Mutex<SessionState>,
    view_tx: watch::Sender<SessionView>,
}

impl SessionShared {
    pub(crate) fn new() -> Self {
        let (view_tx, _view_rx) = watch::channel(SessionView::default());
        Self {
            state: Mutex::new(SessionState::default()),
            view_tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs a mutation and publishes the resulting view.
    pub(crate) fn update<R>(&self, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut state = self.lock();
        let result = f(&mut state);
        self.view_tx.send_replace(state.view());
        result
    }

    /// Runs a read-only closure against the state.
    pub(crate) fn read<R>(&self, f: impl FnOnce(&SessionState) -> R) -> R {
        f(&self.lock())
    }

    pub(crate) fn view(&self) -> SessionView {
        self.lock().view()
    }

    pub(crate) fn watch(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }
}
