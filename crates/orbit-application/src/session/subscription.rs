//! Listener handles owned by one submission.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use orbit_core::error::Result;
use orbit_core::event::{EventChannels, EventHandler, ListenerId};

struct Live {
    channels: Arc<dyn EventChannels>,
    ids: Vec<ListenerId>,
}

/// The listeners registered for one submission.
///
/// Created all-or-nothing by [`SubscriptionSet::subscribe`] and torn down
/// by [`SubscriptionSet::release`], which unregisters every listener on the
/// first call and does nothing on later calls.
pub struct SubscriptionSet {
    live: Mutex<Option<Live>>,
}

impl SubscriptionSet {
    /// Registers every `(channel, handler)` pair.
    ///
    /// If one registration fails, the ones that already succeeded are
    /// unregistered before the error is returned.
    pub fn subscribe(
        channels: Arc<dyn EventChannels>,
        handlers: Vec<(&'static str, EventHandler)>,
    ) -> Result<Self> {
        let mut ids = Vec::with_capacity(handlers.len());

        for (channel, handler) in handlers {
            match channels.listen(channel, handler) {
                Ok(id) => ids.push(id),
                Err(e) => {
                    tracing::warn!(
                        "[SubscriptionSet] Failed to listen on '{}': {}; rolling back {} listener(s)",
                        channel,
                        e,
                        ids.len()
                    );
                    for id in ids {
                        channels.unlisten(id);
                    }
                    return Err(e);
                }
            }
        }

        Ok(Self {
            live: Mutex::new(Some(Live { channels, ids })),
        })
    }

    /// Unregisters all listeners.
    ///
    /// Returns `true` only for the call that actually released them.
    pub fn release(&self) -> bool {
        let live = self
            .live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match live {
            Some(Live { channels, ids }) => {
                tracing::debug!("[SubscriptionSet] Releasing {} listener(s)", ids.len());
                for id in ids {
                    channels.unlisten(id);
                }
                true
            }
            None => false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Number of listeners still registered.
    pub fn len(&self) -> usize {
        self.live
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |live| live.ids.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SubscriptionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionSet")
            .field("listeners", &self.len())
            .finish()
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        self.release();
    }
}
