//! Routes the text field's input between the palette, the mode switcher and
//! the query controller.

use std::sync::Arc;

use orbit_core::session::{AppMode, Track};
use orbit_core::slash_command::{Autocomplete, CommandRegistry, PaletteAction, PaletteKey};

use crate::session::{QueryController, ResetReason, SubmitOutcome};

/// What happened in response to a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// The palette handled (or passed through) the key.
    Palette(PaletteAction),
    /// A reserved command switched the mode; nothing was sent.
    ModeChanged(AppMode),
    /// The text went to the controller.
    Submitted(SubmitOutcome),
}

/// Owns the input text state of one overlay window.
pub struct InputRouter {
    controller: Arc<QueryController>,
    palette: Autocomplete,
    mode: AppMode,
    tracks: Vec<Track>,
}

impl InputRouter {
    pub fn new(controller: Arc<QueryController>, registry: Arc<CommandRegistry>) -> Self {
        Self {
            controller,
            palette: Autocomplete::new(registry),
            mode: AppMode::default(),
            tracks: Vec::new(),
        }
    }

    /// Mirrors a change of the text field into the palette.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.palette.set_input(text);
    }

    /// Handles a key press on the text field.
    ///
    /// Enter either commits the highlighted palette entry and runs it, or
    /// submits the typed text.
    pub async fn handle_key(&mut self, key: PaletteKey) -> RouteOutcome {
        match self.palette.handle_key(key) {
            PaletteAction::Execute(text) | PaletteAction::Submit(text) => {
                self.process_query(&text).await
            }
            other => RouteOutcome::Palette(other),
        }
    }

    /// Runs `text` as if it had been submitted from the text field.
    ///
    /// `/producer` and `/standard` switch the mode locally and clear the
    /// input. Anything else goes to the controller with the current track
    /// context; the input is cleared once the submission is accepted.
    pub async fn process_query(&mut self, text: &str) -> RouteOutcome {
        if let Some(mode) = AppMode::from_command(text) {
            if mode != self.mode {
                tracing::info!("[InputRouter] Mode {:?} -> {:?}", self.mode, mode);
            }
            self.mode = mode;
            self.palette.clear();
            return RouteOutcome::ModeChanged(mode);
        }

        let outcome = self.controller.submit(text, &self.tracks).await;
        if matches!(outcome, SubmitOutcome::Accepted | SubmitOutcome::Failed(_)) {
            self.palette.clear();
        }
        RouteOutcome::Submitted(outcome)
    }

    /// Clear gesture: wipes the conversation and the input text.
    pub fn clear(&mut self) {
        self.controller.reset(ResetReason::Clear);
        self.palette.clear();
    }

    /// The window regained focus: start over with an empty conversation.
    pub fn focus_regained(&mut self) {
        self.controller.reset(ResetReason::FocusRegained);
        self.palette.clear();
    }

    pub fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.tracks = tracks;
    }

    /// Replaces the track context from its JSON form.
    ///
    /// Malformed JSON clears the context. Returns the number of tracks kept.
    pub fn set_tracks_json(&mut self, json: &str) -> usize {
        self.tracks = Track::parse_selection(json);
        self.tracks.len()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn palette(&self) -> &Autocomplete {
        &self.palette
    }

    pub fn input(&self) -> &str {
        self.palette.input()
    }

    pub fn controller(&self) -> &Arc<QueryController> {
        &self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use orbit_core::backend::{Backend, StreamRequest};
    use orbit_core::error::Result;
    use orbit_core::event::StreamEvent;
    use orbit_core::slash_command::PaletteState;
    use orbit_infrastructure::LocalEventBus;
    use std::sync::Mutex;

    struct EchoBackend {
        bus: Arc<LocalEventBus>,
        queries: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Backend for EchoBackend {
        async fn ask(&self, message: &str) -> Result<String> {
            Ok(message.to_string())
        }

        async fn stream(&self, request: StreamRequest) -> Result<()> {
            self.queries.lock().unwrap().push(request.query.clone());
            self.bus
                .emit_event(request.submission, &StreamEvent::Chunk("ok".into()));
            self.bus.emit_event(request.submission, &StreamEvent::Done);
            Ok(())
        }
    }

    fn router() -> (InputRouter, Arc<EchoBackend>) {
        let bus = Arc::new(LocalEventBus::new());
        let backend = Arc::new(EchoBackend {
            bus: bus.clone(),
            queries: Mutex::new(Vec::new()),
        });
        let controller = Arc::new(QueryController::new(backend.clone(), bus));
        let router = InputRouter::new(controller, Arc::new(CommandRegistry::default()));
        (router, backend)
    }

    #[tokio::test]
    async fn palette_enter_runs_the_mode_switch() {
        let (mut router, backend) = router();
        router.set_input("/prod");
        assert_eq!(router.palette().state(), PaletteState::Visible);

        let outcome = router.handle_key(PaletteKey::Enter).await;

        assert_eq!(outcome, RouteOutcome::ModeChanged(AppMode::Producer));
        assert_eq!(router.mode(), AppMode::Producer);
        assert_eq!(router.input(), "");
        assert!(backend.queries.lock().unwrap().is_empty());
        assert!(router.controller().history().is_empty());
    }

    #[tokio::test]
    async fn typed_reserved_command_sets_mode_not_toggles() {
        let (mut router, _backend) = router();

        router.process_query("  /standard ").await;
        assert_eq!(router.mode(), AppMode::Standard);

        router.process_query("/producer").await;
        router.process_query("/producer").await;
        assert_eq!(router.mode(), AppMode::Producer);
    }

    #[tokio::test]
    async fn plain_text_is_submitted_with_tracks() {
        let (mut router, backend) = router();
        assert_eq!(
            router.set_tracks_json(r#"[{"index":3,"name":"Vox","solo":true}]"#),
            1
        );
        router.set_input("brighter vocals");

        let outcome = router.handle_key(PaletteKey::Enter).await;

        assert_eq!(outcome, RouteOutcome::Submitted(SubmitOutcome::Accepted));
        assert_eq!(router.input(), "");
        let queries = backend.queries.lock().unwrap().clone();
        assert_eq!(
            queries,
            vec![
                "Context - Selected tracks:\nTrack 3: Vox (mute: false, solo: true, arm: false)\n\nQuery: brighter vocals"
                    .to_string()
            ]
        );
    }

    #[tokio::test]
    async fn navigation_keys_stay_in_the_palette() {
        let (mut router, _backend) = router();
        router.set_input("/");

        assert_eq!(
            router.handle_key(PaletteKey::Down).await,
            RouteOutcome::Palette(PaletteAction::Navigated)
        );
        assert_eq!(
            router.handle_key(PaletteKey::Escape).await,
            RouteOutcome::Palette(PaletteAction::Dismissed)
        );
        assert_eq!(router.input(), "/");
    }

    #[tokio::test]
    async fn malformed_track_json_clears_context() {
        let (mut router, _backend) = router();
        router.set_tracks(vec![Track::new(0, "Drums")]);

        assert_eq!(router.set_tracks_json("{not json"), 0);
        assert!(router.tracks().is_empty());
    }

    #[tokio::test]
    async fn clear_and_focus_wipe_history_and_input() {
        let (mut router, _backend) = router();
        router.process_query("hello").await;
        assert_eq!(router.controller().history().len(), 2);

        router.set_input("draft");
        router.clear();
        assert!(router.controller().history().is_empty());
        assert_eq!(router.input(), "");

        router.process_query("again").await;
        router.set_input("/pro");
        router.focus_regained();
        assert!(router.controller().snapshot().history.is_empty());
        assert!(!router.controller().is_loading());
        assert_eq!(router.palette().state(), PaletteState::Hidden);
    }
}
