//! Turns successive session views into terminal output.

use orbit_application::SessionView;
use orbit_core::session::Speaker;

/// One thing to print.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOp {
    /// The conversation was wiped.
    Cleared,
    /// More text for the answer being printed.
    Appended(String),
    /// The answer was rewritten (error, single-shot delivery).
    Replaced(String),
    /// The answer is complete.
    Finished,
}

/// Remembers what has been printed so only the difference is emitted.
#[derive(Debug, Default)]
pub struct ViewRenderer {
    messages: usize,
    text: String,
    loading: bool,
}

impl ViewRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, view: &SessionView) -> Vec<RenderOp> {
        let mut ops = Vec::new();

        if view.history.len() < self.messages {
            ops.push(RenderOp::Cleared);
            self.messages = 0;
            self.text.clear();
        }
        if view.history.len() > self.messages {
            self.messages = view.history.len();
            self.text.clear();
        }

        if let Some(last) = view.history.last().filter(|m| m.speaker == Speaker::Ai) {
            if last.text != self.text {
                match last.text.strip_prefix(self.text.as_str()) {
                    Some(rest) => ops.push(RenderOp::Appended(rest.to_string())),
                    None => ops.push(RenderOp::Replaced(last.text.clone())),
                }
                self.text = last.text.clone();
            }
        }

        if self.loading && !view.loading {
            ops.push(RenderOp::Finished);
        }
        self.loading = view.loading;
        ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbit_core::session::Message;

    fn view(ai: &str, loading: bool) -> SessionView {
        SessionView {
            history: vec![Message::user("Hi"), Message::ai(ai)],
            loading,
        }
    }

    #[test]
    fn streamed_text_is_printed_incrementally() {
        let mut renderer = ViewRenderer::new();
        assert!(renderer.update(&view("", true)).is_empty());
        assert_eq!(
            renderer.update(&view("Hel", true)),
            vec![RenderOp::Appended("Hel".into())]
        );
        assert_eq!(
            renderer.update(&view("Hello", false)),
            vec![RenderOp::Appended("lo".into()), RenderOp::Finished]
        );
    }

    #[test]
    fn overwritten_text_is_reprinted() {
        let mut renderer = ViewRenderer::new();
        renderer.update(&view("partial", true));
        assert_eq!(
            renderer.update(&view("boom", false)),
            vec![RenderOp::Replaced("boom".into()), RenderOp::Finished]
        );
    }

    #[test]
    fn reset_is_reported_once() {
        let mut renderer = ViewRenderer::new();
        renderer.update(&view("answer", false));
        assert_eq!(
            renderer.update(&SessionView::default()),
            vec![RenderOp::Cleared]
        );
        assert!(renderer.update(&SessionView::default()).is_empty());
    }

    #[test]
    fn a_new_question_starts_a_new_answer() {
        let mut renderer = ViewRenderer::new();
        renderer.update(&view("first", false));

        let mut next = view("first", false);
        next.history.push(Message::user("again"));
        next.history.push(Message::ai("sec"));
        next.loading = true;
        assert_eq!(renderer.update(&next), vec![RenderOp::Appended("sec".into())]);
    }
}
