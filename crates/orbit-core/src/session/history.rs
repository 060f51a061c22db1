//! Conversation history store.

use super::message::Message;

/// How [`History::replace_last`] combines new text with the last entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceMode {
    /// Concatenate onto the existing text (stream chunks).
    Append,
    /// Overwrite the existing text (errors, full responses).
    Replace,
}

/// Ordered, append-biased log of messages.
///
/// Insertion order is display order. Only the last entry is ever rewritten,
/// and always by swapping in a new [`Message`] value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    messages: Vec<Message>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a user message and its AI placeholder as one step.
    pub fn append_pair(&mut self, user: Message, placeholder: Message) {
        self.messages.reserve(2);
        self.messages.push(user);
        self.messages.push(placeholder);
    }

    /// Rewrites the text of the last entry.
    ///
    /// Returns `false` (and changes nothing) when the history is empty.
    pub fn replace_last(&mut self, text: &str, mode: ReplaceMode) -> bool {
        let Some(last) = self.messages.last_mut() else {
            return false;
        };

        let new_text = match mode {
            ReplaceMode::Append => {
                let mut combined = String::with_capacity(last.text.len() + text.len());
                combined.push_str(&last.text);
                combined.push_str(text);
                combined
            }
            ReplaceMode::Replace => text.to_string(),
        };
        *last = last.with_text(new_text);
        true
    }

    /// Clears the whole history.
    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Speaker;

    #[test]
    fn append_pair_keeps_order() {
        let mut history = History::new();
        history.append_pair(Message::user("hi"), Message::ai(""));

        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0], Message::user("hi"));
        assert_eq!(history.messages()[1], Message::ai(""));
    }

    #[test]
    fn append_mode_concatenates_without_separators() {
        let mut history = History::new();
        history.append_pair(Message::user("q"), Message::ai(""));

        for chunk in ["Hel", "lo, ", "world"] {
            assert!(history.replace_last(chunk, ReplaceMode::Append));
        }

        assert_eq!(history.last().unwrap().text, "Hello, world");
        assert_eq!(history.last().unwrap().speaker, Speaker::Ai);
    }

    #[test]
    fn replace_mode_overwrites() {
        let mut history = History::new();
        history.append_pair(Message::user("q"), Message::ai(""));
        history.replace_last("Hel", ReplaceMode::Append);
        history.replace_last("boom", ReplaceMode::Replace);

        assert_eq!(history.last().unwrap().text, "boom");
        assert_eq!(history.messages()[0].text, "q");
    }

    #[test]
    fn replace_last_on_empty_history_is_a_no_op() {
        let mut history = History::new();
        assert!(!history.replace_last("late", ReplaceMode::Append));
        assert!(history.is_empty());
    }

    #[test]
    fn earlier_snapshots_are_not_affected_by_later_appends() {
        let mut history = History::new();
        history.append_pair(Message::user("q"), Message::ai(""));
        let before = history.clone();

        history.replace_last("partial", ReplaceMode::Append);

        assert_eq!(before.last().unwrap().text, "");
        assert_eq!(history.last().unwrap().text, "partial");
    }

    #[test]
    fn reset_clears_everything() {
        let mut history = History::new();
        history.append_pair(Message::user("q"), Message::ai("a"));
        history.reset();
        assert!(history.is_empty());
    }
}
