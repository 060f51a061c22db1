//! Command palette autocomplete.
//!
//! The palette is a two-state machine (`Hidden`/`Visible`) recomputed from
//! the input text on every change and driven by a handful of keys while it
//! is shown. It only filters, navigates and commits; what a command does is
//! decided by whoever receives [`PaletteAction::Execute`].

use std::sync::Arc;

use super::model::Command;
use super::registry::CommandRegistry;

/// Visibility of the palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteState {
    Hidden,
    Visible,
}

/// Keys the palette reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaletteKey {
    Up,
    Down,
    /// Enter without modifiers.
    Enter,
    /// Enter with Shift held (newline in the text field).
    ShiftEnter,
    Escape,
}

/// What the caller has to do after a key was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaletteAction {
    /// The key was not consumed; let the text field handle it.
    PassThrough,
    /// Selection moved; redraw the menu.
    Navigated,
    /// The menu was closed without touching the input.
    Dismissed,
    /// A command was committed into the input and must run right away.
    Execute(String),
    /// Ordinary submission of the current input text.
    Submit(String),
}

/// Suggestion state derived from the input text and the registry.
#[derive(Debug, Clone)]
pub struct Autocomplete {
    registry: Arc<CommandRegistry>,
    input: String,
    suggestions: Vec<Command>,
    visible: bool,
    selected: Option<usize>,
}

impl Autocomplete {
    pub fn new(registry: Arc<CommandRegistry>) -> Self {
        Self {
            registry,
            input: String::new(),
            suggestions: Vec::new(),
            visible: false,
            selected: None,
        }
    }

    /// Updates the input text and recomputes the suggestion state.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();

        let suggestions = match self.input.strip_prefix('/') {
            Some(needle) => self.registry.filter(needle),
            None => Vec::new(),
        };

        let visible = !suggestions.is_empty();
        if !visible || suggestions != self.suggestions {
            self.selected = None;
        }
        self.suggestions = suggestions;
        self.visible = visible;
    }

    /// Handles one key press.
    pub fn handle_key(&mut self, key: PaletteKey) -> PaletteAction {
        if !self.visible {
            return match key {
                PaletteKey::Enter => PaletteAction::Submit(self.input.clone()),
                _ => PaletteAction::PassThrough,
            };
        }

        let len = self.suggestions.len();
        match key {
            PaletteKey::Down => {
                self.selected = Some(match self.selected {
                    None => 0,
                    Some(i) => (i + 1) % len,
                });
                PaletteAction::Navigated
            }
            PaletteKey::Up => {
                self.selected = Some(match self.selected {
                    None | Some(0) => len - 1,
                    Some(i) => i - 1,
                });
                PaletteAction::Navigated
            }
            PaletteKey::Enter => {
                let index = self.selected.unwrap_or(0);
                let name = self.suggestions[index].name.clone();
                self.input = name.clone();
                self.hide();
                PaletteAction::Execute(name)
            }
            PaletteKey::Escape => {
                self.hide();
                PaletteAction::Dismissed
            }
            PaletteKey::ShiftEnter => PaletteAction::PassThrough,
        }
    }

    /// Closes the menu and forgets the selection.
    pub fn hide(&mut self) {
        self.visible = false;
        self.selected = None;
    }

    /// Clears the input text (and therefore the menu).
    pub fn clear(&mut self) {
        self.set_input(String::new());
    }

    pub fn state(&self) -> PaletteState {
        if self.visible {
            PaletteState::Visible
        } else {
            PaletteState::Hidden
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn suggestions(&self) -> &[Command] {
        &self.suggestions
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Selection as a signed index where `-1` means "nothing selected".
    pub fn selected_index_signed(&self) -> isize {
        self.selected.map_or(-1, |i| i as isize)
    }

    /// The command Enter would commit right now.
    pub fn highlighted(&self) -> Option<&Command> {
        if !self.visible {
            return None;
        }
        self.suggestions.get(self.selected.unwrap_or(0))
    }
}
