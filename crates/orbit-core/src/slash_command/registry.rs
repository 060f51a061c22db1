//! Ordered command registry backing the palette.

use super::builtin::builtin_commands;
use super::model::Command;

/// Immutable, ordered list of palette commands.
///
/// Built once at startup from the builtins followed by configured extras;
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRegistry {
    commands: Vec<Command>,
}

impl CommandRegistry {
    /// Registry holding exactly `commands`, in the given order.
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// Builtins followed by `extra`.
    ///
    /// An extra entry whose name is already registered is skipped.
    pub fn with_builtins(extra: impl IntoIterator<Item = Command>) -> Self {
        let mut commands: Vec<Command> = builtin_commands().iter().map(Command::from).collect();

        for command in extra {
            if !command.name.starts_with('/') {
                tracing::warn!(
                    "[CommandRegistry] Skipping command '{}': names must start with '/'",
                    command.name
                );
                continue;
            }
            if commands.iter().any(|c| c.name == command.name) {
                tracing::warn!(
                    "[CommandRegistry] Skipping duplicate command '{}'",
                    command.name
                );
                continue;
            }
            commands.push(command);
        }

        Self { commands }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Entries whose name contains `needle`, ignoring case, in registry order.
    pub fn filter(&self, needle: &str) -> Vec<Command> {
        let needle = needle.to_lowercase();
        self.commands
            .iter()
            .filter(|c| c.matches_lowercase(&needle))
            .cloned()
            .collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_builtins(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_holds_builtins_in_order() {
        let registry = CommandRegistry::default();
        let names: Vec<_> = registry.commands().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["/producer", "/standard"]);
    }

    #[test]
    fn extras_follow_builtins_and_duplicates_are_skipped() {
        let registry = CommandRegistry::with_builtins(vec![
            Command::new("/mix", "Mix down"),
            Command::new("/producer", "Shadowed"),
            Command::new("tempo", "Missing slash"),
        ]);
        let names: Vec<_> = registry.commands().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["/producer", "/standard", "/mix"]);
        assert_eq!(registry.commands()[0].description, "Toggle Producer Mode");
    }

    #[test]
    fn filter_is_case_insensitive_and_unanchored() {
        let registry = CommandRegistry::default();
        assert_eq!(registry.filter("PROD").len(), 1);
        assert_eq!(registry.filter("dar").len(), 1);
        assert_eq!(registry.filter("d").len(), 2);
        assert!(registry.filter("xyz").is_empty());
    }
}
