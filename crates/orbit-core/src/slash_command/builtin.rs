//! Builtin slash commands provided by the system.
//!
//! These commands are always available and cannot be modified by users.
//! They are loaded once at startup and cached for the lifetime of the application.

use serde::Serialize;
use std::sync::OnceLock;

use super::model::Command;

/// A builtin slash command provided by the system.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltinCommand {
    /// Command name (with the leading /)
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
}

impl BuiltinCommand {
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }
}

impl From<&BuiltinCommand> for Command {
    fn from(builtin: &BuiltinCommand) -> Self {
        Command::new(builtin.name, builtin.description)
    }
}

/// Static storage for builtin commands (initialized once).
static BUILTIN_COMMANDS: OnceLock<Vec<BuiltinCommand>> = OnceLock::new();

/// Returns a reference to all builtin slash commands, in palette order.
pub fn builtin_commands() -> &'static [BuiltinCommand] {
    BUILTIN_COMMANDS.get_or_init(|| {
        vec![
            BuiltinCommand::new("/producer", "Toggle Producer Mode"),
            BuiltinCommand::new("/standard", "Toggle Standard Mode"),
        ]
    })
}
