//! Slash command definitions and the command palette.
//!
//! Commands are static palette entries: a fixed set of builtins plus any
//! extras from the config file. The palette filters them as the user types a
//! `/`-prefixed input and commits the chosen one.

pub mod autocomplete;
pub mod builtin;
pub mod model;
pub mod registry;

pub use autocomplete::{Autocomplete, PaletteAction, PaletteKey, PaletteState};
pub use builtin::{builtin_commands, BuiltinCommand};
pub use model::Command;
pub use registry::CommandRegistry;
