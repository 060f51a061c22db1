//! Application layer for Orbit.
//!
//! Coordinates the domain types of `orbit-core` into the streaming session
//! manager: submitting queries, wiring the backend's event channels into the
//! conversation history, and routing input between the command palette, the
//! mode switcher and the controller.

pub mod input_router;
pub mod session;

pub use input_router::{InputRouter, RouteOutcome};
pub use session::{QueryController, ResetReason, SessionView, SubmitOutcome};
