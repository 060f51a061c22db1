//! Streaming session services.
//!
//! - `subscription`: exactly-once release of a submission's listeners
//! - `subscriber`: per-submission state machine fed by the event channels
//! - `controller`: query submission, single-flight, resets, UI view

mod controller;
mod state;
mod subscriber;
mod subscription;


pub use controller::{ControllerOptions, QueryController, ResetReason, SubmitOutcome};
pub use state::SessionView;
pub use subscriber::{StreamSubscriber, SubscriberPhase};
pub use subscription::SubscriptionSet;
