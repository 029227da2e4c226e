//! Session identity and the controller that drives a conversation.
//!
//! A session is one logical conversation (a thread, or the implicit
//! single conversation of a stateless backend). The controller owns the
//! active session and its log; switching sessions makes any in-flight
//! result stale.

mod controller;
mod state;

pub use controller::{ChatSessionController, Reply, ThreadSummary, UserProfile};
pub use state::{Session, SessionId, UserId};
