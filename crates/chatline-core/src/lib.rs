//! # chatline-core
//!
//! Client-side session logic for simple JSON chat backends.
//!
//! This crate is front-end agnostic and can be used by:
//! - the `chatline` terminal client
//! - any UI that renders a [`ConversationLog`]
//!
//! ## Key Concepts
//!
//! - **Session**: which conversation (thread) and user the client is bound to
//! - **ConversationLog**: ordered user/assistant messages for the active session
//! - **BackendProfile**: paths and field names of one backend variant
//! - **ChatEvent**: log and session changes, broadcast to subscribers

pub mod conversation;
pub mod error;
pub mod event_bus;
pub mod logging;
pub mod paths;
pub mod payload;
pub mod profile;
pub mod render;
pub mod session;
pub mod transport;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use conversation::{ConversationLog, Message, Role};
pub use error::SendError;
pub use event_bus::{ChatEvent, EventBus};
pub use profile::{BackendProfile, Preset};
pub use render::{TranscriptRenderer, ViewRenderer};
pub use session::{ChatSessionController, Reply, Session, SessionId, ThreadSummary, UserId, UserProfile};
pub use transport::{ChatTransport, HttpTransport};
