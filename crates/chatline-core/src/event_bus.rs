//! Broadcast of controller changes to whoever is drawing the conversation.
//!
//! The controller never renders. Instead it publishes a [`ChatEvent`] for
//! every change to the active session or its log, and front ends (terminal,
//! web socket, tests) subscribe.
//!
//! # Example
//!
//! ```rust
//! use chatline_core::event_bus::{ChatEvent, EventBus};
//!
//! let bus = EventBus::new();
//! let _rx = bus.subscribe();
//!
//! bus.emit(ChatEvent::LogCleared);
//!
//! // In async context:
//! // let event = _rx.recv().await.unwrap();
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::conversation::Message;
use crate::session::{Session, SessionId};

/// Events beyond this capacity make slow subscribers lag.
const DEFAULT_CAPACITY: usize = 256;

/// A change published by the controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChatEvent {
    /// A message was appended to the active log.
    #[serde(rename_all = "camelCase")]
    MessageAppended {
        session_id: Option<SessionId>,
        message: Message,
    },

    /// The active session was replaced (switch, login, logout, thread deletion).
    SessionChanged { session: Session },

    /// The log was emptied.
    LogCleared,
}

impl ChatEvent {
    /// Wire name, for front ends that route on strings.
    pub fn event_type(&self) -> &'static str {
        match self {
            ChatEvent::MessageAppended { .. } => "chat:message",
            ChatEvent::SessionChanged { .. } => "chat:session",
            ChatEvent::LogCleared => "chat:cleared",
        }
    }
}

/// Fan-out of [`ChatEvent`]s over a tokio broadcast channel.
pub struct EventBus {
    sender: broadcast::Sender<ChatEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Returns how many subscribers got it (0 if none).
    pub fn emit(&self, event: ChatEvent) -> usize {
        log::trace!("emit {}", event.event_type());
        self.sender.send(event).unwrap_or(0)
    }

    /// Receive all future events. Past events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
