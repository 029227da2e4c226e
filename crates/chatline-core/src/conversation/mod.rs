//! In-memory conversation record.
//!
//! The log is append-only from the outside: only the controller can push
//! or clear, everyone else reads a snapshot.

mod message;

pub use message::{Message, Role};

use serde::Serialize;

/// Ordered messages of one session, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from `{message, response}` pairs, user first in each pair.
    pub fn from_pairs<I, M, R>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (M, R)>,
        M: Into<String>,
        R: Into<String>,
    {
        let mut log = Self::new();
        for (message, response) in pairs {
            log.push(Message::user(message));
            log.push(Message::assistant(response));
        }
        log
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// `(role, text)` view, handy for assertions and plain rendering.
    pub fn entries(&self) -> Vec<(Role, &str)> {
        self.messages
            .iter()
            .map(|m| (m.role, m.text.as_str()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ConversationLog {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
