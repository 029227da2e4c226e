//! Turning a conversation log into something a person can read.

use crate::conversation::{ConversationLog, Message, Role};

/// Pure rendering of a log. Front ends implement this; the controller never calls it.
pub trait ViewRenderer {
    fn render_message(&self, message: &Message) -> String;

    fn render(&self, log: &ConversationLog) -> String {
        log.iter()
            .map(|m| self.render_message(m))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Plain-text transcript for terminals: `You: ...` / `Bot: ...`.
#[derive(Debug, Clone)]
pub struct TranscriptRenderer {
    pub user_label: String,
    pub assistant_label: String,
}

impl Default for TranscriptRenderer {
    fn default() -> Self {
        Self {
            user_label: "You".to_string(),
            assistant_label: "Bot".to_string(),
        }
    }
}

impl ViewRenderer for TranscriptRenderer {
    fn render_message(&self, message: &Message) -> String {
        let label = match message.role {
            Role::User => &self.user_label,
            Role::Assistant => &self.assistant_label,
        };
        let marker = if message.is_error { " [!]" } else { "" };

        // Multi-line replies (tables, JSON) stay aligned under the label.
        let indent = " ".repeat(label.len() + marker.len() + 2);
        let body = message.text.lines().collect::<Vec<_>>().join(&format!("\n{indent}"));

        format!("{label}{marker}: {body}")
    }
}
