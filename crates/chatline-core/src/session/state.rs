//! Identity of the active conversation.

use serde::{Deserialize, Serialize};

/// Opaque identifier of a session or thread, as issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque identifier of the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    /// Derive a user id from an email address the way the simulated login does:
    /// the first `@` and the first `.` both become `_`.
    pub fn from_email(email: &str) -> Self {
        Self(email.replacen('@', "_", 1).replacen('.', "_", 1))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The logical conversation the controller is currently bound to.
///
/// Both ids are optional: stateless backends need neither, user-scoped
/// backends only need `user_id`, threaded backends need both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Active thread/session id
    pub session_id: Option<SessionId>,

    /// Logged-in user
    pub user_id: Option<UserId>,
}

impl Session {
    pub fn new(session_id: Option<SessionId>, user_id: Option<UserId>) -> Self {
        Self {
            session_id,
            user_id,
        }
    }

    /// Same user, different thread.
    pub fn with_session(&self, session_id: Option<SessionId>) -> Self {
        Self {
            session_id,
            user_id: self.user_id.clone(),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.user_id.is_some()
    }
}
