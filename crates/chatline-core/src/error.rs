//! Error types for controller operations.

use thiserror::Error;

/// Why a controller operation did not produce a reply.
///
/// `Busy`, `NoActiveSession` and `NotLoggedIn` are local rejections and
/// leave the conversation log untouched. `Network`, `Server` and
/// `MalformedResponse` raised by `submit` are also written into the log
/// as an assistant-role error message. None of them is fatal to the
/// controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("A request is already pending for this session")]
    Busy,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error{}: {message}", http_status(.status))]
    Server {
        status: Option<u16>,
        message: String,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The session changed while the request was in flight; its result was dropped.
    #[error("Session changed before the response arrived")]
    Superseded,

    #[error("No session or thread is selected")]
    NoActiveSession,

    #[error("Not logged in")]
    NotLoggedIn,

    /// The backend profile has no endpoint for this operation.
    #[error("Backend does not support {0}")]
    Unsupported(&'static str),
}

fn http_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default()
}

impl SendError {
    /// Errors that come back from the backend (and get echoed into the log).
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            SendError::Network(_) | SendError::Server { .. } | SendError::MalformedResponse(_)
        )
    }
}
