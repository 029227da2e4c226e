//! Backend profiles: how one chat backend names its paths and fields.
//!
//! Every demo backend speaks the same request/response pattern with slightly
//! different names (`message` vs `query`, `thread_id` vs `user_id`,
//! `response` vs `result`). A [`BackendProfile`] captures those names so the
//! controller never hardcodes a variant.
//!
//! Profiles are stored as pretty JSON with camelCase keys:
//!
//! ```text
//! ~/.config/chatline/
//! └── profile.json
//! ```

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::SendError;
use crate::session::Session;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_ERROR_TEXT: &str = "Error connecting to server";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const PROFILE_FILE: &str = "profile.json";

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error("Unknown preset: {0}")]
    UnknownPreset(String),
}

/// Where to fetch prior `{message, response}` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryEndpoint {
    /// Path template, e.g. `/threads/{session}/messages`.
    pub path: String,
    pub list_field: String,
    pub message_field: String,
    pub response_field: String,
}

impl Default for HistoryEndpoint {
    fn default() -> Self {
        Self {
            path: "/threads/{session}/messages".to_string(),
            list_field: "messages".to_string(),
            message_field: "message".to_string(),
            response_field: "response".to_string(),
        }
    }
}

/// Thread CRUD endpoints for threaded backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadEndpoints {
    pub list_path: String,
    pub list_field: String,
    pub create_path: String,
    /// Template for rename (PUT) and delete (DELETE); `{session}` is the thread id.
    pub item_path: String,
    /// Id field in list entries.
    pub id_field: String,
    /// Id field in the create response.
    pub created_id_field: String,
    pub name_field: String,
}

impl Default for ThreadEndpoints {
    fn default() -> Self {
        Self {
            list_path: "/threads/{user}".to_string(),
            list_field: "threads".to_string(),
            create_path: "/threads".to_string(),
            item_path: "/threads/{session}".to_string(),
            id_field: "id".to_string(),
            created_id_field: "thread_id".to_string(),
            name_field: "name".to_string(),
        }
    }
}

/// Field and path mapping for one backend variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendProfile {
    pub name: String,
    pub base_url: String,
    pub chat_path: String,

    /// Request field carrying the user's text.
    pub message_field: String,

    /// Request field carrying the session/thread id, if the backend wants one.
    pub session_param: Option<String>,

    /// Request field carrying the user id, if the backend wants one.
    pub user_param: Option<String>,

    /// Response field holding the reply. Dotted paths reach into objects.
    pub reply_field: String,

    pub error_field: String,

    /// Text shown in the log when a request fails.
    pub error_text: String,

    pub timeout_ms: u64,

    /// Reject `submit` until a thread is selected.
    pub requires_session: bool,

    pub history: Option<HistoryEndpoint>,
    pub threads: Option<ThreadEndpoints>,
    pub login_path: Option<String>,
    pub health_path: Option<String>,
}

impl Default for BackendProfile {
    fn default() -> Self {
        Self {
            name: "basic".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            chat_path: "/chat".to_string(),
            message_field: "message".to_string(),
            session_param: None,
            user_param: None,
            reply_field: "response".to_string(),
            error_field: "error".to_string(),
            error_text: DEFAULT_ERROR_TEXT.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            requires_session: false,
            history: None,
            threads: None,
            login_path: None,
            health_path: None,
        }
    }
}

/// Built-in profiles matching the known backend variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// Stateless `/chat`, `message` -> `response`.
    Basic,
    /// Server-side login, per-user history.
    UserHistory,
    /// Thread CRUD, per-thread history, thread id on every send.
    Threaded,
    /// Agent `/act` endpoint taking `query`; the answer is `result.final_answer`.
    Agent,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Basic,
        Preset::UserHistory,
        Preset::Threaded,
        Preset::Agent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Basic => "basic",
            Preset::UserHistory => "user-history",
            Preset::Threaded => "threaded",
            Preset::Agent => "agent",
        }
    }

    pub fn profile(&self, base_url: &str) -> BackendProfile {
        let base = BackendProfile {
            name: self.as_str().to_string(),
            base_url: base_url.to_string(),
            health_path: Some("/health".to_string()),
            ..BackendProfile::default()
        };

        match self {
            Preset::Basic => base,
            Preset::UserHistory => BackendProfile {
                user_param: Some("user_id".to_string()),
                login_path: Some("/login".to_string()),
                history: Some(HistoryEndpoint {
                    path: "/chat-history/{user}".to_string(),
                    list_field: "chats".to_string(),
                    ..HistoryEndpoint::default()
                }),
                ..base
            },
            Preset::Threaded => BackendProfile {
                session_param: Some("thread_id".to_string()),
                requires_session: true,
                history: Some(HistoryEndpoint::default()),
                threads: Some(ThreadEndpoints::default()),
                ..base
            },
            Preset::Agent => BackendProfile {
                chat_path: "/act".to_string(),
                message_field: "query".to_string(),
                reply_field: "result.final_answer".to_string(),
                health_path: None,
                ..base
            },
        }
    }
}

impl FromStr for Preset {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ProfileError::UnknownPreset(s.to_string()))
    }
}

impl BackendProfile {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Expand `{session}` and `{user}` placeholders from the active session.
    pub fn expand_path(&self, template: &str, session: &Session) -> Result<String, SendError> {
        let mut path = template.to_string();

        if path.contains("{session}") {
            let id = session
                .session_id
                .as_ref()
                .ok_or(SendError::NoActiveSession)?;
            path = path.replace("{session}", id.as_str());
        }

        if path.contains("{user}") {
            let id = session.user_id.as_ref().ok_or(SendError::NotLoggedIn)?;
            path = path.replace("{user}", id.as_str());
        }

        Ok(path)
    }

    /// Build the chat request body for `text` in `session`.
    pub fn chat_body(&self, text: &str, session: &Session) -> serde_json::Value {
        let mut body = serde_json::Map::new();
        body.insert(self.message_field.clone(), text.into());

        if let (Some(param), Some(id)) = (&self.session_param, &session.session_id) {
            body.insert(param.clone(), id.as_str().into());
        }
        if let (Some(param), Some(id)) = (&self.user_param, &session.user_id) {
            body.insert(param.clone(), id.as_str().into());
        }

        serde_json::Value::Object(body)
    }
}

/// Save a profile to `{dir}/profile.json` (write-then-rename).
pub fn save_profile(dir: &Path, profile: &BackendProfile) -> Result<(), ProfileError> {
    fs::create_dir_all(dir)?;

    let file_path = dir.join(PROFILE_FILE);
    let temp_path = dir.join(format!("{PROFILE_FILE}.tmp"));

    let json = serde_json::to_string_pretty(profile)?;
    fs::write(&temp_path, &json)?;
    fs::rename(&temp_path, &file_path)?;

    Ok(())
}

/// Load a profile from a JSON file. Missing keys fall back to the basic defaults.
pub fn load_profile_file(path: &Path) -> Result<BackendProfile, ProfileError> {
    if !path.exists() {
        return Err(ProfileError::NotFound(path.display().to_string()));
    }

    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Load `{dir}/profile.json`.
pub fn load_profile(dir: &Path) -> Result<BackendProfile, ProfileError> {
    load_profile_file(&dir.join(PROFILE_FILE))
}
