//! ChatSessionController - one conversation against one backend.
//!
//! State per session: `Idle -> Sending -> Idle`. A submit while `Sending`
//! is rejected with `Busy`. Replacing the session (switch, login, logout,
//! deleting the active thread) bumps an epoch; a request that completes
//! under an older epoch is dropped instead of touching the new log.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::state::{Session, SessionId, UserId};
use crate::conversation::{ConversationLog, Message};
use crate::error::SendError;
use crate::event_bus::{ChatEvent, EventBus};
use crate::logging::{disabled, log_line, open_log_file, LogHandle};
use crate::payload::{
    error_message, extract_reply, lookup, parse_created_thread, parse_history, parse_login,
    parse_thread_list,
};
use crate::profile::BackendProfile;
use crate::transport::{ApiRequest, ChatTransport, HttpTransport};

/// A successful answer to `submit`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    /// Text appended to the log.
    pub text: String,
    /// The full response, for front ends that render more than text.
    pub payload: Value,
}

/// A thread as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadSummary {
    pub id: SessionId,
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Who is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: UserId,
    pub name: String,
}

struct ControllerState {
    session: Session,
    log: ConversationLog,
    /// Bumped whenever `session` is replaced.
    epoch: u64,
    /// A request is in flight for the current epoch.
    pending: bool,
    wire_log: LogHandle,
}

/// Owns the active session and its log, and talks to the backend.
pub struct ChatSessionController {
    profile: BackendProfile,
    transport: Arc<dyn ChatTransport>,
    state: Mutex<ControllerState>,
    event_bus: Option<Arc<EventBus>>,
    log_dir: Option<PathBuf>,
}

/// Clears the pending flag if a request future is dropped mid-flight.
struct PendingSlot<'a> {
    controller: &'a ChatSessionController,
    epoch: u64,
    armed: bool,
}

impl PendingSlot<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingSlot<'_> {
    fn drop(&mut self) {
        if self.armed {
            let mut state = self.controller.state();
            if state.epoch == self.epoch {
                state.pending = false;
            }
        }
    }
}

impl ChatSessionController {
    pub fn new(profile: BackendProfile, transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            profile,
            transport,
            state: Mutex::new(ControllerState {
                session: Session::default(),
                log: ConversationLog::new(),
                epoch: 0,
                pending: false,
                wire_log: disabled(),
            }),
            event_bus: None,
            log_dir: None,
        }
    }

    /// Controller talking HTTP to `profile.base_url`.
    pub fn with_http(profile: BackendProfile) -> Self {
        let transport = Arc::new(HttpTransport::from_profile(&profile));
        Self::new(profile, transport)
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Write a wire log per session under `dir`.
    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        let handle = self.open_wire_log(&Session::default());
        self.state().wire_log = handle;
        self
    }

    pub fn profile(&self) -> &BackendProfile {
        &self.profile
    }

    /// Copy of the active log.
    pub fn snapshot(&self) -> ConversationLog {
        self.state().log.clone()
    }

    pub fn session(&self) -> Session {
        self.state().session.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state().pending
    }

    // ------------------------------------------------------------------
    // Conversation
    // ------------------------------------------------------------------

    /// Send `text` and append the exchange to the log.
    ///
    /// Returns `Ok(None)` for blank input. The user message is appended
    /// before the request goes out; an assistant message (the reply, or the
    /// profile's error text) is appended when it resolves.
    pub async fn submit(&self, text: &str) -> Result<Option<Reply>, SendError> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let (slot, request) = {
            let mut state = self.state();
            if self.profile.requires_session && state.session.session_id.is_none() {
                return Err(SendError::NoActiveSession);
            }
            if state.pending {
                return Err(SendError::Busy);
            }

            let path = self
                .profile
                .expand_path(&self.profile.chat_path, &state.session)?;
            let body = self.profile.chat_body(text, &state.session);

            state.pending = true;
            self.append(&mut state, Message::user(text));
            (self.slot(state.epoch), ApiRequest::post(path, body))
        };

        let outcome = self.dispatch(request).await.and_then(|payload| {
            let text = extract_reply(&self.profile, &payload)?;
            Ok(Reply { text, payload })
        });

        let epoch = slot.epoch;
        slot.disarm();

        let mut state = self.state();
        if state.epoch != epoch {
            log::debug!("Dropping reply for a superseded session");
            return Err(SendError::Superseded);
        }
        state.pending = false;

        match outcome {
            Ok(reply) => {
                self.append(&mut state, Message::assistant(reply.text.clone()));
                Ok(Some(reply))
            }
            Err(e) => {
                log::warn!("Chat request failed: {}", e);
                if e.is_remote() {
                    self.append(&mut state, Message::error(self.profile.error_text.clone()));
                }
                Err(e)
            }
        }
    }

    /// Make `session_id` the active session (same user) and clear the log.
    ///
    /// An in-flight request for the previous session is never applied.
    pub fn switch_session(&self, session_id: SessionId) {
        let mut state = self.state();
        let session = state.session.with_session(Some(session_id));
        self.replace_session(&mut state, session);
    }

    /// Switch to `session_id` and replay its history into the log.
    pub async fn load_history(&self, session_id: SessionId) -> Result<ConversationLog, SendError> {
        {
            let mut state = self.state();
            let same = state.session.session_id.as_ref() == Some(&session_id);
            if same && state.pending {
                return Err(SendError::Busy);
            }
            let session = state.session.with_session(Some(session_id));
            self.replace_session(&mut state, session);
        }
        self.reload_history().await
    }

    /// Replace the log with the backend's history for the active session.
    ///
    /// Failures leave the log as it was.
    pub async fn reload_history(&self) -> Result<ConversationLog, SendError> {
        let endpoint = self
            .profile
            .history
            .as_ref()
            .ok_or(SendError::Unsupported("history"))?;

        let (slot, request) = {
            let mut state = self.state();
            if state.pending {
                return Err(SendError::Busy);
            }
            let path = self.profile.expand_path(&endpoint.path, &state.session)?;
            state.pending = true;
            (self.slot(state.epoch), ApiRequest::get(path))
        };

        let outcome = self
            .dispatch(request)
            .await
            .and_then(|payload| parse_history(endpoint, &payload));

        let epoch = slot.epoch;
        slot.disarm();

        let mut state = self.state();
        if state.epoch != epoch {
            log::debug!("Dropping history for a superseded session");
            return Err(SendError::Superseded);
        }
        state.pending = false;

        let history = outcome.inspect_err(|e| log::warn!("Loading history failed: {}", e))?;
        log::debug!(
            "Loaded {} messages for session {:?}",
            history.len(),
            state.session.session_id
        );

        if !state.log.is_empty() {
            state.log.clear();
            self.emit(ChatEvent::LogCleared);
        }
        for message in history.iter().cloned() {
            self.append(&mut state, message);
        }
        Ok(state.log.clone())
    }

    // ------------------------------------------------------------------
    // Account
    // ------------------------------------------------------------------

    /// Log in by email and start with no thread selected.
    ///
    /// Without a login endpoint the user id is derived locally from the email.
    pub async fn login(&self, email: &str) -> Result<UserProfile, SendError> {
        let email = email.trim();
        if email.is_empty() {
            return Err(SendError::NotLoggedIn);
        }

        let user = match &self.profile.login_path {
            Some(path) => {
                let payload = self
                    .dispatch(ApiRequest::post(
                        path.clone(),
                        serde_json::json!({ "email": email }),
                    ))
                    .await?;
                if let Some(message) = error_message(&self.profile, &payload) {
                    return Err(SendError::Server {
                        status: None,
                        message,
                    });
                }
                parse_login(&payload)?
            }
            None => UserProfile {
                user_id: UserId::from_email(email),
                name: email.split('@').next().unwrap_or(email).to_string(),
            },
        };

        log::info!("Logged in as {}", user.user_id);
        let mut state = self.state();
        self.replace_session(&mut state, Session::new(None, Some(user.user_id.clone())));
        Ok(user)
    }

    /// Forget user, session and log.
    pub fn logout(&self) {
        let mut state = self.state();
        self.replace_session(&mut state, Session::default());
    }

    pub async fn check_health(&self) -> Result<bool, SendError> {
        let path = self
            .profile
            .health_path
            .clone()
            .ok_or(SendError::Unsupported("health checks"))?;
        let payload = self.dispatch(ApiRequest::get(path)).await?;
        Ok(lookup(&payload, "status").and_then(Value::as_str) == Some("ok"))
    }

    // ------------------------------------------------------------------
    // Threads
    // ------------------------------------------------------------------

    pub async fn list_threads(&self) -> Result<Vec<ThreadSummary>, SendError> {
        let endpoints = self
            .profile
            .threads
            .as_ref()
            .ok_or(SendError::Unsupported("threads"))?;
        let path = {
            let state = self.state();
            self.profile.expand_path(&endpoints.list_path, &state.session)?
        };

        let payload = self.dispatch(ApiRequest::get(path)).await?;
        parse_thread_list(endpoints, &payload)
    }

    /// Create a thread for the logged-in user and make it active.
    pub async fn create_thread(&self) -> Result<ThreadSummary, SendError> {
        let endpoints = self
            .profile
            .threads
            .as_ref()
            .ok_or(SendError::Unsupported("threads"))?;
        let (epoch, path, body) = {
            let state = self.state();
            let user_id = state.session.user_id.as_ref().ok_or(SendError::NotLoggedIn)?;
            let field = self.profile.user_param.as_deref().unwrap_or("user_id");
            (
                state.epoch,
                self.profile
                    .expand_path(&endpoints.create_path, &state.session)?,
                serde_json::json!({ field: user_id.as_str() }),
            )
        };

        let outcome = self
            .dispatch(ApiRequest::post(path, body))
            .await
            .and_then(|payload| parse_created_thread(endpoints, &payload));

        let mut state = self.state();
        if state.epoch != epoch {
            log::debug!("Dropping created thread for a superseded session");
            return Err(SendError::Superseded);
        }

        let thread = outcome?;
        log::debug!("Created thread {}", thread.id);

        let session = state.session.with_session(Some(thread.id.clone()));
        self.replace_session(&mut state, session);
        Ok(thread)
    }

    /// Rename a thread. Blank names are ignored.
    pub async fn rename_thread(&self, thread_id: &SessionId, name: &str) -> Result<(), SendError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }

        let endpoints = self
            .profile
            .threads
            .as_ref()
            .ok_or(SendError::Unsupported("threads"))?;
        let path = self.thread_path(&endpoints.item_path, thread_id)?;
        let body = serde_json::json!({ endpoints.name_field.as_str(): name });

        let payload = self.dispatch(ApiRequest::put(path, body)).await?;
        match error_message(&self.profile, &payload) {
            Some(message) => Err(SendError::Server {
                status: None,
                message,
            }),
            None => Ok(()),
        }
    }

    /// Delete a thread. Deleting the active thread leaves no thread selected.
    pub async fn delete_thread(&self, thread_id: &SessionId) -> Result<(), SendError> {
        let endpoints = self
            .profile
            .threads
            .as_ref()
            .ok_or(SendError::Unsupported("threads"))?;
        let path = self.thread_path(&endpoints.item_path, thread_id)?;

        let payload = self.dispatch(ApiRequest::delete(path)).await?;
        if let Some(message) = error_message(&self.profile, &payload) {
            return Err(SendError::Server {
                status: None,
                message,
            });
        }

        let mut state = self.state();
        if state.session.session_id.as_ref() == Some(thread_id) {
            let session = state.session.with_session(None);
            self.replace_session(&mut state, session);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn slot(&self, epoch: u64) -> PendingSlot<'_> {
        PendingSlot {
            controller: self,
            epoch,
            armed: true,
        }
    }

    fn emit(&self, event: ChatEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit(event);
        }
    }

    fn append(&self, state: &mut ControllerState, message: Message) {
        state.log.push(message.clone());
        self.emit(ChatEvent::MessageAppended {
            session_id: state.session.session_id.clone(),
            message,
        });
    }

    fn replace_session(&self, state: &mut ControllerState, session: Session) {
        if state.pending {
            log::debug!("Session replaced with a request in flight; its result will be dropped");
        }
        state.epoch += 1;
        state.pending = false;
        state.session = session;
        state.log.clear();
        state.wire_log = self.open_wire_log(&state.session);

        self.emit(ChatEvent::SessionChanged {
            session: state.session.clone(),
        });
        self.emit(ChatEvent::LogCleared);
    }

    fn open_wire_log(&self, session: &Session) -> LogHandle {
        let log_id = session
            .session_id
            .as_ref()
            .map(|id| id.as_str())
            .or_else(|| session.user_id.as_ref().map(|id| id.as_str()))
            .unwrap_or("default");
        open_log_file(self.log_dir.as_deref(), log_id)
    }

    fn thread_path(&self, template: &str, thread_id: &SessionId) -> Result<String, SendError> {
        let state = self.state();
        let session = state.session.with_session(Some(thread_id.clone()));
        self.profile.expand_path(template, &session)
    }

    /// Run one request on the blocking pool, bounded by the profile timeout.
    async fn dispatch(&self, request: ApiRequest) -> Result<Value, SendError> {
        let wire_log = Arc::clone(&self.state().wire_log);
        let label = request.to_string();
        match &request.body {
            Some(body) => log_line(&wire_log, "REQUEST", &format!("{label} {body}")),
            None => log_line(&wire_log, "REQUEST", &label),
        }
        log::debug!("-> {}", label);

        let transport = Arc::clone(&self.transport);
        let call = tokio::task::spawn_blocking(move || transport.send(&request));
        let timeout = self.profile.timeout();

        let result = match tokio::time::timeout(timeout, call).await {
            Err(_) => Err(SendError::Network(format!(
                "request timed out after {}ms",
                timeout.as_millis()
            ))),
            Ok(Err(e)) => Err(SendError::Network(format!("request task failed: {e}"))),
            Ok(Ok(result)) => result.map_err(|e| e.into_send_error(&self.profile)),
        };

        match &result {
            Ok(payload) => {
                log::debug!("<- {} ok", label);
                log_line(&wire_log, "RESPONSE", &payload.to_string());
            }
            Err(e) => {
                log::debug!("<- {} failed: {}", label, e);
                log_line(&wire_log, "ERROR", &e.to_string());
            }
        }
        result
    }
}
