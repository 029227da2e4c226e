//! Interpreting backend JSON according to a [`BackendProfile`].

use serde_json::Value;

use crate::conversation::ConversationLog;
use crate::error::SendError;
use crate::profile::{BackendProfile, HistoryEndpoint, ThreadEndpoints};
use crate::session::{ThreadSummary, UserProfile, UserId};

/// Follow a dotted path (`result.description`) into a JSON value.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(value, |current, key| current.get(key))
        .filter(|v| !v.is_null())
}

/// Render a JSON value as display text: strings verbatim, everything else pretty.
pub fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Error message carried in a payload, if any.
pub fn error_message(profile: &BackendProfile, payload: &Value) -> Option<String> {
    lookup(payload, &profile.error_field).map(display_text)
}

/// Pull the reply text out of a 2xx payload.
///
/// A payload carrying the error field is a server error even on 2xx.
pub fn extract_reply(profile: &BackendProfile, payload: &Value) -> Result<String, SendError> {
    if let Some(reply) = lookup(payload, &profile.reply_field) {
        return Ok(display_text(reply));
    }

    if let Some(message) = error_message(profile, payload) {
        return Err(SendError::Server {
            status: None,
            message,
        });
    }

    Err(SendError::MalformedResponse(format!(
        "missing '{}' field",
        profile.reply_field
    )))
}

/// Replay a history payload into a fresh log, keeping server order.
pub fn parse_history(
    endpoint: &HistoryEndpoint,
    payload: &Value,
) -> Result<ConversationLog, SendError> {
    let entries = lookup(payload, &endpoint.list_field)
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SendError::MalformedResponse(format!("missing '{}' list", endpoint.list_field))
        })?;

    let mut pairs = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let message = lookup(entry, &endpoint.message_field);
        let response = lookup(entry, &endpoint.response_field);
        match (message, response) {
            (Some(message), Some(response)) => {
                pairs.push((display_text(message), display_text(response)))
            }
            _ => {
                return Err(SendError::MalformedResponse(format!(
                    "history entry {} lacks '{}' or '{}'",
                    index, endpoint.message_field, endpoint.response_field
                )))
            }
        }
    }

    Ok(ConversationLog::from_pairs(pairs))
}

fn thread_from(entry: &Value, id_field: &str, name_field: &str) -> Option<ThreadSummary> {
    let id = lookup(entry, id_field).map(display_text)?;
    let name = lookup(entry, name_field)
        .map(display_text)
        .unwrap_or_else(|| id.clone());
    let created_at = lookup(entry, "created_at").map(display_text);

    Some(ThreadSummary {
        id: id.as_str().into(),
        name,
        created_at,
    })
}

pub fn parse_thread_list(
    endpoints: &ThreadEndpoints,
    payload: &Value,
) -> Result<Vec<ThreadSummary>, SendError> {
    // Backends answer an unknown user with an empty object rather than an empty list.
    let Some(entries) = lookup(payload, &endpoints.list_field) else {
        return Ok(Vec::new());
    };
    let entries = entries.as_array().ok_or_else(|| {
        SendError::MalformedResponse(format!("'{}' is not a list", endpoints.list_field))
    })?;

    entries
        .iter()
        .map(|entry| {
            thread_from(entry, &endpoints.id_field, &endpoints.name_field).ok_or_else(|| {
                SendError::MalformedResponse(format!(
                    "thread entry lacks '{}'",
                    endpoints.id_field
                ))
            })
        })
        .collect()
}

pub fn parse_created_thread(
    endpoints: &ThreadEndpoints,
    payload: &Value,
) -> Result<ThreadSummary, SendError> {
    thread_from(payload, &endpoints.created_id_field, &endpoints.name_field).ok_or_else(|| {
        SendError::MalformedResponse(format!("missing '{}' field", endpoints.created_id_field))
    })
}

/// Read `{user_id, name}` from a login response.
pub fn parse_login(payload: &Value) -> Result<UserProfile, SendError> {
    let user_id = lookup(payload, "user_id")
        .and_then(Value::as_str)
        .ok_or_else(|| SendError::MalformedResponse("missing 'user_id' field".to_string()))?;
    let name = lookup(payload, "name")
        .and_then(Value::as_str)
        .unwrap_or(user_id);

    Ok(UserProfile {
        user_id: UserId(user_id.to_string()),
        name: name.to_string(),
    })
}
