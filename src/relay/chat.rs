//! Conversational relay: one fresh thread per question, first assistant text back.

use crate::config::Config;
use crate::platform::{AssistantPlatform, ThreadMessage};
use crate::relay::error::RelayError;
use serde_json::Value;

/// Extract `user_input` from a raw JSON body.
///
/// Bodies that are not a JSON object fail as [`RelayError::Internal`]; an absent, non-string,
/// or empty field fails as [`RelayError::MissingInput`].
pub fn parse_question(body: &[u8]) -> Result<String, RelayError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|err| RelayError::Internal(err.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| RelayError::Internal("request body must be a JSON object".into()))?;

    match object.get("user_input").and_then(Value::as_str) {
        Some(question) if !question.is_empty() => Ok(question.to_string()),
        _ => Err(RelayError::MissingInput),
    }
}

/// First text part of the first assistant-authored message, in provider order.
pub fn first_assistant_reply(messages: &[ThreadMessage]) -> Option<String> {
    messages
        .iter()
        .filter(|message| message.is_assistant())
        .find_map(|message| message.first_text().map(str::to_string))
}

/// Ask the configured agent `question` on a new thread and return its reply.
pub async fn relay_question<P>(
    platform: &P,
    config: &Config,
    question: &str,
) -> Result<String, RelayError>
where
    P: AssistantPlatform + ?Sized,
{
    let thread = platform.create_thread().await?;
    platform.create_message(&thread.id, question).await?;

    let run = platform
        .create_and_poll_run(&thread.id, &config.knowledge_agent_id)
        .await?;
    if !run.is_completed() {
        tracing::warn!(
            thread_id = %thread.id,
            run_id = %run.id,
            status = %run.status,
            last_error = ?run.last_error,
            "Agent run did not complete"
        );
        return Err(RelayError::AgentFailed(run.status));
    }

    let messages = platform.list_messages(&thread.id).await?;
    let reply = first_assistant_reply(&messages).ok_or(RelayError::NoReply)?;
    tracing::info!(thread_id = %thread.id, run_id = %run.id, "Agent replied");
    Ok(reply)
}
