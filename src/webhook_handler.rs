use crate::errors::AppError;
use crate::handlers::AppState;
use crate::webhook_models::{ChatPayload, ChatWebhookResponse, InboundMessage, OutboundReply};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;

/// Chat Webhook Handler
///
/// Receives messages from the chat transport, runs each one through the command
/// engine and answers with the replies to deliver.
///
/// Expected payload: single message object OR array of messages
/// Authentication: X-Webhook-Token header must match WEBHOOK_SECRET env var
pub async fn chat_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<ChatPayload>,
) -> Result<(StatusCode, Json<ChatWebhookResponse>), AppError> {
    validate_webhook_secret(&state, &headers)?;

    let messages = payload.into_messages();
    let total_received = messages.len();
    tracing::info!("Received {} chat message(s)", total_received);

    let mut replies = Vec::new();
    let mut ignored = 0;
    let mut duplicates = 0;

    // Messages of one batch run in order; each on its own task.
    for message in messages {
        match process_message(&state, message).await {
            ProcessResult::Replied(reply) => replies.push(reply),
            ProcessResult::Ignored => ignored += 1,
            ProcessResult::Duplicate => {
                duplicates += 1;
                tracing::debug!("Skipped redelivered chat message");
            }
        }
    }

    tracing::info!(
        "Chat webhook complete: {} received, {} replied, {} ignored, {} duplicates",
        total_received,
        replies.len(),
        ignored,
        duplicates
    );

    Ok((
        StatusCode::OK,
        Json(ChatWebhookResponse {
            status: "processed".to_string(),
            received: total_received,
            replied: replies.len(),
            ignored,
            duplicates,
            replies,
        }),
    ))
}

/// Validate webhook secret from X-Webhook-Token header
fn validate_webhook_secret(state: &AppState, headers: &HeaderMap) -> Result<(), AppError> {
    // Unset secret means open webhook (warned at startup)
    let Some(ref expected_secret) = state.config.webhook_secret else {
        return Ok(());
    };

    let token = headers
        .get("X-Webhook-Token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing X-Webhook-Token header".to_string()))?;

    if !constant_time_compare(token, expected_secret) {
        tracing::warn!("Invalid webhook token received");
        return Err(AppError::Unauthorized("Invalid webhook token".to_string()));
    }

    Ok(())
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.as_bytes()
        .iter()
        .zip(b.as_bytes().iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

#[derive(Debug)]
enum ProcessResult {
    Replied(OutboundReply),
    Ignored,
    Duplicate,
}

async fn process_message(state: &AppState, message: InboundMessage) -> ProcessResult {
    if let Some(fingerprint) = message.fingerprint() {
        let entry = state
            .seen_messages
            .entry(fingerprint)
            .or_insert_with(async { chrono::Utc::now().timestamp() })
            .await;
        if !entry.is_fresh() {
            return ProcessResult::Duplicate;
        }
    }

    let InboundMessage {
        channel_id,
        text,
        message_id,
    } = message;

    match state
        .dispatcher
        .clone()
        .handle_isolated(text, channel_id.clone())
        .await
    {
        Some(text) => ProcessResult::Replied(OutboundReply {
            channel_id,
            message_id,
            text,
        }),
        None => ProcessResult::Ignored,
    }
}
