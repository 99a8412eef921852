//! LINE Messaging API webhook receiver.
//!
//! LINE signs every delivery with HMAC-SHA256 over the raw request body,
//! base64-encoded in the `x-line-signature` header. Verification runs over
//! the exact bytes received, before any JSON parsing.
//!
//! Text messages either manage the sender's device binding (`id=<device>`)
//! or are forwarded to the bound device as an MQTT command. Every handled
//! event draws a text reply through the reply API; reply and publish
//! failures never fail the webhook response.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::publisher::DeviceCommand;
use crate::signature;
use crate::AppState;

type ApiError = (StatusCode, &'static str);

// ── Event model ─────────────────────────────────────────────────────────────

/// Webhook envelope. LINE delivers a batch of events per request.
#[derive(Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    events: Vec<serde_json::Value>,
}

/// A single webhook event. Anything that is not a message (follow, unfollow,
/// postback, ...) parses as `Other` and is skipped.
#[derive(Deserialize, Debug)]
#[serde(tag = "type", rename_all = "lowercase")]
enum InboundEvent {
    Message(MessageEvent),
    #[serde(other)]
    Other,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct MessageEvent {
    reply_token: String,
    source: EventSource,
    message: MessageBody,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct EventSource {
    user_id: String,
}

#[derive(Deserialize, Debug)]
struct MessageBody {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

// ── Routes ──────────────────────────────────────────────────────────────────

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/line/webhook", post(handle_webhook))
        .route("/", get(health))
}

/// Liveness probe. Answers regardless of configuration state.
async fn health() -> &'static str {
    "OK"
}

async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let provided = headers
        .get("x-line-signature")
        .and_then(|v| v.to_str().ok());

    if !signature::verify(&state.channel_secret, provided, &body) {
        warn!("Webhook rejected: signature missing or invalid");
        return Err((StatusCode::UNAUTHORIZED, "Bad signature"));
    }

    // Authenticated from here on: LINE expects 200 regardless of how the
    // individual events fare, otherwise it retries the whole batch.
    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(p) => p,
        Err(e) => {
            warn!("Webhook body did not parse as an event envelope: {e}");
            return Ok(StatusCode::OK);
        }
    };

    // Events run in batch order; a failing event never aborts the rest.
    for event in payload.events {
        match serde_json::from_value::<InboundEvent>(event) {
            Ok(InboundEvent::Message(message)) => handle_message(&state, message).await,
            Ok(InboundEvent::Other) => {}
            Err(e) => debug!("Skipping malformed event: {e}"),
        }
    }

    Ok(StatusCode::OK)
}

/// Classify one text message: `id=<device>` updates the sender's binding,
/// anything else is dispatched to the bound device.
async fn handle_message(state: &AppState, event: MessageEvent) {
    if event.message.kind != "text" {
        return;
    }
    let Some(text) = event.message.text.as_deref() else {
        return;
    };
    let text = text.trim();
    let user_id = event.source.user_id.as_str();

    let reply = if let Some(rest) = text.strip_prefix("id=") {
        let device_id = rest.trim();
        if device_id.is_empty() {
            "วิธีใช้: id=<รหัสอุปกรณ์>".to_string()
        } else {
            state.bindings.set(user_id, device_id).await;
            info!(user_id = %user_id, device_id = %device_id, "Device bound");
            format!("ตั้งค่าอุปกรณ์เป็น {device_id} แล้ว")
        }
    } else {
        match state.bindings.get(user_id).await {
            None => "ยังไม่ได้ผูกอุปกรณ์ พิมพ์ id=<รหัสอุปกรณ์> ก่อน".to_string(),
            Some(device_id) => {
                let command = DeviceCommand {
                    device_id: device_id.clone(),
                    data: text.to_string(),
                };
                if let Err(e) = state.commands.send(command).await {
                    error!(device_id = %device_id, "Failed to queue command: {e}");
                } else {
                    info!(user_id = %user_id, device_id = %device_id, data = %text, "Command dispatched");
                }
                format!("รับแล้ว: {text}")
            }
        }
    };

    if let Err(e) = state.line.reply(&event.reply_token, &reply).await {
        error!(user_id = %user_id, "Failed to deliver reply: {e}");
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
