//! LINE Messaging API client.
//!
//! Only the reply endpoint is used: each inbound event carries a single-use
//! reply token, and the bot answers by POSTing it together with the message
//! text. Authentication is the channel access token as a Bearer header.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::debug;

const API_BASE: &str = "https://api.line.me";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

/// Client for the LINE reply endpoint.
#[derive(Clone)]
pub struct LineClient {
    base_url: String,
    access_token: String,
    http: reqwest::Client,
}

impl LineClient {
    pub fn new(access_token: String) -> Self {
        Self::with_base_url(API_BASE.to_string(), access_token)
    }

    /// Point the client at a different API host. Tests use this to stand in
    /// a local server for the real endpoint.
    pub fn with_base_url(base_url: String, access_token: String) -> Self {
        Self {
            base_url,
            access_token,
            http: reqwest::Client::new(),
        }
    }

    /// Send a single text reply for `reply_token`.
    pub async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        let body = ReplyRequest {
            reply_token,
            messages: vec![TextMessage { kind: "text", text }],
        };

        let response = self
            .http
            .post(format!("{}/v2/bot/message/reply", self.base_url))
            .header("Authorization", format!("Bearer {}", self.access_token))
            .json(&body)
            .send()
            .await
            .context("Failed to send reply to LINE API")?;

        let status = response.status();
        if !status.is_success() {
            let response_text = response.text().await.unwrap_or_default();
            bail!("LINE reply API returned HTTP {status}: {response_text}");
        }

        debug!(reply_token, "Reply delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        http::{HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use tokio::sync::Mutex;

    type Recorded = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    async fn spawn_mock(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn reply_posts_bearer_token_and_message() {
        let received: Recorded = Arc::new(Mutex::new(Vec::new()));
        let recorded = received.clone();
        let app = Router::new().route(
            "/v2/bot/message/reply",
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let recorded = recorded.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    recorded.lock().await.push((auth, body));
                    StatusCode::OK
                }
            }),
        );
        let base_url = spawn_mock(app).await;

        let client = LineClient::with_base_url(base_url, "token-123".to_string());
        client.reply("rt-9", "hello").await.unwrap();

        let received = received.lock().await;
        let (auth, body) = &received[0];
        assert_eq!(auth.as_deref(), Some("Bearer token-123"));
        assert_eq!(
            *body,
            serde_json::json!({
                "replyToken": "rt-9",
                "messages": [{"type": "text", "text": "hello"}]
            })
        );
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route(
            "/v2/bot/message/reply",
            post(|| async { (StatusCode::BAD_REQUEST, "Invalid reply token") }),
        );
        let base_url = spawn_mock(app).await;

        let client = LineClient::with_base_url(base_url, "token".to_string());
        let err = client.reply("expired", "hi").await.unwrap_err();
        assert!(err.to_string().contains("400"), "got: {err}");
    }
}
