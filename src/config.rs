//! Environment-derived configuration.
//!
//! Nothing is validated at startup: missing credentials leave the process
//! serving traffic (the health check keeps passing) while every webhook
//! fails signature verification and replies fail at call time. Each missing
//! credential is logged once here so the misconfiguration is visible.

use tracing::warn;

/// Broker connection settings for the command publisher.
#[derive(Clone)]
pub struct MqttConfig {
    pub host: String,
    pub port: u16,
    pub topic: String,
}

pub struct Config {
    /// HTTP listen port.
    pub port: u16,
    /// Shared secret for webhook signature verification.
    pub channel_secret: String,
    /// Bearer token for the LINE reply API.
    pub access_token: String,
    pub mqtt: MqttConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        let channel_secret = std::env::var("LINE_CHANNEL_SECRET").unwrap_or_else(|_| {
            warn!("LINE_CHANNEL_SECRET not set; all webhook deliveries will be rejected");
            String::new()
        });
        let access_token = std::env::var("LINE_CHANNEL_ACCESS_TOKEN").unwrap_or_else(|_| {
            warn!("LINE_CHANNEL_ACCESS_TOKEN not set; replies will fail at call time");
            String::new()
        });

        let mqtt = MqttConfig {
            host: std::env::var("MQTT_HOST").unwrap_or_else(|_| "broker.hivemq.com".to_string()),
            port: std::env::var("MQTT_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1883),
            topic: std::env::var("MQTT_TOPIC").unwrap_or_else(|_| "switchboard/cmd".to_string()),
        };

        Config {
            port,
            channel_secret,
            access_token,
            mqtt,
        }
    }
}
