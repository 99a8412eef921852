//! MQTT command publishing.
//!
//! The webhook handler never talks to the broker directly: it queues
//! `DeviceCommand`s on a channel, and the tasks spawned here own the broker
//! connection and forward queued commands to the configured topic. Delivery
//! is at most once; a failed publish is logged and dropped, never retried.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::MqttConfig;

/// Command routed to a device, published as JSON on the broker topic.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCommand {
    pub device_id: String,
    pub data: String,
}

/// Open the broker connection and spawn the two publisher tasks: one drives
/// the MQTT event loop, one forwards queued commands.
pub fn spawn_publisher(rx: mpsc::Receiver<DeviceCommand>, config: MqttConfig) {
    // Random client id so two instances against a shared broker don't evict
    // each other's session.
    let client_id = format!("switchboard-{}", Uuid::new_v4());
    let mut options = MqttOptions::new(client_id.as_str(), config.host.as_str(), config.port);
    options.set_keep_alive(Duration::from_secs(30));

    let (client, eventloop) = AsyncClient::new(options, 10);
    info!(
        host = %config.host,
        port = config.port,
        client_id = %client_id,
        "MQTT publisher starting"
    );

    tokio::spawn(drive_connection(eventloop, config.host));
    tokio::spawn(forward_commands(rx, client, config.topic));
}

/// Poll the MQTT event loop forever. rumqttc reconnects on the next poll
/// after an error; repeat failures drop to debug until a connect succeeds.
async fn drive_connection(mut eventloop: EventLoop, host: String) {
    let mut first_failure = true;
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!(host = %host, "Connected to MQTT broker");
                first_failure = true;
            }
            Ok(_) => {}
            Err(e) => {
                if first_failure {
                    warn!(host = %host, error = %e, "MQTT connection error");
                    first_failure = false;
                } else {
                    debug!(host = %host, error = %e, "MQTT reconnect failed");
                }
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
        }
    }
}

/// Consume queued commands and publish them at QoS 0.
async fn forward_commands(
    mut rx: mpsc::Receiver<DeviceCommand>,
    client: AsyncClient,
    topic: String,
) {
    info!(topic = %topic, "Command publisher started");
    while let Some(command) = rx.recv().await {
        let payload = match serde_json::to_vec(&command) {
            Ok(p) => p,
            Err(e) => {
                error!(device_id = %command.device_id, "Failed to serialize command: {e}");
                continue;
            }
        };

        match client
            .publish(topic.as_str(), QoS::AtMostOnce, false, payload)
            .await
        {
            Ok(()) => debug!(device_id = %command.device_id, topic = %topic, "Command published"),
            Err(e) => error!(device_id = %command.device_id, "Failed to publish command: {e}"),
        }
    }
    info!("Command publisher shutting down (channel closed)");
}
