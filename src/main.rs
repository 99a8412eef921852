mod bindings;
mod config;
mod line;
mod publisher;
mod signature;
mod webhook;

use axum::Router;
use tokio::sync::mpsc;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

use bindings::DeviceBindings;
use config::Config;
use line::LineClient;
use publisher::DeviceCommand;

#[derive(Clone)]
pub struct AppState {
    pub channel_secret: String,
    pub line: LineClient,
    pub bindings: DeviceBindings,
    pub commands: mpsc::Sender<DeviceCommand>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (development); in production, systemd
    // provides environment variables via EnvironmentFile.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .without_time()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "switchboard=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env();

    let (commands, command_rx) = mpsc::channel(64);
    publisher::spawn_publisher(command_rx, config.mqtt);

    let state = AppState {
        channel_secret: config.channel_secret,
        line: LineClient::new(config.access_token),
        bindings: DeviceBindings::new(),
        commands,
    };

    let app = Router::new()
        .merge(webhook::router())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let client_ip = request
                        .headers()
                        .get("x-forwarded-for")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.split(',').next())
                        .map(|s| s.trim().to_string())
                        .unwrap_or_else(|| "-".into());
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        client_ip = %client_ip,
                    )
                })
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state);

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Switchboard listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
