//! warden: keeps a voice channel's mute/deafen state in step with an
//! externally refereed social-deduction game.
//!
//! Connects to the voice directory service, builds one reconciliation
//! session per configured channel, and serves the HTTP control surface plus
//! the observer WebSocket on a single listener.

mod config;
mod http;
mod observers;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use warden_core::{
    Broadcaster, ChannelId, ChannelSession, EventRouter, SessionRegistry, VoiceDirectory,
};
use warden_gateway::{event_stream_loop, RestDirectory};

use crate::http::AppState;
use crate::observers::ObserverHub;

#[derive(Parser)]
#[command(name = "warden", about = "Voice-channel warden for refereed social-deduction games")]
struct Args {
    /// Path to the TOML config file.
    #[arg(short, long, default_value = "warden.toml")]
    config: PathBuf,

    /// Override the configured bind address.
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "warden_server=info,warden_core=info,warden_gateway=info".into()
                }),
        )
        .init();

    let args = Args::parse();
    let config = match config::load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            std::process::exit(1);
        }
    };
    let bind = args.bind.unwrap_or_else(|| config.bind.clone());

    let shutdown = CancellationToken::new();
    let directory = Arc::new(RestDirectory::new(config.directory.clone()));
    let hub = Arc::new(ObserverHub::new());

    // One session per configured channel, primed with the initial roster.
    let mut registry = SessionRegistry::new();
    for raw in &config.channels {
        let channel = ChannelId::new(raw.clone());
        let session = Arc::new(ChannelSession::new(
            channel.clone(),
            directory.clone() as Arc<dyn VoiceDirectory>,
            hub.clone() as Arc<dyn Broadcaster>,
            shutdown.child_token(),
        ));
        if let Err(e) = session.prime().await {
            // The next triggered pass refreshes the roster once the
            // directory is reachable again.
            warn!(channel = %channel, error = %e, "initial roster unavailable");
        }
        registry.insert(session);
    }
    let registry = Arc::new(registry);
    info!(channels = registry.len(), "sessions ready");

    // Directory events → router.
    let (event_tx, event_rx) = mpsc::channel(256);
    tokio::spawn(event_stream_loop(
        config.directory.clone(),
        directory.clone(),
        event_tx,
        shutdown.child_token(),
    ));
    tokio::spawn(EventRouter::new(registry.clone()).run(event_rx));

    let app = http::router(AppState {
        registry,
        hub,
        directory: directory as Arc<dyn VoiceDirectory>,
    });

    let listener = TcpListener::bind(&bind)
        .await
        .expect("failed to bind listener");
    info!(addr = %bind, "warden listening");

    let signal_token = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown requested");
            signal_token.cancel();
        })
        .await
        .expect("server error");
}
