use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::net::{TcpListener, TcpStream};
use tracing_subscriber::EnvFilter;

use speedword_core::judge::Judge;
use speedword_server::{
    assigner::{Assigner, AssignerHandle},
    config::ServerConfig,
    session::PlayerSession,
    transport,
};

async fn handle_connection(
    raw_stream: TcpStream,
    addr: SocketAddr,
    judge: Arc<Judge>,
    assigner: AssignerHandle,
) {
    tracing::info!("Incoming TCP connection from: {addr}");

    let ws_stream = match tokio_tungstenite::accept_async(raw_stream).await {
        Ok(ws_stream) => ws_stream,
        Err(err) => {
            tracing::warn!("Websocket handshake with {addr} failed: {err}");
            return;
        }
    };
    tracing::info!("WebSocket connection established: {addr}");

    let (outgoing, incoming) = transport::websocket(ws_stream);
    let session = PlayerSession::new(judge, assigner, outgoing);
    tracing::debug!("{addr} is player {}", session.id());
    session.run(incoming).await;

    tracing::info!("{addr} disconnected");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting up...");
    let config = ServerConfig::from_env()?;

    let judge = Judge::load(&config.dictionary_path).with_context(|| {
        format!(
            "Loading the dictionary from {}",
            config.dictionary_path.display()
        )
    })?;
    let judge = Arc::new(judge);

    let (assigner, shutdown) = Assigner::spawn(config.rules());

    let listener = TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("Binding {}", config.addr))?;
    tracing::info!("Listening on: {}", config.addr);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    tokio::spawn(handle_connection(
                        stream,
                        addr,
                        Arc::clone(&judge),
                        assigner.clone(),
                    ));
                }
                Err(err) => tracing::warn!("Failed to accept a connection: {err}"),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    shutdown.close().await;
    Ok(())
}
