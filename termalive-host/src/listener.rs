//! WebSocket and platform-pipe accept loops; either listener may be
//! disabled independently.
//!
//! Finished client-worker tasks are reaped through `JoinSet::join_next`
//! rather than left to accumulate.

use std::sync::Arc;

use termalive_transport::{BoxedDuplex, WebSocketByteStream};
use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::host::SessionHost;
use crate::worker;

#[cfg(unix)]
use termalive_transport::unix_pipe;
#[cfg(windows)]
use termalive_transport::windows_pipe;

/// Runs every listener enabled in `host`'s config until one of them fails
/// irrecoverably (e.g. the bind address is unavailable). Returns
/// immediately, doing nothing, if neither listener is configured.
pub async fn serve(host: Arc<SessionHost>) -> std::io::Result<()> {
    let mut listeners = JoinSet::new();

    if let Some(bind) = host.config().ws_bind.clone() {
        let host = Arc::clone(&host);
        listeners.spawn(async move { run_ws_listener(host, bind).await });
    }
    if let Some(name) = host.config().pipe_name.clone() {
        let host = Arc::clone(&host);
        listeners.spawn(async move { run_pipe_listener(host, name).await });
    }

    if listeners.is_empty() {
        log::warn!("session host started with no listeners enabled");
        return Ok(());
    }

    while let Some(result) = listeners.join_next().await {
        match result {
            Ok(Ok(())) => {},
            Ok(Err(err)) => return Err(err),
            Err(join_err) => log::error!("listener task panicked: {join_err}"),
        }
    }
    Ok(())
}

async fn run_ws_listener(host: Arc<SessionHost>, bind: String) -> std::io::Result<()> {
    let listener = TcpListener::bind(&bind).await?;
    log::info!("websocket listener bound to {bind}");

    let mut clients = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (tcp, peer) = accepted?;
                let host = Arc::clone(&host);
                clients.spawn(async move {
                    match tokio_tungstenite::accept_async(tcp).await {
                        Ok(ws) => {
                            let duplex: BoxedDuplex = Box::new(WebSocketByteStream::new(ws));
                            worker::run_client(host, duplex).await;
                        },
                        Err(err) => log::warn!("websocket handshake with {peer} failed: {err}"),
                    }
                });
            },
            Some(finished) = clients.join_next(), if !clients.is_empty() => {
                if let Err(err) = finished {
                    log::error!("websocket client task panicked: {err}");
                }
            },
        }
    }
}

#[cfg(unix)]
async fn run_pipe_listener(host: Arc<SessionHost>, name: String) -> std::io::Result<()> {
    let listener = unix_pipe::bind(&name).map_err(std::io::Error::other)?;
    log::info!("pipe listener bound to {}", termalive_transport::socket_path(&name).display());

    let mut clients = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _addr) = accepted?;
                let host = Arc::clone(&host);
                let duplex: BoxedDuplex = Box::new(stream);
                clients.spawn(worker::run_client(host, duplex));
            },
            Some(finished) = clients.join_next(), if !clients.is_empty() => {
                if let Err(err) = finished {
                    log::error!("pipe client task panicked: {err}");
                }
            },
        }
    }
}

#[cfg(windows)]
async fn run_pipe_listener(host: Arc<SessionHost>, name: String) -> std::io::Result<()> {
    log::info!("pipe listener bound to {}", termalive_transport::pipe_path(&name));

    let mut server = windows_pipe::create_server(&name).map_err(std::io::Error::other)?;
    let mut clients = JoinSet::new();
    loop {
        tokio::select! {
            connected = server.connect() => {
                connected?;
                let next = windows_pipe::create_next_server_instance(&name)
                    .map_err(std::io::Error::other)?;
                let connected_stream = std::mem::replace(&mut server, next);
                let host = Arc::clone(&host);
                let duplex: BoxedDuplex = Box::new(connected_stream);
                clients.spawn(worker::run_client(host, duplex));
            },
            Some(finished) = clients.join_next(), if !clients.is_empty() => {
                if let Err(err) = finished {
                    log::error!("pipe client task panicked: {err}");
                }
            },
        }
    }
}
