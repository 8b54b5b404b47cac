use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("unsupported session URI scheme (expected ws://, wss:// or pipe://): {0}")]
    UnsupportedScheme(String),

    #[error("session URI is missing a host:port or pipe name: {0}")]
    MissingAuthority(String),

    #[error("websocket error")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("transport I/O error")]
    Io(#[from] std::io::Error),
}
