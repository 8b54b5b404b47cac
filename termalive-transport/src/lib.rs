//! Byte-stream adapters so `termalive-protocol` can run over either a
//! WebSocket or a platform pipe.

mod duplex;
mod error;
mod pipe;
mod uri;
mod websocket;

pub use duplex::{AsyncDuplex, BoxedDuplex};
pub use error::TransportError;
#[cfg(unix)]
pub use pipe::{socket_path, unix_pipe};
#[cfg(windows)]
pub use pipe::{pipe_path, windows_pipe};
pub use uri::SessionUri;
pub use websocket::WebSocketByteStream;
