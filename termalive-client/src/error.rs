use termalive_protocol::ProtocolError;
use termalive_transport::TransportError;
use thiserror::Error;

/// Failures surfaced by [`crate::Client`] and [`crate::Attachment`]
/// operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("transport error")]
    Transport(#[from] TransportError),

    #[error("protocol error")]
    Protocol(#[from] ProtocolError),

    #[error("connection closed")]
    Closed,

    #[error("incompatible protocol version (local {local}, remote {remote})")]
    IncompatibleVersion { local: u8, remote: u8 },

    #[error("already attached to a session; detach first")]
    AlreadyAttached,

    #[error("unexpected reply from host")]
    UnexpectedReply,

    #[error("another request is already in flight on this connection")]
    RequestInFlight,

    #[error("{0}")]
    Server(String),
}
