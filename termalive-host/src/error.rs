use thiserror::Error;

/// Failures surfaced by [`crate::SessionHost`] operations.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("session id {0:?} already exists")]
    AlreadyExists(String),

    #[error("no session with id {0:?}")]
    NotFound(String),

    #[error("maximum number of sessions ({0}) reached")]
    Capacity(usize),

    #[error("failed to spawn session")]
    Session(#[from] termalive_session::SessionError),

    #[error("protocol error")]
    Protocol(#[from] termalive_protocol::ProtocolError),

    #[error("transport error")]
    Transport(#[from] termalive_transport::TransportError),

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}
