use thiserror::Error;

/// Failures decoding or transporting a framed message. Always fatal to
/// the connection that raised it.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("frame payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: u32, max: u32 },

    #[error("unknown message type {0}")]
    UnknownMessageType(u8),

    #[error("malformed message payload: {0}")]
    Malformed(&'static str),

    #[error("invalid UTF-8 in string field")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("connection closed")]
    Closed,

    #[error("transport I/O error")]
    Io(#[from] std::io::Error),
}
