//! Peer of `termalive_host`: connects over the same framed protocol and
//! transports, lists/creates sessions, and attaches to stream a session's
//! output while injecting input and resizing.

mod attachment;
mod client;
mod error;
mod options;

pub use attachment::{Attachment, AttachmentEvent};
pub use client::Client;
pub use error::ClientError;
pub use options::NewSession;
