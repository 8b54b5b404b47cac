//! The length-prefixed binary message protocol spoken between
//! `termalive-host` and `termalive-client`.

mod codec;
mod error;
mod message;
mod wire;

pub use codec::{MAX_PAYLOAD_LEN, decode_frame, encode_frame, read_message, write_message};
pub use error::ProtocolError;
pub use message::{Message, NO_EXIT_CODE, PROTOCOL_VERSION, SessionRecord, encode_state};
