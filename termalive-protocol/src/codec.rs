//! Frame encode/decode: big-endian `u32` payload length, `u8` message type,
//! then that many payload bytes.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ProtocolError;
use crate::message::Message;

/// Frames larger than this are a protocol error; the connection is
/// terminated.
pub const MAX_PAYLOAD_LEN: u32 = 10 * 1024 * 1024;

/// Encode a complete frame: length prefix, type byte, payload.
#[must_use]
pub fn encode_frame(message: &Message) -> Vec<u8> {
    let payload = message.encode_payload();
    let mut frame = Vec::with_capacity(5 + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.push(message.type_code());
    frame.extend_from_slice(&payload);
    frame
}

/// Decode a message from its type byte and payload, after the length
/// prefix has already been consumed. Exposed for tests that want to decode
/// without a byte stream.
pub fn decode_frame(type_code: u8, payload: &[u8]) -> Result<Message, ProtocolError> {
    Message::decode(type_code, payload)
}

/// Write one framed message to an async byte stream.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode_frame(message);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one framed message from an async byte stream. Returns
/// [`ProtocolError::Closed`] if the stream ends exactly at a frame
/// boundary (a clean disconnect, not a malformed frame).
pub async fn read_message<R>(reader: &mut R) -> Result<Message, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {},
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::Closed);
        },
        Err(err) => return Err(err.into()),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_PAYLOAD_LEN {
        return Err(ProtocolError::PayloadTooLarge { len, max: MAX_PAYLOAD_LEN });
    }

    let type_code = reader.read_u8().await?;
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload).await?;

    decode_frame(type_code, &payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TYPE_OUTPUT;

    #[test]
    fn encodes_the_scenario_5_frame_exactly() {
        let msg = Message::Output { bytes: b"Hi".to_vec() };
        let frame = encode_frame(&msg);
        assert_eq!(frame, vec![0x00, 0x00, 0x00, 0x02, TYPE_OUTPUT, b'H', b'i']);
    }

    #[tokio::test]
    async fn round_trips_a_message_through_an_in_memory_duplex_stream() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        let sent = Message::Resize { columns: 120, rows: 40 };
        let sent_clone = sent.clone();
        let writer = tokio::spawn(async move {
            write_message(&mut client, &sent_clone).await.unwrap();
        });

        let received = read_message(&mut server).await.unwrap();
        writer.await.unwrap();

        assert_eq!(received, sent);
    }

    #[tokio::test]
    async fn oversized_length_prefix_is_a_protocol_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let huge = MAX_PAYLOAD_LEN + 1;
        tokio::spawn(async move {
            let _ = client.write_all(&huge.to_be_bytes()).await;
        });

        let err = read_message(&mut server).await.unwrap_err();
        assert!(matches!(err, ProtocolError::PayloadTooLarge { .. }));
    }

    #[tokio::test]
    async fn clean_disconnect_at_a_frame_boundary_is_reported_as_closed() {
        let (client, mut server) = tokio::io::duplex(64);
        drop(client);
        let err = read_message(&mut server).await.unwrap_err();
        assert!(matches!(err, ProtocolError::Closed));
    }
}
