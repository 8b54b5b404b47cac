//! Exposes a `tokio-tungstenite` WebSocket as a plain `AsyncRead +
//! AsyncWrite` byte stream: message boundaries from the WS layer do not
//! correspond to protocol frames, so incoming binary frames are buffered
//! and drained byte-by-byte.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::{Sink, Stream};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// Adapts a [`WebSocketStream`] to `AsyncRead + AsyncWrite` over binary
/// frames. Text/ping/pong/close control frames are consumed transparently;
/// a close frame or stream end surfaces as a clean EOF.
pub struct WebSocketByteStream<S> {
    inner: WebSocketStream<S>,
    read_buf: VecDeque<u8>,
    eof: bool,
}

impl<S> WebSocketByteStream<S> {
    #[must_use]
    pub fn new(inner: WebSocketStream<S>) -> Self {
        Self { inner, read_buf: VecDeque::new(), eof: false }
    }
}

impl<S> AsyncRead for WebSocketByteStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            if !self.read_buf.is_empty() {
                let n = buf.remaining().min(self.read_buf.len());
                let chunk: Vec<u8> = self.read_buf.drain(..n).collect();
                buf.put_slice(&chunk);
                return Poll::Ready(Ok(()));
            }

            if self.eof {
                return Poll::Ready(Ok(()));
            }

            match Pin::new(&mut self.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(WsMessage::Binary(data)))) => {
                    self.read_buf.extend(data);
                },
                Poll::Ready(Some(Ok(WsMessage::Close(_)))) | Poll::Ready(None) => {
                    self.eof = true;
                    return Poll::Ready(Ok(()));
                },
                Poll::Ready(Some(Ok(_non_binary))) => {
                    // Text/Ping/Pong/Frame: not part of the byte stream contract.
                    continue;
                },
                Poll::Ready(Some(Err(err))) => {
                    return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, err)));
                },
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<S> AsyncWrite for WebSocketByteStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match Pin::new(&mut self.inner).poll_ready(cx) {
            Poll::Ready(Ok(())) => {
                match Pin::new(&mut self.inner).start_send(WsMessage::Binary(buf.to_vec())) {
                    Ok(()) => Poll::Ready(Ok(buf.len())),
                    Err(err) => Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, err))),
                }
            },
            Poll::Ready(Err(err)) => Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, err))),
            Poll::Pending => Poll::Pending,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner)
            .poll_flush(cx)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner)
            .poll_close(cx)
            .map_err(|err| io::Error::new(io::ErrorKind::Other, err))
    }
}
