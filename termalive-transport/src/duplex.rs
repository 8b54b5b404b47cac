//! Type-erased seam so `termalive-host`/`termalive-client` never branch on
//! transport kind: a WebSocket and a pipe connection both end up behind
//! the same `Box<dyn AsyncDuplex>` field.

use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream with nothing transport-specific left in its
/// type. Anything that is both halves of an async duplex qualifies.
pub trait AsyncDuplex: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncDuplex for T {}

/// A boxed byte stream produced by either transport adapter.
pub type BoxedDuplex = Box<dyn AsyncDuplex>;
