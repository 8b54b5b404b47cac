use termalive_protocol::SessionRecord;

use crate::client::Client;
use crate::error::ClientError;

/// One item arriving on an [`Attachment`]'s stream: either a chunk of PTY
/// output or the terminal "the session is gone" notice, delivered exactly
/// once as the last item.
#[derive(Clone, Debug)]
pub enum AttachmentEvent {
    Output(Vec<u8>),
    Exited(i32),
}

/// A live subscription to a session's output, held by at most one per
/// [`Client`] at a time.
///
/// Dropping an `Attachment` without calling [`Attachment::detach`] still
/// frees the client to attach elsewhere, but does not notify the host; call
/// `detach` explicitly to do that.
pub struct Attachment {
    pub(crate) client: Client,
    pub(crate) session: SessionRecord,
    pub(crate) snapshot: Vec<u8>,
    pub(crate) events: flume::Receiver<AttachmentEvent>,
}

impl Attachment {
    /// The session record as it was at the moment this attachment was
    /// established.
    #[must_use]
    pub fn session(&self) -> &SessionRecord {
        &self.session
    }

    /// The ring snapshot captured atomically with subscription
    /// registration: every byte the session produced strictly before this
    /// attach, in order.
    #[must_use]
    pub fn snapshot(&self) -> &[u8] {
        &self.snapshot
    }

    /// Forward bytes to the session's PTY.
    pub async fn send_input(&self, bytes: Vec<u8>) -> Result<(), ClientError> {
        self.client.send_input(bytes).await
    }

    /// Resize the session's PTY and screen buffer.
    pub async fn resize(&self, columns: u16, rows: u16) -> Result<(), ClientError> {
        self.client.resize(columns, rows).await
    }

    /// Await the next output chunk or the terminal exit notice. Returns
    /// `None` once the connection has closed.
    pub async fn recv(&self) -> Option<AttachmentEvent> {
        self.events.recv_async().await.ok()
    }

    /// Detach from the session, notifying the host and freeing this client
    /// to attach elsewhere.
    pub async fn detach(self) -> Result<(), ClientError> {
        self.client.detach().await
    }
}

impl Drop for Attachment {
    fn drop(&mut self) {
        self.client.inner.mark_detached();
    }
}
