//! Peer of `termalive_host`'s per-client worker: handshake, then request/
//! reply plus an asynchronous output stream multiplexed over one
//! connection.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use termalive_protocol::{Message, PROTOCOL_VERSION, ProtocolError, SessionRecord, read_message, write_message};
use termalive_transport::{BoxedDuplex, SessionUri, TransportError, WebSocketByteStream};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::sync::{Mutex, oneshot};

use crate::attachment::{Attachment, AttachmentEvent};
use crate::error::ClientError;
use crate::options::NewSession;

struct Inner {
    writer: Mutex<WriteHalf<BoxedDuplex>>,
    pending: Mutex<Option<oneshot::Sender<Message>>>,
    events: Mutex<Option<flume::Sender<AttachmentEvent>>>,
    attached: AtomicBool,
}

impl Inner {
    fn mark_detached(&self) {
        self.attached.store(false, Ordering::SeqCst);
    }
}

/// A connection to a `termalive_host::SessionHost`. Cheaply cloneable: all
/// clones share the one underlying connection and its single in-flight
/// request slot.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<Inner>,
}

impl Client {
    /// Connect to `uri` (`ws://`, `wss://`, or `pipe://`) and perform the
    /// protocol handshake, advertising this crate's protocol version.
    pub async fn connect(uri: &str) -> Result<Self, ClientError> {
        Self::connect_with_version(uri, PROTOCOL_VERSION).await
    }

    /// As [`Client::connect`], advertising an explicit protocol version
    /// rather than this crate's own.
    pub async fn connect_with_version(uri: &str, version: u8) -> Result<Self, ClientError> {
        let parsed = SessionUri::parse(uri)?;
        let duplex = open_transport(parsed).await?;
        Self::from_duplex(duplex, version).await
    }

    async fn from_duplex(duplex: BoxedDuplex, version: u8) -> Result<Self, ClientError> {
        let (mut reader, mut writer) = tokio::io::split(duplex);
        let remote_version = handshake(&mut reader, &mut writer, version).await?;
        log::debug!("connected to host speaking protocol version {remote_version}");

        let inner = Arc::new(Inner {
            writer: Mutex::new(writer),
            pending: Mutex::new(None),
            events: Mutex::new(None),
            attached: AtomicBool::new(false),
        });
        tokio::spawn(run_reader(Arc::clone(&inner), reader));
        Ok(Self { inner })
    }

    /// List every session currently known to the host.
    pub async fn list_sessions(&self) -> Result<Vec<SessionRecord>, ClientError> {
        match self.request(Message::ListSessions).await? {
            Message::SessionList { sessions } => Ok(sessions),
            Message::Error { message } => Err(ClientError::Server(message)),
            _ => Err(ClientError::UnexpectedReply),
        }
    }

    /// Ask the host to spawn a new session.
    pub async fn create_session(&self, new: NewSession) -> Result<SessionRecord, ClientError> {
        let message = Message::CreateSession {
            id: new.id,
            command: new.command,
            working_directory: new.working_directory.unwrap_or_default(),
            columns: new.columns,
            rows: new.rows,
            arguments: new.arguments,
            environment: new.environment,
        };
        match self.request(message).await? {
            Message::SessionCreated { session } => Ok(session),
            Message::Error { message } => Err(ClientError::Server(message)),
            _ => Err(ClientError::UnexpectedReply),
        }
    }

    /// Attach to a session's output. Only one attachment is permitted per
    /// client at a time; drop or [`Attachment::detach`] the current one
    /// first.
    pub async fn attach(&self, id: impl Into<String>) -> Result<Attachment, ClientError> {
        if self.inner.attached.swap(true, Ordering::SeqCst) {
            return Err(ClientError::AlreadyAttached);
        }
        let (tx, rx) = flume::unbounded();
        *self.inner.events.lock().await = Some(tx);

        match self.request(Message::Attach { id: id.into() }).await {
            Ok(Message::Attached { session, output }) => {
                Ok(Attachment { client: self.clone(), session, snapshot: output, events: rx })
            },
            Ok(Message::Error { message }) => {
                self.clear_attachment().await;
                Err(ClientError::Server(message))
            },
            Ok(_) => {
                self.clear_attachment().await;
                Err(ClientError::UnexpectedReply)
            },
            Err(err) => {
                self.clear_attachment().await;
                Err(err)
            },
        }
    }

    /// Kill a session by id. `KillSession` has no success reply on this
    /// wire, only a failure `Error`, so this returns as soon as the request
    /// is written; a failure arrives asynchronously and is logged rather
    /// than surfaced here.
    pub async fn kill_session(&self, id: impl Into<String>, force: bool) -> Result<(), ClientError> {
        self.send_raw(&Message::KillSession { id: id.into(), force }).await
    }

    pub(crate) async fn send_input(&self, bytes: Vec<u8>) -> Result<(), ClientError> {
        self.send_raw(&Message::Input { bytes }).await
    }

    pub(crate) async fn resize(&self, columns: u16, rows: u16) -> Result<(), ClientError> {
        self.send_raw(&Message::Resize { columns, rows }).await
    }

    pub(crate) async fn detach(&self) -> Result<(), ClientError> {
        self.send_raw(&Message::Detach).await?;
        self.clear_attachment().await;
        Ok(())
    }

    async fn clear_attachment(&self) {
        self.inner.mark_detached();
        *self.inner.events.lock().await = None;
    }

    async fn request(&self, message: Message) -> Result<Message, ClientError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.inner.pending.lock().await;
            if pending.is_some() {
                return Err(ClientError::RequestInFlight);
            }
            *pending = Some(tx);
        }
        if let Err(err) = self.send_raw(&message).await {
            self.inner.pending.lock().await.take();
            return Err(err);
        }
        rx.await.map_err(|_| ClientError::Closed)
    }

    async fn send_raw(&self, message: &Message) -> Result<(), ClientError> {
        let mut writer = self.inner.writer.lock().await;
        write_message(&mut *writer, message).await?;
        Ok(())
    }
}

async fn handshake<R, W>(reader: &mut R, writer: &mut W, version: u8) -> Result<u8, ClientError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write_message(writer, &Message::Hello { version }).await?;
    match read_message(reader).await? {
        Message::Hello { version: peer } => {
            let (lo, hi) = (version.min(peer), version.max(peer));
            if hi > lo + 1 {
                return Err(ClientError::IncompatibleVersion { local: version, remote: peer });
            }
            Ok(peer)
        },
        _ => Err(ProtocolError::Malformed("expected Hello as the first message").into()),
    }
}

/// Reads every frame for the lifetime of the connection, routing `Output`
/// and `SessionExited` to the current attachment's stream and everything
/// else to whichever request is awaiting a reply.
async fn run_reader(inner: Arc<Inner>, mut reader: ReadHalf<BoxedDuplex>) {
    loop {
        match read_message(&mut reader).await {
            Ok(Message::Output { bytes }) => deliver_event(&inner, AttachmentEvent::Output(bytes)).await,
            Ok(Message::SessionExited { exit_code, .. }) => {
                deliver_event(&inner, AttachmentEvent::Exited(exit_code)).await;
            },
            Ok(other) => resolve_pending(&inner, other).await,
            Err(ProtocolError::Closed) => break,
            Err(err) => {
                log::warn!("client connection read error: {err}");
                break;
            },
        }
    }
    if let Some(pending) = inner.pending.lock().await.take() {
        drop(pending);
    }
    *inner.events.lock().await = None;
}

async fn deliver_event(inner: &Inner, event: AttachmentEvent) {
    let events = inner.events.lock().await;
    if let Some(sender) = events.as_ref() {
        let _ = sender.send_async(event).await;
    }
}

async fn resolve_pending(inner: &Inner, message: Message) {
    match inner.pending.lock().await.take() {
        Some(sender) => {
            let _ = sender.send(message);
        },
        None => log::warn!("unsolicited message type {} from host with no request pending", message.type_code()),
    }
}

async fn open_transport(uri: SessionUri) -> Result<BoxedDuplex, ClientError> {
    match uri {
        SessionUri::WebSocket { host, port, tls } => {
            let scheme = if tls { "wss" } else { "ws" };
            let url = format!("{scheme}://{host}:{port}/");
            let (stream, _response) =
                tokio_tungstenite::connect_async(url).await.map_err(TransportError::from)?;
            Ok(Box::new(WebSocketByteStream::new(stream)))
        },
        SessionUri::Pipe { name } => connect_pipe(&name).await,
    }
}

#[cfg(unix)]
async fn connect_pipe(name: &str) -> Result<BoxedDuplex, ClientError> {
    Ok(Box::new(termalive_transport::unix_pipe::connect(name).await?))
}

#[cfg(windows)]
async fn connect_pipe(name: &str) -> Result<BoxedDuplex, ClientError> {
    Ok(Box::new(termalive_transport::windows_pipe::connect(name).await?))
}

#[cfg(not(any(unix, windows)))]
async fn connect_pipe(_name: &str) -> Result<BoxedDuplex, ClientError> {
    Err(ClientError::Transport(TransportError::Io(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "platform pipes are not supported on this target",
    ))))
}

#[cfg(test)]
mod tests {
    use termalive_protocol::NO_EXIT_CODE;

    use super::*;

    fn sample_record(id: &str) -> SessionRecord {
        SessionRecord {
            id: id.to_string(),
            command: "bash".into(),
            working_directory: String::new(),
            state: 1,
            created_ms_since_epoch: 0,
            exit_code: NO_EXIT_CODE,
            columns: 80,
            rows: 24,
        }
    }

    async fn connected_pair() -> (Client, tokio::io::DuplexStream) {
        let (client_side, server_side) = tokio::io::duplex(16 * 1024);
        let client_task = tokio::spawn(Client::from_duplex(Box::new(client_side), PROTOCOL_VERSION));

        let mut server_side = server_side;
        // Host side of the handshake: read Hello, reply Hello.
        let hello = read_message(&mut server_side).await.unwrap();
        assert!(matches!(hello, Message::Hello { version: PROTOCOL_VERSION }));
        write_message(&mut server_side, &Message::Hello { version: PROTOCOL_VERSION }).await.unwrap();

        let client = client_task.await.unwrap().unwrap();
        (client, server_side)
    }

    #[tokio::test]
    async fn handshake_then_list_sessions_round_trips() {
        let (client, mut server) = connected_pair().await;

        let list_task = tokio::spawn(async move { client.list_sessions().await });

        let request = read_message(&mut server).await.unwrap();
        assert!(matches!(request, Message::ListSessions));
        let sessions = vec![sample_record("s1")];
        write_message(&mut server, &Message::SessionList { sessions: sessions.clone() }).await.unwrap();

        assert_eq!(list_task.await.unwrap().unwrap(), sessions);
    }

    #[tokio::test]
    async fn create_session_surfaces_a_server_error() {
        let (client, mut server) = connected_pair().await;

        let create_task = tokio::spawn(async move { client.create_session(NewSession::new("dup", "bash")).await });

        let request = read_message(&mut server).await.unwrap();
        assert!(matches!(request, Message::CreateSession { .. }));
        write_message(&mut server, &Message::Error { message: "session id \"dup\" already exists".into() })
            .await
            .unwrap();

        let err = create_task.await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::Server(_)));
    }

    #[tokio::test]
    async fn attach_receives_snapshot_then_output_then_exit() {
        let (client, mut server) = connected_pair().await;
        let client_for_attach = client.clone();

        let attach_task = tokio::spawn(async move { client_for_attach.attach("s1").await });

        let request = read_message(&mut server).await.unwrap();
        assert!(matches!(request, Message::Attach { id } if id == "s1"));
        write_message(&mut server, &Message::Attached { session: sample_record("s1"), output: b"abc".to_vec() })
            .await
            .unwrap();

        let attachment = attach_task.await.unwrap().unwrap();
        assert_eq!(attachment.snapshot(), b"abc");

        write_message(&mut server, &Message::Output { bytes: b"def".to_vec() }).await.unwrap();
        match attachment.recv().await {
            Some(AttachmentEvent::Output(bytes)) => assert_eq!(bytes, b"def"),
            other => panic!("expected output, got {other:?}"),
        }

        write_message(&mut server, &Message::SessionExited { id: "s1".into(), exit_code: 0 }).await.unwrap();
        match attachment.recv().await {
            Some(AttachmentEvent::Exited(0)) => {},
            other => panic!("expected exit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn second_attach_is_rejected_while_one_is_live() {
        let (client, mut server) = connected_pair().await;
        let client_for_attach = client.clone();

        let attach_task = tokio::spawn(async move { client_for_attach.attach("s1").await });
        let _request = read_message(&mut server).await.unwrap();
        write_message(&mut server, &Message::Attached { session: sample_record("s1"), output: Vec::new() })
            .await
            .unwrap();
        let _attachment = attach_task.await.unwrap().unwrap();

        let err = client.attach("s2").await.unwrap_err();
        assert!(matches!(err, ClientError::AlreadyAttached));
    }

    #[tokio::test]
    async fn incompatible_protocol_versions_fail_the_handshake() {
        let (client_side, mut server_side) = tokio::io::duplex(4096);
        let client_task = tokio::spawn(Client::from_duplex(Box::new(client_side), 5));

        let _hello = read_message(&mut server_side).await.unwrap();
        write_message(&mut server_side, &Message::Hello { version: 200 }).await.unwrap();

        let err = client_task.await.unwrap().unwrap_err();
        assert!(matches!(err, ClientError::IncompatibleVersion { local: 5, remote: 200 }));
    }
}
