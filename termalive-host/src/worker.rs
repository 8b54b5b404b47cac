//! Per-client worker: handshake, then a read-dispatch loop. Each accepted connection is split into independent
//! read/write halves so a spawned forwarder task can write `Output` frames
//! onto the same connection the main loop is writing replies on.

use std::path::PathBuf;
use std::sync::Arc;

use termalive_protocol::{Message, ProtocolError, read_message, write_message};
use termalive_session::{OutputStream, SessionEvent, SessionOptions};
use termalive_transport::BoxedDuplex;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::sync::{Mutex, oneshot};

use crate::error::HostError;
use crate::host::SessionHost;

type Writer = Arc<Mutex<WriteHalf<BoxedDuplex>>>;

/// The client's single live subscription, if any: a client has at most
/// one active attachment at a time.
struct Attachment {
    session_id: String,
    cancel: oneshot::Sender<()>,
    forwarder: tokio::task::JoinHandle<()>,
}

impl Attachment {
    /// Cancel the forwarder and drop the handle without waiting for it;
    /// the forwarder's own select loop exits promptly on the cancel signal.
    fn cancel(self) {
        let _ = self.cancel.send(());
        self.forwarder.abort();
    }
}

/// Runs the full lifetime of one client connection.
pub(crate) async fn run_client(host: Arc<SessionHost>, stream: BoxedDuplex) {
    let (mut reader, writer) = tokio::io::split(stream);
    let writer: Writer = Arc::new(Mutex::new(writer));

    if let Err(err) = handshake(&mut reader, &writer, host.config().protocol_version).await {
        log::warn!("client handshake failed: {err}");
        return;
    }

    let mut attachment: Option<Attachment> = None;

    loop {
        let message = match read_message(&mut reader).await {
            Ok(message) => message,
            Err(ProtocolError::Closed) => break,
            Err(err) => {
                log::warn!("client protocol error: {err}");
                send(&writer, &Message::Error { message: err.to_string() }).await;
                break;
            },
        };

        match dispatch(&host, &writer, &mut attachment, message).await {
            Ok(()) => {},
            Err(err) => send(&writer, &Message::Error { message: err.to_string() }).await,
        }
    }

    if let Some(attachment) = attachment.take() {
        attachment.cancel();
    }
}

async fn handshake(
    reader: &mut ReadHalf<BoxedDuplex>,
    writer: &Writer,
    version: u8,
) -> Result<(), ProtocolError> {
    send(writer, &Message::Hello { version }).await;
    match read_message(reader).await? {
        Message::Hello { version: peer } => {
            let (lo, hi) = (version.min(peer), version.max(peer));
            if hi > lo + 1 {
                return Err(ProtocolError::Malformed("incompatible protocol version"));
            }
            Ok(())
        },
        _ => Err(ProtocolError::Malformed("expected Hello as the first message")),
    }
}

async fn send(writer: &Writer, message: &Message) {
    let mut guard = writer.lock().await;
    if let Err(err) = write_message(&mut *guard, message).await {
        log::debug!("failed writing {:?} to client: {err}", message.type_code());
    }
}

async fn dispatch(
    host: &Arc<SessionHost>,
    writer: &Writer,
    attachment: &mut Option<Attachment>,
    message: Message,
) -> Result<(), HostError> {
    match message {
        Message::ListSessions => {
            send(writer, &Message::SessionList { sessions: host.list_sessions() }).await;
        },

        Message::CreateSession {
            id,
            command,
            working_directory,
            columns,
            rows,
            arguments,
            environment,
        } => {
            let mut options = SessionOptions::new(id, command)
                .with_args(arguments)
                .with_size(columns, rows);
            options.environment = environment;
            if !working_directory.is_empty() {
                options = options.with_cwd(PathBuf::from(working_directory));
            }
            let session = host.create_session(options).await?;
            send(writer, &Message::SessionCreated { session }).await;
        },

        Message::Attach { id } => {
            let (session, snapshot, stream) = host.attach(&id)?;
            if let Some(previous) = attachment.take() {
                previous.cancel();
            }
            send(writer, &Message::Attached { session, output: snapshot }).await;
            *attachment = Some(spawn_forwarder(id, stream, Arc::clone(writer)));
        },

        Message::Detach => {
            if let Some(previous) = attachment.take() {
                previous.cancel();
            }
        },

        Message::Input { bytes } => {
            if let Some(current) = attachment.as_ref() {
                host.send_input(&current.session_id, bytes).await?;
            }
        },

        Message::Resize { columns, rows } => {
            if let Some(current) = attachment.as_ref() {
                host.resize(&current.session_id, columns, rows).await?;
            }
        },

        Message::KillSession { id, force } => {
            host.kill_session(&id, force).await?;
        },

        Message::Hello { .. }
        | Message::SessionList { .. }
        | Message::SessionCreated { .. }
        | Message::Attached { .. }
        | Message::Output { .. }
        | Message::SessionExited { .. }
        | Message::Error { .. } => {
            return Err(HostError::Protocol(ProtocolError::Malformed(
                "message is not valid in the client-to-server direction",
            )));
        },
    }
    Ok(())
}

/// Drains a session's output stream onto the connection until it is
/// cancelled (Detach, a replacing Attach, or disconnect) or the session
/// exits, in which case a single `SessionExited` is sent as the last frame.
fn spawn_forwarder(session_id: String, stream: OutputStream, writer: Writer) -> Attachment {
    let (cancel_tx, mut cancel_rx) = oneshot::channel();
    let forwarder_session_id = session_id.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut cancel_rx => break,
                event = stream.recv_async() => match event {
                    Some(SessionEvent::Output(bytes)) => {
                        send(&writer, &Message::Output { bytes }).await;
                    },
                    Some(SessionEvent::Exited(exit_code)) => {
                        send(&writer, &Message::SessionExited {
                            id: forwarder_session_id.clone(),
                            exit_code,
                        }).await;
                        break;
                    },
                    None => break,
                },
            }
        }
    });
    Attachment { session_id, cancel: cancel_tx, forwarder }
}
