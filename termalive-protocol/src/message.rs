//! Message catalogue and wire encoding.

use termalive_session::{SessionInfo, SessionState};

use crate::error::ProtocolError;
use crate::wire::{Reader, write_i32, write_string, write_u8, write_u16, write_u64};

pub const TYPE_HELLO: u8 = 0;
pub const TYPE_LIST_SESSIONS: u8 = 1;
pub const TYPE_SESSION_LIST: u8 = 2;
pub const TYPE_CREATE_SESSION: u8 = 3;
pub const TYPE_SESSION_CREATED: u8 = 4;
pub const TYPE_ATTACH: u8 = 5;
pub const TYPE_ATTACHED: u8 = 6;
pub const TYPE_DETACH: u8 = 7;
pub const TYPE_INPUT: u8 = 8;
pub const TYPE_OUTPUT: u8 = 9;
pub const TYPE_RESIZE: u8 = 10;
pub const TYPE_KILL_SESSION: u8 = 11;
pub const TYPE_SESSION_EXITED: u8 = 12;
pub const TYPE_ERROR: u8 = 255;

/// The version of this protocol spoken by this crate.
pub const PROTOCOL_VERSION: u8 = 1;

/// Sentinel for an absent exit code on the wire.
pub const NO_EXIT_CODE: i32 = -1;

/// The `(id, command, working_directory_or_empty, state, created_ms,
/// exit_code_or_neg1, columns, rows)` wire record.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionRecord {
    pub id: String,
    pub command: String,
    pub working_directory: String,
    pub state: u8,
    pub created_ms_since_epoch: u64,
    pub exit_code: i32,
    pub columns: u16,
    pub rows: u16,
}

impl From<&SessionInfo> for SessionRecord {
    fn from(info: &SessionInfo) -> Self {
        Self {
            id: info.id.clone(),
            command: info.command.clone(),
            working_directory: info
                .working_directory
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            state: encode_state(info.state),
            created_ms_since_epoch: info.created_ms_since_epoch,
            exit_code: info.exit_code.unwrap_or(NO_EXIT_CODE),
            columns: info.columns,
            rows: info.rows,
        }
    }
}

#[must_use]
pub fn encode_state(state: SessionState) -> u8 {
    match state {
        SessionState::Starting => 0,
        SessionState::Running => 1,
        SessionState::Exiting => 2,
        SessionState::Exited => 3,
        SessionState::Failed => 4,
    }
}

impl SessionRecord {
    pub(crate) fn write(&self, buf: &mut Vec<u8>) {
        write_string(buf, &self.id);
        write_string(buf, &self.command);
        write_string(buf, &self.working_directory);
        write_u8(buf, self.state);
        write_u64(buf, self.created_ms_since_epoch);
        write_i32(buf, self.exit_code);
        write_u16(buf, self.columns);
        write_u16(buf, self.rows);
    }

    pub(crate) fn read(reader: &mut Reader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            id: reader.read_string()?,
            command: reader.read_string()?,
            working_directory: reader.read_string()?,
            state: reader.read_u8()?,
            created_ms_since_epoch: reader.read_u64()?,
            exit_code: reader.read_i32()?,
            columns: reader.read_u16()?,
            rows: reader.read_u16()?,
        })
    }
}

/// Every message exchanged between a session host and its clients.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Hello { version: u8 },
    ListSessions,
    SessionList { sessions: Vec<SessionRecord> },
    CreateSession {
        id: String,
        command: String,
        working_directory: String,
        columns: u16,
        rows: u16,
        arguments: Vec<String>,
        environment: Vec<(String, String)>,
    },
    SessionCreated { session: SessionRecord },
    Attach { id: String },
    Attached { session: SessionRecord, output: Vec<u8> },
    Detach,
    Input { bytes: Vec<u8> },
    Output { bytes: Vec<u8> },
    Resize { columns: u16, rows: u16 },
    KillSession { id: String, force: bool },
    SessionExited { id: String, exit_code: i32 },
    Error { message: String },
}

impl Message {
    #[must_use]
    pub fn type_code(&self) -> u8 {
        match self {
            Message::Hello { .. } => TYPE_HELLO,
            Message::ListSessions => TYPE_LIST_SESSIONS,
            Message::SessionList { .. } => TYPE_SESSION_LIST,
            Message::CreateSession { .. } => TYPE_CREATE_SESSION,
            Message::SessionCreated { .. } => TYPE_SESSION_CREATED,
            Message::Attach { .. } => TYPE_ATTACH,
            Message::Attached { .. } => TYPE_ATTACHED,
            Message::Detach => TYPE_DETACH,
            Message::Input { .. } => TYPE_INPUT,
            Message::Output { .. } => TYPE_OUTPUT,
            Message::Resize { .. } => TYPE_RESIZE,
            Message::KillSession { .. } => TYPE_KILL_SESSION,
            Message::SessionExited { .. } => TYPE_SESSION_EXITED,
            Message::Error { .. } => TYPE_ERROR,
        }
    }

    /// Encode the payload only (no frame length/type header); used by
    /// [`crate::codec::encode_frame`] and directly by tests.
    #[must_use]
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Message::Hello { version } => write_u8(&mut buf, *version),
            Message::ListSessions | Message::Detach => {},
            Message::SessionList { sessions } => {
                write_u16(&mut buf, sessions.len() as u16);
                for session in sessions {
                    session.write(&mut buf);
                }
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
                write_string(&mut buf, id);
                write_string(&mut buf, command);
                write_string(&mut buf, working_directory);
                write_u16(&mut buf, *columns);
                write_u16(&mut buf, *rows);
                write_u16(&mut buf, arguments.len() as u16);
                for arg in arguments {
                    write_string(&mut buf, arg);
                }
                write_u16(&mut buf, environment.len() as u16);
                for (key, value) in environment {
                    write_string(&mut buf, key);
                    write_string(&mut buf, value);
                }
            },
            Message::SessionCreated { session } => session.write(&mut buf),
            Message::Attach { id } => buf.extend_from_slice(id.as_bytes()),
            Message::Attached { session, output } => {
                session.write(&mut buf);
                write_i32(&mut buf, output.len() as i32);
                buf.extend_from_slice(output);
            },
            Message::Input { bytes } | Message::Output { bytes } => {
                buf.extend_from_slice(bytes);
            },
            Message::Resize { columns, rows } => {
                write_u16(&mut buf, *columns);
                write_u16(&mut buf, *rows);
            },
            Message::KillSession { id, force } => {
                write_string(&mut buf, id);
                write_u8(&mut buf, u8::from(*force));
            },
            Message::SessionExited { id, exit_code } => {
                write_string(&mut buf, id);
                write_i32(&mut buf, *exit_code);
            },
            Message::Error { message } => buf.extend_from_slice(message.as_bytes()),
        }
        buf
    }

    /// Decode a message body given its type byte and raw payload.
    pub fn decode(type_code: u8, payload: &[u8]) -> Result<Self, ProtocolError> {
        let mut reader = Reader::new(payload);
        let message = match type_code {
            TYPE_HELLO => Message::Hello { version: reader.read_u8()? },
            TYPE_LIST_SESSIONS => Message::ListSessions,
            TYPE_SESSION_LIST => {
                let count = reader.read_u16()?;
                let mut sessions = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    sessions.push(SessionRecord::read(&mut reader)?);
                }
                Message::SessionList { sessions }
            },
            TYPE_CREATE_SESSION => {
                let id = reader.read_string()?;
                let command = reader.read_string()?;
                let working_directory = reader.read_string()?;
                let columns = reader.read_u16()?;
                let rows = reader.read_u16()?;
                let argc = reader.read_u16()?;
                let mut arguments = Vec::with_capacity(argc as usize);
                for _ in 0..argc {
                    arguments.push(reader.read_string()?);
                }
                let envc = reader.read_u16()?;
                let mut environment = Vec::with_capacity(envc as usize);
                for _ in 0..envc {
                    let key = reader.read_string()?;
                    let value = reader.read_string()?;
                    environment.push((key, value));
                }
                Message::CreateSession {
                    id,
                    command,
                    working_directory,
                    columns,
                    rows,
                    arguments,
                    environment,
                }
            },
            TYPE_SESSION_CREATED => {
                Message::SessionCreated { session: SessionRecord::read(&mut reader)? }
            },
            TYPE_ATTACH => {
                Message::Attach { id: String::from_utf8(reader.read_rest())? }
            },
            TYPE_ATTACHED => {
                let session = SessionRecord::read(&mut reader)?;
                let output_len = reader.read_i32()?;
                if output_len < 0 {
                    return Err(ProtocolError::Malformed("negative output_len"));
                }
                let output = reader.read_bytes(output_len as usize)?;
                Message::Attached { session, output }
            },
            TYPE_DETACH => Message::Detach,
            TYPE_INPUT => Message::Input { bytes: reader.read_rest() },
            TYPE_OUTPUT => Message::Output { bytes: reader.read_rest() },
            TYPE_RESIZE => Message::Resize {
                columns: reader.read_u16()?,
                rows: reader.read_u16()?,
            },
            TYPE_KILL_SESSION => {
                let id = reader.read_string()?;
                let force = reader.read_u8()? != 0;
                Message::KillSession { id, force }
            },
            TYPE_SESSION_EXITED => {
                let id = reader.read_string()?;
                let exit_code = reader.read_i32()?;
                Message::SessionExited { id, exit_code }
            },
            TYPE_ERROR => {
                Message::Error { message: String::from_utf8(reader.read_rest())? }
            },
            other => return Err(ProtocolError::UnknownMessageType(other)),
        };
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> SessionRecord {
        SessionRecord {
            id: "abc".into(),
            command: "bash -l".into(),
            working_directory: "/home/user".into(),
            state: 1,
            created_ms_since_epoch: 1_700_000_000_000,
            exit_code: NO_EXIT_CODE,
            columns: 80,
            rows: 24,
        }
    }

    #[test]
    fn output_round_trips_exactly() {
        let msg = Message::Output { bytes: b"Hi".to_vec() };
        let payload = msg.encode_payload();
        assert_eq!(payload, b"Hi");
        let decoded = Message::decode(TYPE_OUTPUT, &payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn session_created_round_trips() {
        let msg = Message::SessionCreated { session: sample_record() };
        let payload = msg.encode_payload();
        let decoded = Message::decode(TYPE_SESSION_CREATED, &payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn create_session_preserves_argument_and_env_order() {
        let msg = Message::CreateSession {
            id: "s1".into(),
            command: "bash".into(),
            working_directory: String::new(),
            columns: 80,
            rows: 24,
            arguments: vec!["-l".into(), "-i".into()],
            environment: vec![("B".into(), "2".into()), ("A".into(), "1".into())],
        };
        let payload = msg.encode_payload();
        let decoded = Message::decode(TYPE_CREATE_SESSION, &payload).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn attach_payload_is_the_raw_id_with_no_extra_framing() {
        let msg = Message::Attach { id: "session-42".into() };
        assert_eq!(msg.encode_payload(), b"session-42");
    }

    #[test]
    fn unknown_type_code_is_rejected() {
        let err = Message::decode(200, &[]).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownMessageType(200)));
    }
}
