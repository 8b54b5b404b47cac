//! In-memory [`Session`] double used by higher level crates to exercise pty
//! consumers without spawning a real child process.

use std::collections::VecDeque;

use crate::session::Session;
use crate::{PtySize, SessionError};

/// Scripted pseudo-terminal session that returns pre-recorded output chunks
/// and records everything written to it.
#[derive(Default)]
pub struct FakeSession {
    pending_reads: VecDeque<Vec<u8>>,
    writes: Vec<Vec<u8>>,
    sizes: Vec<PtySize>,
    exit_code: Option<i32>,
    killed: bool,
}

impl FakeSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chunk of bytes to be returned by a future `read` call.
    pub fn push_output(&mut self, chunk: impl Into<Vec<u8>>) {
        self.pending_reads.push_back(chunk.into());
    }

    /// Every byte slice written to the session so far, in order.
    #[must_use]
    pub fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Every resize request made against the session so far, in order.
    #[must_use]
    pub fn resizes(&self) -> &[PtySize] {
        &self.sizes
    }

    #[must_use]
    pub fn was_killed(&self) -> bool {
        self.killed
    }

    /// Make the session report as exited with the given code, as if the
    /// child had terminated on its own.
    pub fn simulate_exit(&mut self, code: i32) {
        self.exit_code = Some(code);
    }
}

impl Session for FakeSession {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SessionError> {
        let Some(mut chunk) = self.pending_reads.pop_front() else {
            return Ok(0);
        };

        if chunk.len() <= buf.len() {
            buf[..chunk.len()].copy_from_slice(&chunk);
            Ok(chunk.len())
        } else {
            let remainder = chunk.split_off(buf.len());
            buf.copy_from_slice(&chunk);
            self.pending_reads.push_front(remainder);
            Ok(buf.len())
        }
    }

    fn write(&mut self, input: &[u8]) -> Result<usize, SessionError> {
        self.writes.push(input.to_vec());
        Ok(input.len())
    }

    fn resize(&mut self, size: PtySize) -> Result<(), SessionError> {
        self.sizes.push(size);
        Ok(())
    }

    fn kill(&mut self, _force: bool) -> Result<(), SessionError> {
        self.killed = true;
        if self.exit_code.is_none() {
            self.exit_code = Some(0);
        }
        Ok(())
    }

    fn wait_for_exit(&mut self) -> Result<i32, SessionError> {
        Ok(self.exit_code.unwrap_or(0))
    }

    fn process_id(&self) -> Option<u32> {
        None
    }

    fn has_exited(&mut self) -> bool {
        self.exit_code.is_some()
    }

    fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reassembles_queued_chunks_across_small_buffers() {
        let mut session = FakeSession::new();
        session.push_output(b"hello ".to_vec());
        session.push_output(b"world".to_vec());

        let mut out = Vec::new();
        let mut buf = [0u8; 4];
        loop {
            let n = session.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }

        assert_eq!(out, b"hello world");
    }

    #[test]
    fn records_writes_and_resizes() {
        let mut session = FakeSession::new();
        session.write(b"ls\n").unwrap();
        session.resize(PtySize { rows: 40, cols: 100, cell_width: 0, cell_height: 0 }).unwrap();

        assert_eq!(session.writes(), &[b"ls\n".to_vec()]);
        assert_eq!(session.resizes().len(), 1);
    }

    #[test]
    fn kill_marks_exit_when_unset() {
        let mut session = FakeSession::new();
        assert!(!session.has_exited());
        session.kill(false).unwrap();
        assert!(session.was_killed());
        assert_eq!(session.wait_for_exit().unwrap(), 0);
    }

    #[test]
    fn simulated_exit_is_observable_before_kill() {
        let mut session = FakeSession::new();
        session.simulate_exit(17);
        assert!(session.has_exited());
        assert_eq!(session.exit_code(), Some(17));
    }
}
