use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use termalive_pty::{PtyOptions, Session as PtySession};
use termalive_screen::{RingBuffer, ScreenBuffer};

use crate::error::SessionError;
use crate::info::{SessionInfo, SessionState, now_ms_since_epoch};
use crate::options::SessionOptions;
use crate::pump::{self, PumpContext, PumpHandle};
use crate::subscriber::{OutputStream, Subscribers};

/// A running pty bound to a screen buffer, an output ring and a set of
/// fan-out subscribers.
pub struct ManagedSession {
    id: String,
    command: String,
    arguments: Vec<String>,
    working_directory: Option<std::path::PathBuf>,
    created_ms_since_epoch: u64,
    created: Instant,
    idle_timeout: Option<Duration>,

    pty: Arc<Mutex<Box<dyn PtySession>>>,
    screen: Arc<Mutex<ScreenBuffer>>,
    ring: Arc<RingBuffer>,
    subscribers: Arc<Subscribers>,
    size: Mutex<(u16, u16)>,
    state: Arc<Mutex<SessionState>>,
    exit_code: Arc<Mutex<Option<i32>>>,
    last_activity: Mutex<Instant>,
    subscriber_capacity: usize,

    pump: Mutex<Option<PumpHandle>>,
}

impl ManagedSession {
    /// Spawn a new pty and its read pump.
    pub fn spawn(options: SessionOptions) -> Result<Arc<Self>, SessionError> {
        let pty_options = PtyOptions {
            command: options.command.clone(),
            arguments: options.arguments.clone(),
            working_directory: options.working_directory.clone(),
            environment: options.environment.clone(),
            columns: options.columns,
            rows: options.rows,
        };

        let pty = termalive_pty::spawn(pty_options)?;
        let screen = ScreenBuffer::new(options.columns as usize, options.rows as usize);
        let ring = Arc::new(RingBuffer::new(options.ring_capacity));
        let subscribers = Subscribers::new();
        let state = Arc::new(Mutex::new(SessionState::Starting));
        let exit_code = Arc::new(Mutex::new(None));
        let pty = Arc::new(Mutex::new(Box::new(pty) as Box<dyn PtySession>));
        let screen = Arc::new(Mutex::new(screen));

        let pump = pump::spawn(PumpContext {
            pty: Arc::clone(&pty),
            screen: Arc::clone(&screen),
            ring: Arc::clone(&ring),
            subscribers: Arc::clone(&subscribers),
            state: Arc::clone(&state),
            exit_code: Arc::clone(&exit_code),
        });

        Ok(Arc::new(Self {
            id: options.id,
            command: options.command,
            arguments: options.arguments,
            working_directory: options.working_directory,
            created_ms_since_epoch: now_ms_since_epoch(),
            created: Instant::now(),
            idle_timeout: options.idle_timeout,
            pty,
            screen,
            ring,
            subscribers,
            size: Mutex::new((options.columns, options.rows)),
            state,
            exit_code,
            last_activity: Mutex::new(Instant::now()),
            subscriber_capacity: options.subscriber_capacity,
            pump: Mutex::new(Some(pump)),
        }))
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        *self.state.lock().expect("state mutex poisoned")
    }

    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_code.lock().expect("exit code mutex poisoned")
    }

    #[must_use]
    pub fn info(&self) -> SessionInfo {
        let (columns, rows) = *self.size.lock().expect("size mutex poisoned");
        SessionInfo {
            id: self.id.clone(),
            command: self.command_line(),
            working_directory: self.working_directory.clone(),
            state: self.state(),
            created_ms_since_epoch: self.created_ms_since_epoch,
            exit_code: self.exit_code(),
            columns,
            rows,
        }
    }

    fn command_line(&self) -> String {
        if self.arguments.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.arguments.join(" "))
        }
    }

    /// Register a new subscriber, returning a snapshot of recent output and
    /// a stream of everything produced from this point on. The ring
    /// snapshot and the subscription are registered under the same
    /// subscribers-list critical section the pump also takes before writing
    /// to the ring, so no byte is ever missed or doubled.
    #[must_use]
    pub fn subscribe(&self) -> (Vec<u8>, OutputStream) {
        // Lock order subscribers -> ring -> screen.
        let (snapshot, id, receiver) =
            self.subscribers.register_with_snapshot(self.subscriber_capacity, &self.ring);
        let stream = OutputStream::new(id, receiver, Arc::clone(&self.subscribers));
        (snapshot, stream)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Forward bytes to the child and mark the session active.
    pub fn send_input(&self, bytes: &[u8]) -> Result<(), SessionError> {
        self.touch();
        let mut pty = self.pty.lock().expect("pty mutex poisoned");
        pty.write(bytes)?;
        Ok(())
    }

    /// Resize the pty and reset the screen buffer at the new dimensions.
    /// Contents are cleared; the ring is untouched for callers that want
    /// to reconstruct history.
    pub fn resize(&self, columns: u16, rows: u16) -> Result<(), SessionError> {
        self.touch();
        {
            let mut pty = self.pty.lock().expect("pty mutex poisoned");
            pty.resize(termalive_pty::PtySize {
                cols: columns,
                rows,
                cell_width: 0,
                cell_height: 0,
            })?;
        }
        *self.screen.lock().expect("screen mutex poisoned") =
            ScreenBuffer::new(columns as usize, rows as usize);
        *self.size.lock().expect("size mutex poisoned") = (columns, rows);
        Ok(())
    }

    /// Terminate the child and stop the pump (state machine:
    /// Running -(kill/exit)-> Exiting -> Exited).
    pub fn kill(&self, force: bool) -> Result<(), SessionError> {
        *self.state.lock().expect("state mutex poisoned") = SessionState::Exiting;
        {
            let mut pty = self.pty.lock().expect("pty mutex poisoned");
            pty.kill(force)?;
        }
        if let Some(pump) = self.pump.lock().expect("pump mutex poisoned").as_ref() {
            pump.request_shutdown();
        }
        Ok(())
    }

    fn touch(&self) {
        *self.last_activity.lock().expect("activity mutex poisoned") = Instant::now();
    }

    /// Age since the last input/resize/attach activity, used by the host's
    /// idle sweep.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .expect("activity mutex poisoned")
            .elapsed()
    }

    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout
    }

    #[must_use]
    pub fn is_idle_expired(&self) -> bool {
        match self.idle_timeout {
            Some(timeout) => self.idle_for() >= timeout,
            None => false,
        }
    }

    /// Read-only access to the live screen buffer.
    pub fn with_screen<R>(&self, f: impl FnOnce(&ScreenBuffer) -> R) -> R {
        let screen = self.screen.lock().expect("screen mutex poisoned");
        f(&screen)
    }

    #[must_use]
    pub fn uptime(&self) -> Duration {
        self.created.elapsed()
    }
}

impl Drop for ManagedSession {
    /// Closes the pty, drains the pump and notifies every subscriber.
    fn drop(&mut self) {
        if !self.state().is_terminal() {
            let _ = self.kill(true);
        }
        if let Some(pump) = self.pump.lock().expect("pump mutex poisoned").take() {
            if let Some(join) = pump.join {
                let _ = join.join();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait_until(mut pred: impl FnMut() -> bool, timeout: Duration) -> bool {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if pred() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        pred()
    }

    #[cfg(unix)]
    #[test]
    fn echoes_input_to_subscribers_and_reports_exit() {
        let options = SessionOptions::new("echo-session", "/bin/cat").with_size(80, 24);
        let session = ManagedSession::spawn(options).expect("spawn cat");

        let (snapshot, stream) = session.subscribe();
        assert!(snapshot.is_empty());

        session.send_input(b"hello\n").expect("write to pty");

        let mut collected = Vec::new();
        while collected.len() < b"hello\n".len() {
            match stream.recv() {
                Some(crate::subscriber::SessionEvent::Output(bytes)) => {
                    collected.extend_from_slice(&bytes)
                },
                Some(crate::subscriber::SessionEvent::Exited(_)) | None => break,
            }
        }
        assert!(String::from_utf8_lossy(&collected).contains("hello"));

        session.kill(true).expect("kill cat");
        assert!(wait_until(
            || session.state().is_terminal(),
            Duration::from_secs(2)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn resize_clears_the_screen_buffer_dimensions() {
        let options = SessionOptions::new("resize-session", "/bin/cat").with_size(80, 24);
        let session = ManagedSession::spawn(options).expect("spawn cat");
        session.resize(100, 40).expect("resize");
        assert_eq!(session.info().columns, 100);
        assert_eq!(session.info().rows, 40);
        session.with_screen(|screen| {
            assert_eq!(screen.width(), 100);
            assert_eq!(screen.height(), 40);
        });
        let _ = session.kill(true);
    }
}
