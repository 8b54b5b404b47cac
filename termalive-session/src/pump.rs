//! The per-session read pump.
//!
//! One dedicated thread per session: `read -> parser.advance -> (ring.write
//! + fan-out)`. The ring write and the fan-out to subscribers happen under
//! one lock (see [`Subscribers::write_and_broadcast`]) so a subscription
//! registered concurrently with a read never sees a chunk twice or not at
//! all. No other task ever calls `parser.advance`, so parsing within a
//! single session is always serial.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use termalive_pty::Session as PtySession;
use termalive_screen::{RingBuffer, ScreenBuffer};
use termalive_vte::Parser;

use crate::info::SessionState;
use crate::subscriber::Subscribers;

const READ_CHUNK: usize = 8192;

pub(crate) struct PumpHandle {
    pub(crate) shutdown: Arc<AtomicBool>,
    pub(crate) join: Option<std::thread::JoinHandle<()>>,
}

impl PumpHandle {
    pub(crate) fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

pub(crate) struct PumpContext {
    pub(crate) pty: Arc<Mutex<Box<dyn PtySession>>>,
    pub(crate) screen: Arc<Mutex<ScreenBuffer>>,
    pub(crate) ring: Arc<RingBuffer>,
    pub(crate) subscribers: Arc<Subscribers>,
    pub(crate) state: Arc<Mutex<SessionState>>,
    pub(crate) exit_code: Arc<Mutex<Option<i32>>>,
}

pub(crate) fn spawn(ctx: PumpContext) -> PumpHandle {
    let shutdown = Arc::new(AtomicBool::new(false));
    let thread_shutdown = Arc::clone(&shutdown);

    let join = std::thread::Builder::new()
        .name("termalive-session-pump".into())
        .spawn(move || run(ctx, thread_shutdown))
        .expect("failed to spawn session pump thread");

    PumpHandle { shutdown, join: Some(join) }
}

fn run(ctx: PumpContext, shutdown: Arc<AtomicBool>) {
    let mut parser = Parser::new();
    let mut buf = [0u8; READ_CHUNK];

    *ctx.state.lock().expect("state mutex poisoned") = SessionState::Running;

    let exit_code = loop {
        if shutdown.load(Ordering::SeqCst) {
            break -1;
        }

        let read_result = wait_and_read(&ctx.pty, &mut buf, &shutdown);
        match read_result {
            ReadOutcome::Data(n) => {
                let chunk = &buf[..n];
                {
                    let mut screen = ctx.screen.lock().expect("screen mutex poisoned");
                    parser.advance(chunk, &mut *screen);
                }
                ctx.subscribers.write_and_broadcast(&ctx.ring, chunk);
            },
            ReadOutcome::Eof => break 0,
            ReadOutcome::Shutdown => break -1,
            ReadOutcome::Error => {
                *ctx.state.lock().expect("state mutex poisoned") = SessionState::Failed;
                break wait_for_child_exit_code(&ctx.pty);
            },
        }
    };

    let final_code = if exit_code >= 0 {
        exit_code
    } else {
        wait_for_child_exit_code(&ctx.pty)
    };

    *ctx.exit_code.lock().expect("exit code mutex poisoned") = Some(final_code);
    let mut state = ctx.state.lock().expect("state mutex poisoned");
    if *state != SessionState::Failed {
        *state = SessionState::Exited;
    }
    drop(state);

    ctx.subscribers.broadcast_exit(final_code);
}

fn wait_for_child_exit_code(pty: &Arc<Mutex<Box<dyn PtySession>>>) -> i32 {
    let mut pty = pty.lock().expect("pty mutex poisoned");
    pty.wait_for_exit().unwrap_or(0)
}

enum ReadOutcome {
    Data(usize),
    Eof,
    Shutdown,
    Error,
}

#[cfg(unix)]
fn wait_and_read(
    pty: &Arc<Mutex<Box<dyn PtySession>>>,
    buf: &mut [u8],
    shutdown: &Arc<AtomicBool>,
) -> ReadOutcome {
    use std::io::ErrorKind;
    use std::time::Duration;

    loop {
        if shutdown.load(Ordering::SeqCst) {
            return ReadOutcome::Shutdown;
        }

        let mut guard = pty.lock().expect("pty mutex poisoned");
        match guard.read(buf) {
            Ok(0) => return ReadOutcome::Eof,
            Ok(n) => return ReadOutcome::Data(n),
            Err(termalive_pty::SessionError::IO(err))
                if err.kind() == ErrorKind::WouldBlock =>
            {
                drop(guard);
                // Non-blocking master fd: the readability edge is only
                // available via the session's Pollable registration in a
                // real mio event loop; this thread has none of its own, so
                // it parks briefly and retries instead of busy-spinning.
                std::thread::sleep(Duration::from_millis(4));
            },
            Err(_) => return ReadOutcome::Error,
        }
    }
}

#[cfg(windows)]
fn wait_and_read(
    pty: &Arc<Mutex<Box<dyn PtySession>>>,
    buf: &mut [u8],
    shutdown: &Arc<AtomicBool>,
) -> ReadOutcome {
    if shutdown.load(Ordering::SeqCst) {
        return ReadOutcome::Shutdown;
    }

    // ConPTY's ReadFile is synchronous; this thread blocks in it exactly as
    // the pty's own dedicated I/O thread would. Holding the pty mutex for
    // the duration briefly delays a concurrent `send_input`/`resize`, which
    // is the one platform-specific tradeoff recorded in DESIGN.md.
    let mut guard = pty.lock().expect("pty mutex poisoned");
    match guard.read(buf) {
        Ok(0) => ReadOutcome::Eof,
        Ok(n) => ReadOutcome::Data(n),
        Err(_) => ReadOutcome::Error,
    }
}
