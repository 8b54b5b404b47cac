//! Core traits and re-exports for interacting with pseudo-terminal sessions.
//!
//! This crate exposes two platform backends behind a single [`Session`]
//! abstraction:
//! - [`unix::spawn`] uses `forkpty`/`openpty` plus `setsid`/`TIOCSCTTY` to
//!   launch a local command attached to a real pty, and drives a SIGCHLD
//!   pipe so exit notifications integrate with a Mio event loop.
//! - [`windows::spawn`] uses the Win32 ConPTY API, driving I/O over
//!   synchronous pipe handles from a dedicated thread rather than Mio.
//!
//! [`fake::FakeSession`] is a scriptable in-memory double for testing code
//! that consumes a [`Session`] without spawning a real child process.

mod errors;
mod fake;
mod options;
mod session;
mod size;
#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

pub use errors::{PtyCreateError, SessionError};
pub use fake::FakeSession;
pub use options::PtyOptions;
pub use session::{Pollable, Session};
pub use size::PtySize;
#[cfg(unix)]
pub use unix::{UnixSession, UnixSessionBuilder, unix};
#[cfg(windows)]
pub use windows::WindowsSession;

/// Spawn the pseudo-terminal backend appropriate for the current platform.
#[cfg(unix)]
pub fn spawn(options: PtyOptions) -> Result<UnixSession, SessionError> {
    unix::spawn(options)
}

/// Spawn the pseudo-terminal backend appropriate for the current platform.
#[cfg(windows)]
pub fn spawn(options: PtyOptions) -> Result<WindowsSession, SessionError> {
    windows::spawn(options)
}
