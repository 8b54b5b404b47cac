use std::io;

#[cfg(unix)]
use nix::errno::Errno;
use thiserror::Error;

/// Wraps the OS error code observed when constructing a pseudo-terminal
/// fails.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("failed to create pty (os error {code})")]
pub struct PtyCreateError {
    pub code: i32,
}

impl PtyCreateError {
    #[must_use]
    pub fn from_last_os_error() -> Self {
        Self {
            code: io::Error::last_os_error().raw_os_error().unwrap_or(-1),
        }
    }

    #[must_use]
    pub fn from_io_error(err: &io::Error) -> Self {
        Self {
            code: err.raw_os_error().unwrap_or(-1),
        }
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[cfg(unix)]
    #[error("error from *nix bindings")]
    Nix(#[from] Errno),

    #[error("error from pty I/O")]
    IO(#[from] io::Error),

    #[error("failed to spawn pty")]
    Create(#[from] PtyCreateError),

    #[error("failed to resize pty")]
    Resize(io::Error),
}
