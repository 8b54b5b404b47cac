use thiserror::Error;

/// Failures surfaced by [`crate::ManagedSession`] operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to spawn pty")]
    Pty(#[from] termalive_pty::SessionError),

    #[error("session has already exited")]
    AlreadyExited,

    #[cfg(unix)]
    #[error("failed to set up the session's event loop")]
    Poll(#[source] std::io::Error),
}
