use crate::{PtySize, SessionError};

/// Operations common to every pseudo-terminal backend.
///
/// A broken pipe (EIO/EPIPE on Unix, `ERROR_BROKEN_PIPE` on Windows) surfaces
/// as `read` returning `0`, which callers interpret as child EOF.
pub trait Session: Send {
    /// Read bytes the child process has written to the pty. Returns `0` on
    /// EOF.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SessionError>;

    /// Write `input` to the pty in full, retrying short writes.
    fn write(&mut self, input: &[u8]) -> Result<usize, SessionError>;

    /// Resize the pseudo-terminal's window.
    fn resize(&mut self, size: PtySize) -> Result<(), SessionError>;

    /// Signal the child to terminate. `force=false` requests a graceful
    /// shutdown (`SIGTERM` on Unix; Windows has no equivalent through
    /// ConPTY, so the distinction collapses there and the child is always
    /// terminated unconditionally). `force=true` terminates the child
    /// unconditionally (`SIGKILL` / `TerminateProcess`).
    fn kill(&mut self, force: bool) -> Result<(), SessionError>;

    /// Block until the child exits, returning its translated exit code
    /// (POSIX: normal exit yields the exit status; a signal yields
    /// `128 + signal number`; Windows yields the raw exit `DWORD`).
    fn wait_for_exit(&mut self) -> Result<i32, SessionError>;

    /// OS process id of the child.
    fn process_id(&self) -> Option<u32>;

    /// Non-blocking check for whether the child has exited. Caches the exit
    /// code once observed so repeated calls are cheap.
    fn has_exited(&mut self) -> bool;

    /// The child's exit code, once known. `None` before exit.
    fn exit_code(&self) -> Option<i32>;
}

/// Integration point with Mio-based event loops. Only meaningful for
/// backends that expose a pollable file descriptor (Unix); a Windows ConPTY
/// session drives I/O through blocking reads on a dedicated thread instead.
pub trait Pollable: Send {
    /// Register the session's file descriptors with the provided registry.
    fn register(
        &mut self,
        registry: &mio::Registry,
        interest: mio::Interest,
        io_token: mio::Token,
        child_token: mio::Token,
    ) -> Result<(), SessionError>;

    /// Update the interest set associated with the registered descriptors.
    fn reregister(
        &mut self,
        registry: &mio::Registry,
        interest: mio::Interest,
        io_token: mio::Token,
        child_token: mio::Token,
    ) -> Result<(), SessionError>;

    /// Remove the session's resources from the registry.
    fn deregister(
        &mut self,
        registry: &mio::Registry,
    ) -> Result<(), SessionError>;
}
