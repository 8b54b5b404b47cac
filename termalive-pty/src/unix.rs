//! Unix PTY backend that launches local child processes and exposes them
//! through the shared `Session` abstraction.

use std::convert::TryFrom;
use std::env;
use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd};
use std::os::unix::net::UnixStream;
use std::os::unix::process::{CommandExt, ExitStatusExt};
use std::path::PathBuf;
use std::process::{Child, Command};

use mio::Token;
use mio::unix::SourceFd;
use nix::libc;
use nix::pty::openpty;
use signal_hook::{
    SigId,
    low_level::{self, pipe},
};

use crate::options::PtyOptions;
use crate::session::{Pollable, Session};
use crate::{PtySize, SessionError};

/// Local pseudo terminal session that owns the spawned child process.
pub struct UnixSession {
    master: File,
    child: Child,
    signal_pipe: UnixStream,
    signal_pipe_id: SigId,
    exit_code: Option<i32>,
}

impl UnixSession {
    fn new(
        master: File,
        child: Child,
        signal_pipe: UnixStream,
        signal_pipe_id: SigId,
    ) -> Self {
        Self { master, child, signal_pipe, signal_pipe_id, exit_code: None }
    }

    fn translate_exit(status: std::process::ExitStatus) -> i32 {
        if let Some(code) = status.code() {
            return code;
        }
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
        -1
    }

    /// Drain the SIGCHLD notification pipe, returning whether a byte was
    /// available. Used to avoid blocking on the signal pipe before the child
    /// actually has a pending wait status.
    fn drain_signal_pipe(&mut self) -> Result<bool, SessionError> {
        let mut tmp = [0u8; 1];
        match self.signal_pipe.read(&mut tmp) {
            Ok(0) => Ok(false),
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
            Err(e) => Err(SessionError::IO(e)),
        }
    }
}

impl Session for UnixSession {
    /// Read bytes produced by the child process from the PTY master.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SessionError> {
        loop {
            match self.master.read(buf) {
                Ok(n) => return Ok(n),
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                    continue;
                },
                // EIO is raised by Linux when the slave side of the pty has
                // been closed; callers treat this the same as a clean EOF.
                Err(ref err)
                    if err.raw_os_error() == Some(libc::EIO) =>
                {
                    return Ok(0);
                },
                Err(err) => return Err(SessionError::IO(err)),
            }
        }
    }

    /// Write bytes into the PTY master so the child process receives them on
    /// its stdin.
    fn write(&mut self, input: &[u8]) -> Result<usize, SessionError> {
        loop {
            match self.master.write(input) {
                Ok(n) => return Ok(n),
                Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {
                    continue;
                },
                Err(err) => return Err(SessionError::IO(err)),
            }
        }
    }

    /// Resize the pseudo terminal to match the front-end viewport.
    fn resize(&mut self, size: PtySize) -> Result<(), SessionError> {
        let size: nix::pty::Winsize = size.into();
        let res = unsafe {
            libc::ioctl(
                self.master.as_raw_fd(),
                libc::TIOCSWINSZ,
                &size as *const _,
            )
        };

        if res < 0 {
            return Err(SessionError::Resize(io::Error::last_os_error()));
        }

        Ok(())
    }

    fn kill(&mut self, force: bool) -> Result<(), SessionError> {
        if self.exit_code.is_some() {
            return Ok(());
        }

        if force {
            match self.child.kill() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == io::ErrorKind::InvalidInput => {
                    return Ok(());
                },
                Err(err) => return Err(SessionError::IO(err)),
            }
        }

        if let Ok(pid_raw) = i32::try_from(self.child.id()) {
            let result = unsafe { libc::kill(pid_raw, libc::SIGTERM) };
            if result != 0 {
                let err = io::Error::last_os_error();
                if err.raw_os_error() != Some(libc::ESRCH) {
                    return Err(SessionError::IO(err));
                }
            }
        }

        Ok(())
    }

    fn wait_for_exit(&mut self) -> Result<i32, SessionError> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }

        low_level::unregister(self.signal_pipe_id);
        let status = self.child.wait()?;
        let code = Self::translate_exit(status);
        self.exit_code = Some(code);
        Ok(code)
    }

    fn process_id(&self) -> Option<u32> {
        Some(self.child.id())
    }

    fn has_exited(&mut self) -> bool {
        if self.exit_code.is_some() {
            return true;
        }

        if self.drain_signal_pipe().unwrap_or(false) {
            if let Ok(Some(status)) = self.child.try_wait() {
                self.exit_code = Some(Self::translate_exit(status));
            }
        }

        self.exit_code.is_some()
    }

    fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }
}

impl Pollable for UnixSession {
    /// Register the PTY master and SIGCHLD notification pipe with Mio.
    fn register(
        &mut self,
        registry: &mio::Registry,
        interest: mio::Interest,
        io_token: Token,
        child_token: Token,
    ) -> Result<(), SessionError> {
        let master_fd = self.master.as_raw_fd();
        let mut master_source = SourceFd(&master_fd);

        registry.register(&mut master_source, io_token, interest)?;

        let signal_pipe = self.signal_pipe.as_raw_fd();
        let mut signal_pipe_source = SourceFd(&signal_pipe);

        registry.register(
            &mut signal_pipe_source,
            child_token,
            mio::Interest::READABLE,
        )?;

        Ok(())
    }

    /// Update Mio's interest set for the PTY master and signal pipe.
    fn reregister(
        &mut self,
        registry: &mio::Registry,
        interest: mio::Interest,
        io_token: Token,
        child_token: Token,
    ) -> Result<(), SessionError> {
        let master_fd = self.master.as_raw_fd();
        let mut master_source = SourceFd(&master_fd);

        registry.reregister(&mut master_source, io_token, interest)?;

        let signal_pipe = self.signal_pipe.as_raw_fd();
        let mut signal_pipe_source = SourceFd(&signal_pipe);

        registry.reregister(
            &mut signal_pipe_source,
            child_token,
            mio::Interest::READABLE,
        )?;

        Ok(())
    }

    /// Remove the tracked file descriptors from the Mio registry.
    fn deregister(
        &mut self,
        registry: &mio::Registry,
    ) -> Result<(), SessionError> {
        let master_fd = self.master.as_raw_fd();
        let mut master_source = SourceFd(&master_fd);
        registry.deregister(&mut master_source)?;

        let signal_pipe = self.signal_pipe.as_raw_fd();
        let mut signal_pipe_source = SourceFd(&signal_pipe);
        registry.deregister(&mut signal_pipe_source)?;

        Ok(())
    }
}

impl Drop for UnixSession {
    fn drop(&mut self) {
        let _ = self.kill(true);
        if self.exit_code.is_none() {
            let _ = self.child.wait();
        }
    }
}

/// Spawn the command described by `options` attached to a fresh pseudo
/// terminal, inheriting the calling process's environment with
/// `options.environment` merged on top.
pub fn spawn(options: PtyOptions) -> Result<UnixSession, SessionError> {
    let size = options.pty_size();
    let result = openpty(Some(&size.into()), None)
        .map_err(SessionError::Nix)?;
    let master = unsafe { File::from_raw_fd(result.master.into_raw_fd()) };
    let slave = unsafe { File::from_raw_fd(result.slave.into_raw_fd()) };
    let raw_master = master.as_raw_fd();
    let raw_slave = slave.as_raw_fd();

    let mut cmd = Command::new(&options.command);
    cmd.args(&options.arguments);
    cmd.envs(options.environment.iter().map(|(k, v)| (k.clone(), v.clone())));

    let work_dir: Option<PathBuf> = options.working_directory.clone();

    unsafe {
        let stdin_slave = slave.try_clone()?;
        let stderr_slave = slave.try_clone()?;

        cmd.stdin(stdin_slave).stderr(stderr_slave).stdout(slave).pre_exec(
            move || {
                if libc::setsid() == -1 {
                    return Err(io::Error::last_os_error());
                }

                if let Some(dir) = &work_dir {
                    env::set_current_dir(dir)?;
                }

                if libc::ioctl(0, libc::TIOCSCTTY as _, 0) == -1 {
                    return Err(io::Error::last_os_error());
                }

                for signo in &[
                    libc::SIGCHLD,
                    libc::SIGHUP,
                    libc::SIGINT,
                    libc::SIGQUIT,
                    libc::SIGTERM,
                    libc::SIGALRM,
                ] {
                    libc::signal(*signo, libc::SIG_DFL);
                }

                libc::close(raw_master);
                libc::close(raw_slave);

                Ok(())
            },
        );
    };

    let (signal_pipe, signal_pipe_id) = register_signal_handler()?;

    let child = cmd.spawn().map_err(|err| {
        SessionError::Create(crate::errors::PtyCreateError::from_io_error(&err))
    })?;

    set_nonblocking(raw_master)?;

    Ok(UnixSession::new(master, child, signal_pipe, signal_pipe_id))
}

/// Builder for launching local commands attached to a pseudo terminal.
pub struct UnixSessionBuilder {
    cmd: Command,
    size: PtySize,
    work_dir: Option<PathBuf>,
}

/// Start building a Unix PTY session for the provided executable.
pub fn unix(program: &str) -> UnixSessionBuilder {
    UnixSessionBuilder {
        cmd: Command::new(program),
        size: PtySize::default(),
        work_dir: None,
    }
}

impl UnixSessionBuilder {
    /// Append a single argument to the command line.
    pub fn with_arg(mut self, arg: &str) -> Self {
        self.cmd.arg(arg);
        self
    }

    /// Append a list of arguments to the command line.
    pub fn with_args(mut self, args: &[String]) -> Self {
        for arg in args {
            self.cmd.arg(arg.as_str());
        }
        self
    }

    /// Set an environment variable for the spawned child process.
    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    /// Advertise the initial PTY size that should be used for the child
    /// process.
    pub fn with_size(mut self, size: PtySize) -> Self {
        self.size = size;
        self
    }

    /// Change the working directory of the spawned child process.
    pub fn with_cwd(mut self, path: &std::path::Path) -> Self {
        self.work_dir = Some(path.to_path_buf());
        self
    }

    /// Spawn the configured command and return an interactive PTY session
    /// that can be registered with Mio.
    pub fn spawn(mut self) -> Result<UnixSession, SessionError> {
        let result = openpty(Some(&self.size.into()), None)
            .map_err(SessionError::Nix)?;
        let master = unsafe { File::from_raw_fd(result.master.into_raw_fd()) };
        let slave = unsafe { File::from_raw_fd(result.slave.into_raw_fd()) };
        let raw_master = master.as_raw_fd();
        let raw_slave = slave.as_raw_fd();

        let work_dir = self.work_dir;

        unsafe {
            let stdin_slave = slave.try_clone()?;
            let stderr_slave = slave.try_clone()?;

            self.cmd
                .stdin(stdin_slave)
                .stderr(stderr_slave)
                .stdout(slave)
                .pre_exec(move || {
                    if libc::setsid() == -1 {
                        return Err(io::Error::last_os_error());
                    }

                    if let Some(dir) = &work_dir {
                        env::set_current_dir(dir)?;
                    }

                    if libc::ioctl(0, libc::TIOCSCTTY as _, 0) == -1 {
                        return Err(io::Error::last_os_error());
                    }

                    for signo in &[
                        libc::SIGCHLD,
                        libc::SIGHUP,
                        libc::SIGINT,
                        libc::SIGQUIT,
                        libc::SIGTERM,
                        libc::SIGALRM,
                    ] {
                        libc::signal(*signo, libc::SIG_DFL);
                    }

                    libc::close(raw_master);
                    libc::close(raw_slave);

                    Ok(())
                });
        };

        let (signal_pipe, signal_pipe_id) = register_signal_handler()?;

        let child = self.cmd.spawn()?;

        set_nonblocking(raw_master)?;

        Ok(UnixSession::new(master, child, signal_pipe, signal_pipe_id))
    }
}

fn register_signal_handler() -> Result<(UnixStream, SigId), SessionError> {
    let (pipe_writer, pipe) = UnixStream::pair()?;
    let pipe_id = pipe::register(libc::SIGCHLD, pipe_writer)?;
    pipe.set_nonblocking(true)?;
    Ok((pipe, pipe_id))
}

fn set_nonblocking(raw_fd: i32) -> Result<(), SessionError> {
    unsafe {
        let flags = libc::fcntl(raw_fd, libc::F_GETFL, 0);
        let result =
            libc::fcntl(raw_fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
        if result != 0 {
            return Err(SessionError::IO(io::Error::last_os_error()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::ErrorKind;
    use std::thread;
    use std::time::Duration;

    use nix::errno::Errno;

    use super::{Session, SessionError, spawn};
    use crate::options::PtyOptions;

    fn read_output(session: &mut impl Session) -> Result<String, SessionError> {
        let mut buffer = [0u8; 1024];
        let mut collected = Vec::new();

        for _ in 0..100 {
            match session.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    collected.extend_from_slice(&buffer[..n]);
                    if n < buffer.len() {
                        break;
                    }
                },
                Err(SessionError::IO(err))
                    if err.kind() == ErrorKind::Interrupted =>
                {
                    continue;
                },
                Err(SessionError::IO(err))
                    if err.kind() == ErrorKind::WouldBlock =>
                {
                    if !collected.is_empty() {
                        break;
                    }
                    thread::sleep(Duration::from_millis(10));
                },
                Err(err) => return Err(err),
            }
        }

        Ok(String::from_utf8_lossy(&collected).into_owned())
    }

    fn write_input(
        session: &mut impl Session,
        data: &[u8],
    ) -> Result<(), SessionError> {
        let mut offset = 0;

        while offset < data.len() {
            match session.write(&data[offset..]) {
                Ok(0) => thread::sleep(Duration::from_millis(10)),
                Ok(n) => {
                    offset += n;
                },
                Err(SessionError::IO(err))
                    if err.kind() == ErrorKind::Interrupted =>
                {
                    continue;
                },
                Err(err) => return Err(err),
            }
        }

        Ok(())
    }

    #[test]
    fn unix_session_echoes_output() {
        let mut session =
            match spawn(PtyOptions::new("/bin/cat")) {
                Ok(session) => session,
                Err(SessionError::Nix(Errno::EACCES)) => {
                    eprintln!("skipping test; PTY allocation denied (EACCES)");
                    return;
                },
                Err(err) => panic!("failed to spawn session: {err:?}"),
            };

        write_input(&mut session, b"otty-test\n")
            .expect("failed to send payload to child");

        let output = read_output(&mut session).expect("failed to read output");
        assert!(
            output.contains("otty-test"),
            "expected echoed output, got: {output:?}"
        );

        session.kill(true).expect("failed to kill");
        assert!(session.wait_for_exit().is_ok());
    }

    #[test]
    fn unix_session_respects_environment()
    -> Result<(), Box<dyn std::error::Error>> {
        let options = PtyOptions::new("/bin/sh")
            .with_arg("-c")
            .with_arg("printf '%s' \"$OTTY_ENV_TEST\"")
            .with_env("OTTY_ENV_TEST", "42");

        let mut session = match spawn(options) {
            Ok(session) => session,
            Err(SessionError::Nix(Errno::EACCES)) => {
                eprintln!("skipping test; PTY allocation denied (EACCES)");
                return Ok(());
            },
            Err(err) => return Err(err.into()),
        };

        let output = read_output(&mut session)?;
        assert_eq!(output.trim(), "42");

        assert_eq!(session.wait_for_exit()?, 0);
        Ok(())
    }

    #[test]
    fn unix_session_translates_signal_exit() -> Result<(), Box<dyn std::error::Error>>
    {
        let options = PtyOptions::new("/bin/sh")
            .with_arg("-c")
            .with_arg("kill -TERM $$");

        let mut session = match spawn(options) {
            Ok(session) => session,
            Err(SessionError::Nix(Errno::EACCES)) => {
                eprintln!("skipping test; PTY allocation denied (EACCES)");
                return Ok(());
            },
            Err(err) => return Err(err.into()),
        };

        let code = session.wait_for_exit()?;
        assert_eq!(code, 128 + nix::libc::SIGTERM);
        Ok(())
    }
}
