//! Platform pipe transport: a Unix domain socket at a well-known path, or
//! a Windows named pipe.

/// Well-known filesystem location for a named Unix domain socket.
#[cfg(unix)]
#[must_use]
pub fn socket_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("termalive-{name}.sock"))
}

/// Well-known Windows named pipe path.
#[cfg(windows)]
#[must_use]
pub fn pipe_path(name: &str) -> String {
    format!(r"\\.\pipe\termalive-{name}")
}

#[cfg(unix)]
pub mod unix_pipe {
    use tokio::net::{UnixListener, UnixStream};

    use super::socket_path;
    use crate::error::TransportError;

    /// Bind a listener at the well-known socket path for `name`, removing
    /// any stale socket file left behind by a previous run.
    pub fn bind(name: &str) -> Result<UnixListener, TransportError> {
        let path = socket_path(name);
        if path.exists() {
            let _ = std::fs::remove_file(&path);
        }
        Ok(UnixListener::bind(path)?)
    }

    pub async fn connect(name: &str) -> Result<UnixStream, TransportError> {
        Ok(UnixStream::connect(socket_path(name)).await?)
    }
}

#[cfg(windows)]
pub mod windows_pipe {
    use tokio::net::windows::named_pipe::{ClientOptions, NamedPipeClient, NamedPipeServer, ServerOptions};

    use super::pipe_path;
    use crate::error::TransportError;

    /// Create the first instance of a named pipe server for `name`. Each
    /// subsequent accepted connection creates a new server instance on the
    /// same pipe name, mirroring the Unix listener's accept loop.
    pub fn create_server(name: &str) -> Result<NamedPipeServer, TransportError> {
        Ok(ServerOptions::new().first_pipe_instance(true).create(pipe_path(name))?)
    }

    pub fn create_next_server_instance(name: &str) -> Result<NamedPipeServer, TransportError> {
        Ok(ServerOptions::new().create(pipe_path(name))?)
    }

    pub async fn connect(name: &str) -> Result<NamedPipeClient, TransportError> {
        Ok(ClientOptions::new().open(pipe_path(name))?)
    }
}
