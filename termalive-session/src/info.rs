use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

/// Lifecycle state of a [`crate::ManagedSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Exiting,
    Exited,
    Failed,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exited | Self::Failed)
    }
}

/// Snapshot of a session's metadata, independent of any wire format.
/// `termalive-protocol` maps this onto the binary record layout.
#[derive(Clone, Debug)]
pub struct SessionInfo {
    pub id: String,
    pub command: String,
    pub working_directory: Option<PathBuf>,
    pub state: SessionState,
    pub created_ms_since_epoch: u64,
    pub exit_code: Option<i32>,
    pub columns: u16,
    pub rows: u16,
}

#[must_use]
pub fn now_ms_since_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
