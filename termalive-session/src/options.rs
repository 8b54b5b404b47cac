use std::path::PathBuf;
use std::time::Duration;

use termalive_screen::DEFAULT_CAPACITY;

/// Parameters used to start a [`crate::ManagedSession`].
#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub id: String,
    pub command: String,
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub environment: Vec<(String, String)>,
    pub columns: u16,
    pub rows: u16,
    /// Capacity of the output ring buffer; defaults to
    /// [`termalive_screen::DEFAULT_CAPACITY`].
    pub ring_capacity: usize,
    /// Kills the session if idle (no input, no subscribers attaching) for
    /// longer than this. `None` disables the idle sweep for this session.
    pub idle_timeout: Option<Duration>,
    /// Capacity of each subscriber's bounded event queue.
    pub subscriber_capacity: usize,
}

impl SessionOptions {
    #[must_use]
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
            arguments: Vec::new(),
            working_directory: None,
            environment: Vec::new(),
            columns: 80,
            rows: 24,
            ring_capacity: DEFAULT_CAPACITY,
            idle_timeout: None,
            subscriber_capacity: 256,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.arguments = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_size(mut self, columns: u16, rows: u16) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }
}
