use std::path::PathBuf;

use crate::size::PtySize;

/// Parameters used to spawn a pseudo-terminal child process.
///
/// `environment` is merged on top of the spawning process's inherited
/// environment rather than replacing it: entries here override any
/// same-named variable the child would otherwise inherit.
#[derive(Clone, Debug, Default)]
pub struct PtyOptions {
    pub command: String,
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub environment: Vec<(String, String)>,
    pub columns: u16,
    pub rows: u16,
}

impl PtyOptions {
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            arguments: Vec::new(),
            working_directory: None,
            environment: Vec::new(),
            columns: 80,
            rows: 30,
        }
    }

    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    #[must_use]
    pub fn with_args(
        mut self,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.arguments.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_env(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.environment.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_size(mut self, columns: u16, rows: u16) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    pub(crate) fn pty_size(&self) -> PtySize {
        PtySize {
            rows: self.rows,
            cols: self.columns,
            cell_width: 0,
            cell_height: 0,
        }
    }
}
