/// Parameters for `Client::create_session`: the wire-level fields of a
/// `CreateSession` message, built up the same way
/// `termalive_session::SessionOptions` is.
#[derive(Clone, Debug)]
pub struct NewSession {
    pub id: String,
    pub command: String,
    pub arguments: Vec<String>,
    pub working_directory: Option<String>,
    pub environment: Vec<(String, String)>,
    pub columns: u16,
    pub rows: u16,
}

impl NewSession {
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
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.arguments = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_cwd(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    #[must_use]
    pub fn with_env(mut self, env: impl IntoIterator<Item = (String, String)>) -> Self {
        self.environment = env.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_size(mut self, columns: u16, rows: u16) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }
}
