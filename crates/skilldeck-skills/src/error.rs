#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("invalid SKILL.md format: {0}")]
    InvalidFormat(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' is {len} characters long (max {max})")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("skill not found: {0}")]
    NotFound(String),

    #[error("failed to load skill '{name}': {source}")]
    Load {
        name: String,
        #[source]
        source: Box<SkillError>,
    },

    #[error("watcher already running")]
    AlreadyRunning,

    #[error("no Tokio runtime to run the watcher on")]
    NoRuntime,

    #[error("path traversal detected: {0}")]
    PathTraversal(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("watcher error: {0}")]
    Watcher(#[from] notify::Error),
}

impl SkillError {
    /// True for an I/O error caused by a path that does not exist.
    #[must_use]
    pub fn is_not_found_io(&self) -> bool {
        matches!(self, Self::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }

    pub(crate) fn for_skill(self, name: &str) -> Self {
        match self {
            Self::NotFound(_) | Self::Load { .. } => self,
            other => Self::Load {
                name: name.to_owned(),
                source: Box::new(other),
            },
        }
    }
}
