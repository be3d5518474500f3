//! Error types shared by the store, the task operations and the menu.

use std::path::PathBuf;

use crate::codec::FormatError;

pub type Result<T> = std::result::Result<T, TaskError>;

/// Everything the core can refuse or fail at.
///
/// The menu prints these and re-prompts; none of them end the session.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// A backing file holds a line the codec cannot read.
    #[error("{}:{line}: {source}", path.display())]
    Format {
        path: PathBuf,
        line: usize,
        #[source]
        source: FormatError,
    },

    #[error("user '{0}' already exists")]
    DuplicateUser(String),

    /// Bad input: unknown user, blank field, due date in the past.
    #[error("{0}")]
    Validation(String),

    #[error("permission denied: {0}")]
    Permission(String),

    #[error("no task '{title}' assigned to '{assigned_user}'")]
    NotFound {
        title: String,
        assigned_user: String,
    },

    /// A task position that no longer exists, e.g. after another delete.
    #[error("no task at position {0}")]
    UnknownTask(usize),

    #[error("task '{title}' is already completed and cannot be edited")]
    ImmutableState { title: String },

    #[error("incorrect username or password")]
    Authentication,

    /// Reading or flushing a backing file failed.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl TaskError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
