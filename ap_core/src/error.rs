use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("cache refresh failed: {message}")]
    RefreshFailed { message: String },

    #[error("medium '{medium}' was not provided in drive '{drive}'")]
    MediaDeclined { medium: String, drive: String },

    #[error("failed to reload package index: {message}")]
    ReloadFailed { message: String },

    #[error("invalid engine script: {message}")]
    InvalidScript { message: String },

    #[error("{context}: {message}")]
    Io { context: String, message: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl Error {
    pub fn io(context: impl Into<String>, err: std::io::Error) -> Self {
        Error::Io {
            context: context.into(),
            message: err.to_string(),
        }
    }

    /// True for errors that end a refresh attempt (engine failure or declined media).
    pub fn is_abort(&self) -> bool {
        matches!(
            self,
            Error::RefreshFailed { .. } | Error::MediaDeclined { .. }
        )
    }
}
