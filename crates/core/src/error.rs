use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("plugin mode '{0}' is already registered")]
    AlreadyRegistered(String),

    #[error("unknown plugin mode: {0}")]
    NotFound(String),

    #[error("CPU selection unavailable: {0}")]
    SourceUnavailable(String),

    #[error("strategy fetch failed: {0}")]
    OverrideFetchFailed(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PluginError {
    /// Errors that the dispatch loop should log and retry on the next iteration.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PluginError::SourceUnavailable(_) | PluginError::OverrideFetchFailed(_)
        )
    }
}
