use thiserror::Error;

/// Errors a finder or the aggregator can hand back to a caller.
#[derive(Error, Debug)]
pub enum FinderError {
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Operation was cancelled")]
    Cancelled,

    /// Finder-internal failure. The aggregator logs these and moves on.
    #[error("Finder error: {source}")]
    Source { source: anyhow::Error },
}

impl FinderError {
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<anyhow::Error> for FinderError {
    fn from(source: anyhow::Error) -> Self {
        Self::Source { source }
    }
}

pub type Result<T> = std::result::Result<T, FinderError>;
