use crate::domain::{FinderResult, RefList};
use crate::error::{FinderError, Result};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Port for a remote discovery source.
///
/// A finder is long-lived and holds whatever it needs to answer queries
/// (a repository handle, a volume monitor, ...). Each call to
/// [`resolve`](Finder::resolve) produces fresh results owned by the caller.
#[async_trait]
pub trait Finder: Send + Sync {
    /// Short identifier used in logs and recorded on every result.
    fn name(&self) -> &str;

    /// Find remotes which claim to serve any of `refs`.
    ///
    /// An empty vector means "no matches". Conditions that only mean this
    /// source has no answer (missing directories, unreadable remotes) are
    /// skipped and logged at debug level, never returned. The only error a
    /// well-behaved finder returns is [`FinderError::Cancelled`], checked at
    /// each suspension point.
    async fn resolve(&self, refs: &RefList, cancel: &CancellationToken) -> Result<Vec<FinderResult>>;
}

/// Return `Cancelled` if the token has fired.
pub fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(FinderError::Cancelled)
    } else {
        Ok(())
    }
}
