use crate::domain::Remote;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// The slice of a host repository that configured-remote discovery needs.
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    /// Names of every configured remote.
    async fn list_remotes(&self) -> Result<Vec<String>>;

    /// Refs the remote advertises, mapped to their checksums. Only the keys
    /// matter for discovery.
    async fn list_refs(&self, remote_name: &str) -> Result<BTreeMap<String, String>>;

    /// Full configuration of a remote.
    async fn get_remote_config(&self, remote_name: &str) -> Result<Remote>;
}
