use async_trait::async_trait;
use repofinder_core::domain::{FinderResult, RefList, RefName};
use repofinder_core::error::Result;
use repofinder_core::ports::{check_cancelled, Finder, RemoteRepository};
use std::collections::HashSet;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Configured remotes rank below physical media.
pub const CONFIG_FINDER_PRIORITY: i32 = 100;

/// Finds remotes from the host repository's own remote configuration.
///
/// A remote is a candidate for every queried ref that appears in the ref
/// set it advertises. The configuration says nothing about freshness, so
/// results carry an unknown summary timestamp.
pub struct ConfigFinder<R> {
    repo: Mutex<R>,
}

impl<R: RemoteRepository> ConfigFinder<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo: Mutex::new(repo),
        }
    }
}

#[async_trait]
impl<R: RemoteRepository> Finder for ConfigFinder<R> {
    fn name(&self) -> &str {
        "config"
    }

    async fn resolve(&self, refs: &RefList, cancel: &CancellationToken) -> Result<Vec<FinderResult>> {
        check_cancelled(cancel)?;
        let repo = self.repo.lock().await;

        let remotes = match repo.list_remotes().await {
            Ok(remotes) => remotes,
            Err(e) => {
                debug!("Ignoring configured remotes as listing them failed: {:#}", e);
                Vec::new()
            }
        };
        check_cancelled(cancel)?;

        // Remote name -> supported refs, in remote enumeration order.
        let mut remote_to_refs: Vec<(String, Vec<RefName>)> = Vec::new();
        let mut seen = HashSet::new();

        for remote_name in remotes {
            if !seen.insert(remote_name.clone()) {
                continue;
            }

            let remote_refs = match repo.list_refs(&remote_name).await {
                Ok(remote_refs) => remote_refs,
                Err(e) => {
                    debug!(
                        "Ignoring remote '{}' due to error loading its refs: {:#}",
                        remote_name, e
                    );
                    check_cancelled(cancel)?;
                    continue;
                }
            };
            check_cancelled(cancel)?;

            let supported_refs: Vec<RefName> = refs
                .iter()
                .filter(|name| remote_refs.contains_key(name.as_str()))
                .inspect(|name| debug!("Resolved ref '{}' to remote '{}'.", name, remote_name))
                .cloned()
                .collect();

            if !supported_refs.is_empty() {
                remote_to_refs.push((remote_name, supported_refs));
            }
        }

        let mut results = Vec::with_capacity(remote_to_refs.len());
        for (remote_name, supported_refs) in remote_to_refs {
            let remote = match repo.get_remote_config(&remote_name).await {
                Ok(remote) => remote,
                Err(e) => {
                    debug!(
                        "Configuration for remote '{}' could not be found. Ignoring: {:#}",
                        remote_name, e
                    );
                    check_cancelled(cancel)?;
                    continue;
                }
            };
            check_cancelled(cancel)?;

            results.push(FinderResult::new(
                remote,
                self.name(),
                CONFIG_FINDER_PRIORITY,
                supported_refs,
                0,
            )?);
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use repofinder_core::domain::Remote;
    use repofinder_core::error::FinderError;
    use std::collections::BTreeMap;

    /// Remote name -> (advertised refs, or None when listing fails; has config)
    struct FakeRepo {
        remotes: Vec<(&'static str, Option<Vec<&'static str>>, bool)>,
    }

    #[async_trait]
    impl RemoteRepository for FakeRepo {
        async fn list_remotes(&self) -> anyhow::Result<Vec<String>> {
            Ok(self.remotes.iter().map(|(n, _, _)| n.to_string()).collect())
        }

        async fn list_refs(&self, remote_name: &str) -> anyhow::Result<BTreeMap<String, String>> {
            let (_, refs, _) = self
                .remotes
                .iter()
                .find(|(n, _, _)| *n == remote_name)
                .ok_or_else(|| anyhow!("no remote {}", remote_name))?;
            let refs = refs.as_ref().ok_or_else(|| anyhow!("summary unavailable"))?;
            Ok(refs
                .iter()
                .map(|r| (r.to_string(), "0".repeat(64)))
                .collect())
        }

        async fn get_remote_config(&self, remote_name: &str) -> anyhow::Result<Remote> {
            match self.remotes.iter().find(|(n, _, _)| *n == remote_name) {
                Some((_, _, true)) => Ok(Remote::new(remote_name, format!("http://{}", remote_name))),
                _ => Err(anyhow!("remote {} not configured", remote_name)),
            }
        }
    }

    fn names(results: &[FinderResult]) -> Vec<&str> {
        results.iter().map(|r| r.remote().name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_intersects_query_with_advertised_refs() -> anyhow::Result<()> {
        let finder = ConfigFinder::new(FakeRepo {
            remotes: vec![
                ("remote0", Some(vec!["exampleos/x86_64/ref2", "exampleos/x86_64/ref0"]), true),
                ("remote1", Some(vec!["exampleos/x86_64/ref1"]), true),
                ("remote2", Some(vec!["other/ref"]), true),
            ],
        });
        let refs = RefList::parse(&[
            "exampleos/x86_64/ref0",
            "exampleos/x86_64/ref1",
            "exampleos/x86_64/ref2",
            "exampleos/x86_64/ref3",
        ])?;

        let results = finder.resolve(&refs, &CancellationToken::new()).await?;
        assert_eq!(names(&results), vec!["remote0", "remote1"]);

        // Supported refs follow the query order, not the remote's.
        let remote0: Vec<&str> = results[0].supported_refs().iter().map(RefName::as_str).collect();
        assert_eq!(remote0, vec!["exampleos/x86_64/ref0", "exampleos/x86_64/ref2"]);

        for result in &results {
            assert_eq!(result.priority(), CONFIG_FINDER_PRIORITY);
            assert_eq!(result.summary_last_modified(), 0);
            assert_eq!(result.finder(), "config");
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_skips_unreadable_and_unconfigured_remotes() -> anyhow::Result<()> {
        let finder = ConfigFinder::new(FakeRepo {
            remotes: vec![
                ("broken", None, true),
                ("gone", Some(vec!["os/x86/stable"]), false),
                ("good", Some(vec!["os/x86/stable"]), true),
            ],
        });
        let refs = RefList::parse(&["os/x86/stable"])?;

        let results = finder.resolve(&refs, &CancellationToken::new()).await?;
        assert_eq!(names(&results), vec!["good"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_no_remotes_is_empty_success() -> anyhow::Result<()> {
        let finder = ConfigFinder::new(FakeRepo { remotes: vec![] });
        let refs = RefList::parse(&["os/x86/stable"])?;

        let results = finder.resolve(&refs, &CancellationToken::new()).await?;
        assert!(results.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_before_start() -> anyhow::Result<()> {
        let finder = ConfigFinder::new(FakeRepo {
            remotes: vec![("good", Some(vec!["os/x86/stable"]), true)],
        });
        let refs = RefList::parse(&["os/x86/stable"])?;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = finder.resolve(&refs, &cancel).await.unwrap_err();
        assert!(matches!(err, FinderError::Cancelled));
        Ok(())
    }
}
