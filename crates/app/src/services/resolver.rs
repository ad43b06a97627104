use anyhow::Context;
use futures::future::join_all;
use repofinder_core::domain::{sort_results, FinderResult, RefList};
use repofinder_core::error::{FinderError, Result};
use repofinder_core::ports::{check_cancelled, Finder, Volume};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::adapters::{ConfigFinder, FsRepository, MountFinder, MountInfoMonitor, StaticVolumeMonitor};
use crate::config::{Config, MountSource};

/// Run every finder concurrently and merge their results.
///
/// Finders are dispatched in slice order and polled together on the
/// current task. A finder that fails contributes nothing; its error is
/// logged at debug level. The merged results are sorted with
/// [`FinderResult::compare`]. Cancellation discards everything collected
/// so far and returns [`FinderError::Cancelled`].
pub async fn resolve_all(
    finders: &[Arc<dyn Finder>],
    refs: &RefList,
    cancel: &CancellationToken,
) -> Result<Vec<FinderResult>> {
    if finders.is_empty() {
        return Err(FinderError::invalid_argument("at least one finder is required"));
    }

    let finder_names: Vec<&str> = finders.iter().map(|f| f.name()).collect();
    debug!(
        "Resolving refs [{}] with finders [{}]",
        refs,
        finder_names.join(", ")
    );

    check_cancelled(cancel)?;

    let pending = finders.iter().map(|finder| async move {
        let outcome = finder.resolve(refs, cancel).await;
        (finder.name(), outcome)
    });

    let outcomes = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(FinderError::Cancelled),
        outcomes = join_all(pending) => outcomes,
    };

    // A finder may have seen the token before we did.
    check_cancelled(cancel)?;

    let mut results = Vec::new();
    for (finder_name, outcome) in outcomes {
        match outcome {
            Ok(found) => results.extend(found),
            Err(e) => debug!(
                "Error resolving refs to repository URI using {}: {}",
                finder_name, e
            ),
        }
    }

    sort_results(&mut results);

    if results.is_empty() {
        debug!("Finished, results: (none)");
    } else {
        let names: Vec<&str> = results.iter().map(|r| r.remote().name.as_str()).collect();
        debug!("Finished, results: {}", names.join(", "));
    }

    Ok(results)
}

/// The set of finders a run uses, assembled from configuration.
pub struct Resolver {
    finders: Vec<Arc<dyn Finder>>,
}

impl Resolver {
    pub fn new(finders: Vec<Arc<dyn Finder>>) -> Self {
        Self { finders }
    }

    /// Build the enabled finders. This is the composition root: adapters
    /// are chosen here and handed to the finders that own them.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let mut finders: Vec<Arc<dyn Finder>> = Vec::new();

        if config.finders.config {
            info!("Using configured remotes from {}", config.repo.display());
            finders.push(Arc::new(ConfigFinder::new(FsRepository::new(&config.repo))));
        }

        if config.finders.mount {
            match config.mounts.source {
                MountSource::System => {
                    finders.push(Arc::new(MountFinder::new(Arc::new(MountInfoMonitor::new()))));
                }
                MountSource::Static => {
                    let volumes: Vec<Volume> = config
                        .mounts
                        .static_volumes
                        .iter()
                        .map(|v| Volume::mounted(v.name.clone(), v.root.clone(), v.removable))
                        .collect();
                    info!("Using {} statically configured volumes", volumes.len());
                    finders.push(Arc::new(MountFinder::new(Arc::new(StaticVolumeMonitor::new(
                        volumes,
                    )))));
                }
            }
        }

        if finders.is_empty() {
            return Err(FinderError::invalid_argument("every finder is disabled"))
                .context("No finders to run");
        }

        Ok(Self::new(finders))
    }

    pub fn finders(&self) -> &[Arc<dyn Finder>] {
        &self.finders
    }

    pub async fn find_remotes(
        &self,
        refs: &RefList,
        cancel: &CancellationToken,
    ) -> Result<Vec<FinderResult>> {
        resolve_all(&self.finders, refs, cancel).await
    }
}
