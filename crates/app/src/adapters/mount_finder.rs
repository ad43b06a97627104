use anyhow::Context;
use async_trait::async_trait;
use repofinder_core::domain::{
    FinderResult, RefList, RefName, Remote, OPTION_GPG_VERIFY, OPTION_GPG_VERIFY_SUMMARY,
};
use repofinder_core::error::Result;
use repofinder_core::ports::{check_cancelled, Finder, Volume, VolumeMonitor};
use std::io::ErrorKind;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Physical media rank above configured remotes.
pub const MOUNT_FINDER_PRIORITY: i32 = 50;

/// Directory under a volume's mount root holding one entry per ref.
pub const REPOS_DIR: &str = ".ostree/repos";

/// Finds repositories on removable mounted volumes.
///
/// A volume serves ref `R` if `<mount root>/.ostree/repos/R` is a directory
/// (or a symlink to one) on the same device as the mount root. Refs whose
/// entries resolve to the same canonical path are reported as one remote.
pub struct MountFinder<M> {
    monitor: Arc<M>,
}

impl<M: VolumeMonitor> MountFinder<M> {
    pub fn new(monitor: Arc<M>) -> Self {
        Self { monitor }
    }

    async fn scan_volume(
        &self,
        volume: &Volume,
        refs: &RefList,
        cancel: &CancellationToken,
        results: &mut Vec<FinderResult>,
    ) -> Result<()> {
        let (drive, mount) = match (&volume.drive, &volume.mount) {
            (Some(drive), Some(mount)) => (drive, mount),
            _ => {
                debug!("Ignoring volume '{}' due to missing drive or mount.", volume.name);
                return Ok(());
            }
        };

        if !drive.removable {
            debug!("Ignoring volume '{}' as drive is not removable.", volume.name);
            return Ok(());
        }

        let mount_root = &mount.root;

        // Both handles stay open for the rest of the scan and close on drop.
        let (root_dir, root_dev) = match open_dir(mount_root).await {
            Ok(opened) => opened,
            Err(e) => {
                debug!(
                    "Ignoring volume '{}' as '{}' directory can't be opened: {:#}",
                    volume.name,
                    mount_root.display(),
                    e
                );
                return check_cancelled(cancel);
            }
        };
        check_cancelled(cancel)?;

        let repos_path = mount_root.join(REPOS_DIR);
        let _repos_dir = match open_dir(&repos_path).await {
            Ok((dir, _)) => dir,
            Err(e) => {
                if is_not_found(&e) {
                    debug!(
                        "Ignoring volume '{}' as '{}' directory doesn't exist.",
                        volume.name,
                        repos_path.display()
                    );
                } else {
                    debug!(
                        "Ignoring volume '{}' as '{}' directory can't be opened: {:#}",
                        volume.name,
                        repos_path.display(),
                        e
                    );
                }
                return check_cancelled(cancel);
            }
        };
        check_cancelled(cancel)?;

        // Canonical repo URI -> supported refs, in the order refs were found.
        let mut uri_to_refs: Vec<(String, Vec<RefName>)> = Vec::new();

        for name in refs {
            let Some(repo_dir_path) = ref_path(&repos_path, name) else {
                debug!(
                    "Ignoring ref '{}' on volume '{}' as it does not name a path below {}.",
                    name, volume.name, REPOS_DIR
                );
                continue;
            };

            let metadata = match fs::metadata(&repo_dir_path).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!(
                        "Ignoring ref '{}' on volume '{}' as querying info of '{}' failed: {}",
                        name,
                        volume.name,
                        repo_dir_path.display(),
                        e
                    );
                    check_cancelled(cancel)?;
                    continue;
                }
            };
            check_cancelled(cancel)?;

            if !metadata.is_dir() {
                debug!(
                    "Ignoring ref '{}' on volume '{}' as '{}' is of type {:?}, not a directory.",
                    name,
                    volume.name,
                    repo_dir_path.display(),
                    metadata.file_type()
                );
                continue;
            }

            // Ref symlinks may not point outside the mounted volume.
            if metadata.dev() != root_dev {
                debug!(
                    "Ignoring ref '{}' on volume '{}' as it's on a different file system from the mount.",
                    name, volume.name
                );
                continue;
            }

            let canonical = match fs::canonicalize(&repo_dir_path).await {
                Ok(canonical) => canonical,
                Err(e) => {
                    debug!(
                        "Ignoring ref '{}' on volume '{}' as '{}' can't be canonicalised: {}",
                        name,
                        volume.name,
                        repo_dir_path.display(),
                        e
                    );
                    check_cancelled(cancel)?;
                    continue;
                }
            };
            check_cancelled(cancel)?;

            let repo_uri = format!("file://{}", canonical.display());
            debug!(
                "Resolved ref '{}' on volume '{}' to repo URI '{}'.",
                name, volume.name, repo_uri
            );

            match uri_to_refs.iter_mut().find(|(uri, _)| *uri == repo_uri) {
                Some((_, supported_refs)) => supported_refs.push(name.clone()),
                None => uri_to_refs.push((repo_uri, vec![name.clone()])),
            }
        }

        drop(root_dir);

        for (repo_uri, supported_refs) in uri_to_refs {
            let mut remote = Remote::new(repo_uri.clone(), repo_uri);
            remote.set_bool(OPTION_GPG_VERIFY, true);
            remote.set_bool(OPTION_GPG_VERIFY_SUMMARY, true);

            // The pull engine fetches the summary itself just as cheaply, so
            // the timestamp stays unknown here.
            results.push(FinderResult::new(
                remote,
                self.name(),
                MOUNT_FINDER_PRIORITY,
                supported_refs,
                0,
            )?);
        }

        Ok(())
    }
}

#[async_trait]
impl<M: VolumeMonitor> Finder for MountFinder<M> {
    fn name(&self) -> &str {
        "mount"
    }

    async fn resolve(&self, refs: &RefList, cancel: &CancellationToken) -> Result<Vec<FinderResult>> {
        check_cancelled(cancel)?;

        let volumes = match self.monitor.volumes().await {
            Ok(volumes) => volumes,
            Err(e) => {
                debug!("Ignoring mounted volumes as enumerating them failed: {:#}", e);
                Vec::new()
            }
        };
        check_cancelled(cancel)?;

        let mut results = Vec::new();
        for volume in &volumes {
            self.scan_volume(volume, refs, cancel, &mut results).await?;
        }

        Ok(results)
    }
}

/// Open a directory and return the handle with the device it lives on.
async fn open_dir(path: &Path) -> anyhow::Result<(fs::File, u64)> {
    let dir = fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let metadata = dir
        .metadata()
        .await
        .with_context(|| format!("Failed to query info of {}", path.display()))?;
    if !metadata.is_dir() {
        anyhow::bail!("{} is not a directory", path.display());
    }
    Ok((dir, metadata.dev()))
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<std::io::Error>()
        .map(|e| e.kind() == ErrorKind::NotFound)
        .unwrap_or(false)
}

/// `<repos>/<ref>` with each ref segment pushed separately, or `None` for
/// refs that would resolve to `<repos>` itself or outside it.
fn ref_path(repos_path: &Path, name: &RefName) -> Option<PathBuf> {
    let mut path = repos_path.to_path_buf();
    for segment in name.path_segments()? {
        path.push(segment);
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ref_path_nests_segments() -> anyhow::Result<()> {
        let repos = Path::new("/media/usb/.ostree/repos");
        let name = RefName::new("exampleos/x86_64/standard")?;
        assert_eq!(
            ref_path(repos, &name),
            Some(PathBuf::from("/media/usb/.ostree/repos/exampleos/x86_64/standard"))
        );

        let absolute = RefName::new("/etc")?;
        assert_eq!(
            ref_path(repos, &absolute),
            Some(PathBuf::from("/media/usb/.ostree/repos/etc"))
        );

        assert_eq!(ref_path(repos, &RefName::new("..")?), None);
        assert_eq!(ref_path(repos, &RefName::new("/")?), None);
        assert_eq!(ref_path(repos, &RefName::new("a/../b")?), None);
        Ok(())
    }

    #[test]
    fn test_is_not_found() {
        let err = anyhow::Error::new(std::io::Error::from(ErrorKind::NotFound)).context("opening");
        assert!(is_not_found(&err));

        let err = anyhow::anyhow!("something else");
        assert!(!is_not_found(&err));
    }
}
