use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// The physical drive backing a volume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Drive {
    pub removable: bool,
}

/// Where a volume is mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub root: PathBuf,
}

/// A volume as reported by a [`VolumeMonitor`]. Either half may be absent:
/// an unmounted partition has no mount, a pseudo file system no drive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    pub drive: Option<Drive>,
    pub mount: Option<Mount>,
}

impl Volume {
    pub fn new(name: impl Into<String>, drive: Option<Drive>, mount: Option<Mount>) -> Self {
        Self {
            name: name.into(),
            drive,
            mount,
        }
    }

    /// A mounted volume on a drive with the given removability.
    pub fn mounted(name: impl Into<String>, root: impl Into<PathBuf>, removable: bool) -> Self {
        Self::new(
            name,
            Some(Drive { removable }),
            Some(Mount { root: root.into() }),
        )
    }
}

/// Port for enumerating mounted volumes. Queries are read-only, so one
/// monitor may be shared between finders.
#[async_trait]
pub trait VolumeMonitor: Send + Sync {
    async fn volumes(&self) -> Result<Vec<Volume>>;
}
