use anyhow::{Context, Result};
use async_trait::async_trait;
use repofinder_core::ports::{Drive, Mount, Volume, VolumeMonitor};
use std::path::{Path, PathBuf};
use tracing::debug;

/// One line of `/proc/self/mountinfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    /// `major:minor` of the backing device.
    pub device: String,
    pub mount_point: PathBuf,
    pub fs_type: String,
    pub source: String,
}

/// Parse mountinfo contents. Malformed lines are skipped.
pub fn parse_mountinfo(contents: &str) -> Vec<MountEntry> {
    let mut entries = Vec::new();

    for line in contents.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        // Optional fields start at index 6 and end at the "-" separator.
        let Some(separator) = fields.iter().skip(6).position(|f| *f == "-").map(|p| p + 6) else {
            continue;
        };
        if fields.len() < separator + 3 {
            continue;
        }

        entries.push(MountEntry {
            device: fields[2].to_string(),
            mount_point: PathBuf::from(unescape_octal(fields[4])),
            fs_type: fields[separator + 1].to_string(),
            source: unescape_octal(fields[separator + 2]),
        });
    }

    entries
}

/// Decode the `\ooo` escapes the kernel uses for spaces, tabs and newlines.
fn unescape_octal(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() {
            let digits = &bytes[i + 1..i + 4];
            if digits.iter().all(|d| (b'0'..=b'7').contains(d)) {
                let value = digits
                    .iter()
                    .fold(0u32, |acc, d| acc * 8 + u32::from(d - b'0'));
                if let Ok(value) = u8::try_from(value) {
                    out.push(value);
                    i += 4;
                    continue;
                }
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Volume monitor backed by the kernel's mount table and sysfs.
#[derive(Debug, Clone)]
pub struct MountInfoMonitor {
    mountinfo_path: PathBuf,
    sysfs_root: PathBuf,
}

impl MountInfoMonitor {
    pub fn new() -> Self {
        Self::with_paths("/proc/self/mountinfo", "/sys")
    }

    pub fn with_paths<P: AsRef<Path>, Q: AsRef<Path>>(mountinfo_path: P, sysfs_root: Q) -> Self {
        Self {
            mountinfo_path: mountinfo_path.as_ref().to_path_buf(),
            sysfs_root: sysfs_root.as_ref().to_path_buf(),
        }
    }

    fn list_volumes(&self) -> Result<Vec<Volume>> {
        let contents = std::fs::read_to_string(&self.mountinfo_path).with_context(|| {
            format!("Failed to read mount table: {}", self.mountinfo_path.display())
        })?;

        let volumes = parse_mountinfo(&contents)
            .into_iter()
            .filter(|entry| entry.source.starts_with("/dev/"))
            .map(|entry| {
                let removable = self.is_removable(&entry.device);
                let name = volume_name(&entry);
                Volume::new(
                    name,
                    Some(Drive { removable }),
                    Some(Mount {
                        root: entry.mount_point,
                    }),
                )
            })
            .collect();

        Ok(volumes)
    }

    /// A device is removable if sysfs says so for it or, for a partition,
    /// for its parent disk. USB-attached disks frequently report 0 there,
    /// so anything hanging off a USB bus counts too.
    fn is_removable(&self, device: &str) -> bool {
        let dev_dir = self.sysfs_root.join("dev").join("block").join(device);
        if read_flag(&dev_dir.join("removable")) {
            return true;
        }

        let resolved = match std::fs::canonicalize(&dev_dir) {
            Ok(resolved) => resolved,
            Err(e) => {
                debug!("No sysfs entry for block device {}: {}", device, e);
                return false;
            }
        };

        if dev_dir.join("partition").exists() {
            if let Some(disk) = resolved.parent() {
                if read_flag(&disk.join("removable")) {
                    return true;
                }
            }
        }

        resolved
            .components()
            .any(|c| c.as_os_str().to_string_lossy().starts_with("usb"))
    }
}

impl Default for MountInfoMonitor {
    fn default() -> Self {
        Self::new()
    }
}

fn read_flag(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .map(|s| s.trim() == "1")
        .unwrap_or(false)
}

fn volume_name(entry: &MountEntry) -> String {
    entry
        .mount_point
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| entry.source.clone())
}

#[async_trait]
impl VolumeMonitor for MountInfoMonitor {
    async fn volumes(&self) -> Result<Vec<Volume>> {
        let monitor = self.clone();
        tokio::task::spawn_blocking(move || monitor.list_volumes())
            .await
            .context("Volume enumeration task failed")?
    }
}

/// Volume monitor returning a fixed set of volumes.
#[derive(Debug, Clone, Default)]
pub struct StaticVolumeMonitor {
    volumes: Vec<Volume>,
}

impl StaticVolumeMonitor {
    pub fn new(volumes: Vec<Volume>) -> Self {
        Self { volumes }
    }
}

#[async_trait]
impl VolumeMonitor for StaticVolumeMonitor {
    async fn volumes(&self) -> Result<Vec<Volume>> {
        Ok(self.volumes.clone())
    }
}
