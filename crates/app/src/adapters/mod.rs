pub mod config_finder;
pub mod fs_repository;
pub mod mount_finder;
pub mod volumes;

pub use config_finder::{ConfigFinder, CONFIG_FINDER_PRIORITY};
pub use fs_repository::FsRepository;
pub use mount_finder::{MountFinder, MOUNT_FINDER_PRIORITY, REPOS_DIR};
pub use volumes::{MountInfoMonitor, StaticVolumeMonitor};
