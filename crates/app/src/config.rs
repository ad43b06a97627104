use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::cli::CliArgs;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct Config {
    pub version: u32,
    /// Host repository searched by the config finder.
    pub repo: PathBuf,
    /// `EnvFilter` directive used when `RUST_LOG` is not set.
    pub log_filter: Option<String>,
    pub finders: FindersConfig,
    pub mounts: MountsConfig,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct FindersConfig {
    pub config: bool,
    pub mount: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum MountSource {
    /// Kernel mount table and sysfs.
    #[default]
    System,
    /// The volumes listed under `[mounts] static`.
    Static,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
#[serde(default)]
pub struct MountsConfig {
    pub source: MountSource,
    #[serde(rename = "static")]
    pub static_volumes: Vec<StaticVolumeConfig>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct StaticVolumeConfig {
    pub name: String,
    pub root: PathBuf,
    #[serde(default)]
    pub removable: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            repo: PathBuf::from("/ostree/repo"),
            log_filter: None,
            finders: FindersConfig::default(),
            mounts: MountsConfig::default(),
        }
    }
}

impl Default for FindersConfig {
    fn default() -> Self {
        Self {
            config: true,
            mount: true,
        }
    }
}

pub fn get_default_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "repofinder")
        .context("Failed to determine project directories")?;

    let config_dir = proj_dirs.config_dir();
    Ok(config_dir.join("repofinder.toml"))
}

impl Config {
    /// Load the configuration file, falling back to defaults when it does
    /// not exist. The file is never written.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p,
            None => get_default_config_path()?,
        };

        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn from_cli_and_file(cli_args: &CliArgs) -> Result<Self> {
        let mut config = Self::load(cli_args.config.clone())?;

        // CLI args override config file
        if let Some(repo) = &cli_args.repo {
            config.repo = repo.clone();
        }
        if cli_args.no_config_finder {
            config.finders.config = false;
        }
        if cli_args.no_mount_finder {
            config.finders.mount = false;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.version, 1);
        assert_eq!(config.repo, PathBuf::from("/ostree/repo"));
        assert!(config.finders.config);
        assert!(config.finders.mount);
        assert_eq!(config.mounts.source, MountSource::System);
        assert!(config.mounts.static_volumes.is_empty());
    }

    #[test]
    fn test_config_parse_full() -> Result<()> {
        let config: Config = toml::from_str(
            r#"
version = 1
repo = "/srv/repo"
log_filter = "repofinder=debug"

[finders]
config = false

[mounts]
source = "static"
static = [
  { name = "usb", root = "/media/usb", removable = true },
  { name = "disk", root = "/media/disk" },
]
"#,
        )?;

        assert_eq!(config.repo, PathBuf::from("/srv/repo"));
        assert_eq!(config.log_filter.as_deref(), Some("repofinder=debug"));
        assert!(!config.finders.config);
        assert!(config.finders.mount);
        assert_eq!(config.mounts.source, MountSource::Static);
        assert_eq!(
            config.mounts.static_volumes,
            vec![
                StaticVolumeConfig {
                    name: "usb".to_string(),
                    root: PathBuf::from("/media/usb"),
                    removable: true,
                },
                StaticVolumeConfig {
                    name: "disk".to_string(),
                    root: PathBuf::from("/media/disk"),
                    removable: false,
                },
            ]
        );
        Ok(())
    }

    #[test]
    fn test_config_serialization_roundtrip() -> Result<()> {
        let mut config = Config::default();
        config.repo = PathBuf::from("/test/repo");
        config.mounts.source = MountSource::Static;
        config.mounts.static_volumes.push(StaticVolumeConfig {
            name: "usb".to_string(),
            root: PathBuf::from("/media/usb"),
            removable: true,
        });

        let toml_str = toml::to_string(&config)?;
        let parsed_config: Config = toml::from_str(&toml_str)?;

        assert_eq!(config, parsed_config);
        Ok(())
    }

    #[test]
    fn test_config_load_nonexistent_uses_default() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load(Some(config_path.clone()))?;

        assert_eq!(config, Config::default());
        assert!(!config_path.exists());
        Ok(())
    }

    #[test]
    fn test_config_load_invalid_is_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("bad.toml");
        fs::write(&config_path, "[mounts]\nsource = \"floppy\"\n")?;

        assert!(Config::load(Some(config_path)).is_err());
        Ok(())
    }

    #[test]
    fn test_cli_override() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("test.toml");
        fs::write(&config_path, "repo = \"/original/repo\"\n")?;

        let cli_args = CliArgs::parse_from([
            "repofinder",
            "--config",
            config_path.to_str().context("temp path is not UTF-8")?,
            "--repo",
            "/override/repo",
            "--no-config-finder",
            "app/foo",
        ]);

        let final_config = Config::from_cli_and_file(&cli_args)?;
        assert_eq!(final_config.repo, PathBuf::from("/override/repo"));
        assert!(!final_config.finders.config);
        assert!(final_config.finders.mount);
        Ok(())
    }

    #[test]
    fn test_get_default_config_path() -> Result<()> {
        let path = get_default_config_path()?;
        assert!(path.ends_with("repofinder.toml"));
        Ok(())
    }
}
