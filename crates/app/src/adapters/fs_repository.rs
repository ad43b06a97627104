use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use repofinder_core::domain::Remote;
use repofinder_core::ports::RemoteRepository;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Host repository stored in a directory.
///
/// Layout:
///
/// ```text
/// $R/config.toml               [remote.<name>] tables
/// $R/remotes.d/*.toml          more remotes, applied in file-name order
/// $R/refs/remotes/<name>/<ref> checksum files for refs the remote advertises
/// ```
pub struct FsRepository {
    path: PathBuf,
}

impl FsRepository {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and merge every remote configuration file.
    async fn load_remotes(&self) -> Result<BTreeMap<String, BTreeMap<String, String>>> {
        let mut remotes = BTreeMap::new();

        let config_path = self.path.join("config.toml");
        match fs::read_to_string(&config_path).await {
            Ok(contents) => merge_remote_tables(&mut remotes, &contents, &config_path)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No repository config at {}", config_path.display());
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to read repository config: {}", config_path.display())
                })
            }
        }

        let remotes_d = self.path.join("remotes.d");
        let mut entries = match fs::read_dir(&remotes_d).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(remotes),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read {}", remotes_d.display()))
            }
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("toml") {
                files.push(path);
            }
        }
        files.sort();

        for file in files {
            let contents = fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read remote config: {}", file.display()))?;
            merge_remote_tables(&mut remotes, &contents, &file)?;
        }

        Ok(remotes)
    }
}

/// Merge the `[remote.<name>]` tables of one TOML document into `remotes`.
/// Later documents override keys of earlier ones.
fn merge_remote_tables(
    remotes: &mut BTreeMap<String, BTreeMap<String, String>>,
    contents: &str,
    path: &Path,
) -> Result<()> {
    let table: toml::Table = toml::from_str(contents)
        .with_context(|| format!("Failed to parse remote config: {}", path.display()))?;

    let Some(section) = table.get("remote") else {
        return Ok(());
    };
    let Some(section) = section.as_table() else {
        bail!("'remote' in {} is not a table", path.display());
    };

    for (name, options) in section {
        let Some(options) = options.as_table() else {
            debug!("Ignoring remote '{}' in {}: not a table", name, path.display());
            continue;
        };

        let merged = remotes.entry(name.clone()).or_default();
        for (key, value) in options {
            match option_string(value) {
                Some(value) => {
                    merged.insert(key.clone(), value);
                }
                None => debug!(
                    "Ignoring option '{}' of remote '{}' in {}: not a scalar",
                    key,
                    name,
                    path.display()
                ),
            }
        }
    }

    Ok(())
}

fn option_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Datetime(d) => Some(d.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}

/// Every checksum file below `dir`, keyed by its `/`-joined relative path.
fn collect_ref_files(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut refs = BTreeMap::new();

    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.context("Failed to read directory entry")?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let name: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        let checksum = std::fs::read_to_string(entry.path())
            .with_context(|| format!("Failed to read ref file: {}", entry.path().display()))?;

        refs.insert(name.join("/"), checksum.trim().to_string());
    }

    Ok(refs)
}

#[async_trait]
impl RemoteRepository for FsRepository {
    async fn list_remotes(&self) -> Result<Vec<String>> {
        Ok(self.load_remotes().await?.into_keys().collect())
    }

    async fn list_refs(&self, remote_name: &str) -> Result<BTreeMap<String, String>> {
        let remotes = self.load_remotes().await?;
        if !remotes.contains_key(remote_name) {
            bail!("Remote '{}' is not configured", remote_name);
        }

        let dir = self.path.join("refs").join("remotes").join(remote_name);
        let metadata = fs::metadata(&dir)
            .await
            .with_context(|| format!("No refs cached for remote '{}' at {}", remote_name, dir.display()))?;
        if !metadata.is_dir() {
            bail!("{} is not a directory", dir.display());
        }

        tokio::task::spawn_blocking(move || collect_ref_files(&dir))
            .await
            .context("Ref listing task failed")?
    }

    async fn get_remote_config(&self, remote_name: &str) -> Result<Remote> {
        let mut remotes = self.load_remotes().await?;
        let options = remotes
            .remove(remote_name)
            .with_context(|| format!("Remote '{}' is not configured", remote_name))?;

        if !options.contains_key(repofinder_core::domain::OPTION_URL) {
            bail!("Remote '{}' has no url", remote_name);
        }

        Ok(Remote::with_options(remote_name, options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::TempDir;

    fn write(path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            std_fs::create_dir_all(parent)?;
        }
        std_fs::write(path, contents)?;
        Ok(())
    }

    #[tokio::test]
    async fn test_list_remotes_merges_remotes_d() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        write(
            &root.join("config.toml"),
            "[remote.origin]\nurl = \"https://origin.example\"\ngpg-verify = false\n",
        )?;
        write(
            &root.join("remotes.d/10-extra.toml"),
            "[remote.extra]\nurl = \"https://extra.example\"\n",
        )?;
        write(
            &root.join("remotes.d/20-override.toml"),
            "[remote.origin]\ngpg-verify = true\n",
        )?;
        write(&root.join("remotes.d/README"), "not toml")?;

        let repo = FsRepository::new(root);
        assert_eq!(repo.list_remotes().await?, vec!["extra", "origin"]);

        let origin = repo.get_remote_config("origin").await?;
        assert_eq!(origin.url(), Some("https://origin.example"));
        assert_eq!(origin.option("gpg-verify"), Some("true"));
        assert_eq!(origin.group, "remote \"origin\"");
        Ok(())
    }

    #[tokio::test]
    async fn test_list_refs_reads_nested_ref_files() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        write(&root.join("config.toml"), "[remote.A]\nurl = \"http://a\"\n")?;
        write(&root.join("refs/remotes/A/os/x86/stable"), "abc123\n")?;
        write(&root.join("refs/remotes/A/os/x86/beta"), "def456\n")?;

        let repo = FsRepository::new(root);
        let refs = repo.list_refs("A").await?;
        assert_eq!(refs.len(), 2);
        assert_eq!(refs.get("os/x86/stable").map(String::as_str), Some("abc123"));
        assert_eq!(refs.get("os/x86/beta").map(String::as_str), Some("def456"));
        Ok(())
    }

    #[tokio::test]
    async fn test_errors_for_unknown_or_incomplete_remotes() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();
        write(&root.join("config.toml"), "[remote.nourl]\ngpg-verify = true\n")?;

        let repo = FsRepository::new(root);
        assert!(repo.list_refs("missing").await.is_err());
        assert!(repo.list_refs("nourl").await.is_err());
        assert!(repo.get_remote_config("missing").await.is_err());
        assert!(repo.get_remote_config("nourl").await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_repository_has_no_remotes() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let repo = FsRepository::new(temp_dir.path());
        assert!(repo.list_remotes().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_config_is_an_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        write(&temp_dir.path().join("config.toml"), "this is = = not toml")?;

        let repo = FsRepository::new(temp_dir.path());
        assert!(repo.list_remotes().await.is_err());
        Ok(())
    }
}
