use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, PartialEq)]
#[command(name = "repofinder")]
#[command(about = "Find remotes and mounted volumes which serve the given refs")]
pub struct CliArgs {
    /// Refs to look for, e.g. exampleos/x86_64/stable
    #[arg(value_name = "REF", required = true)]
    pub refs: Vec<String>,

    /// Host repository whose configured remotes are searched (overrides config)
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Do not search configured remotes
    #[arg(long)]
    pub no_config_finder: bool,

    /// Do not search mounted volumes
    #[arg(long)]
    pub no_mount_finder: bool,

    /// Give up after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Log finder decisions at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_refs_only() {
        let args = CliArgs::parse_from(["repofinder", "os/x86/stable", "os/x86/beta"]);
        assert_eq!(args.refs, vec!["os/x86/stable", "os/x86/beta"]);
        assert_eq!(args.repo, None);
        assert_eq!(args.config, None);
        assert!(!args.no_config_finder);
        assert!(!args.no_mount_finder);
        assert_eq!(args.timeout, None);
        assert!(!args.verbose);
    }

    #[test]
    fn test_cli_parse_with_options() {
        let args = CliArgs::parse_from([
            "repofinder",
            "--repo",
            "/srv/repo",
            "--config",
            "/custom/config.toml",
            "--no-mount-finder",
            "--timeout",
            "5",
            "-v",
            "app/foo",
        ]);
        assert_eq!(args.refs, vec!["app/foo"]);
        assert_eq!(args.repo, Some(PathBuf::from("/srv/repo")));
        assert_eq!(args.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(args.no_mount_finder);
        assert!(!args.no_config_finder);
        assert_eq!(args.timeout, Some(5));
        assert!(args.verbose);
    }

    #[test]
    fn test_cli_requires_a_ref() {
        assert!(CliArgs::try_parse_from(["repofinder"]).is_err());
        assert!(CliArgs::try_parse_from(["repofinder", "--repo", "/srv/repo"]).is_err());
    }
}
