use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const OPTION_URL: &str = "url";
pub const OPTION_GPG_VERIFY: &str = "gpg-verify";
pub const OPTION_GPG_VERIFY_SUMMARY: &str = "gpg-verify-summary";

/// A server from which refs can be pulled.
///
/// `options` holds the keyed configuration for the remote's group
/// (`remote "<name>"`); `url` is always present for remotes produced by
/// the built-in finders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    pub group: String,
    pub options: BTreeMap<String, String>,
}

impl Remote {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let name = name.into();
        let mut options = BTreeMap::new();
        options.insert(OPTION_URL.to_string(), url.into());
        Self {
            group: group_for(&name),
            name,
            options,
        }
    }

    /// Build a remote from an already-collected option map.
    pub fn with_options(name: impl Into<String>, options: BTreeMap<String, String>) -> Self {
        let name = name.into();
        Self {
            group: group_for(&name),
            name,
            options,
        }
    }

    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        self.set_option(key, if value { "true" } else { "false" });
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }

    pub fn bool_option(&self, key: &str) -> Option<bool> {
        match self.option(key)? {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        self.option(OPTION_URL)
    }
}

fn group_for(name: &str) -> String {
    format!("remote \"{}\"", name)
}

impl std::fmt::Display for Remote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.url() {
            Some(url) => write!(f, "{} ({})", self.name, url),
            None => write!(f, "{}", self.name),
        }
    }
}
