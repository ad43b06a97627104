use crate::error::{FinderError, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;

/// Check that a string could be a ref name: non-empty and ASCII only.
///
/// Slashes are allowed; nested ref names map to nested paths on disk.
pub fn is_valid_ref_name(name: &str) -> bool {
    !name.is_empty() && name.is_ascii()
}

/// Checksum syntax is owned by the content store, so every value passes.
pub fn is_valid_checksum(_checksum: &str) -> bool {
    true
}

/// Validate a query's ref list: non-empty, and every element a valid ref name.
pub fn validate_ref_array<S: AsRef<str>>(refs: &[S]) -> Result<()> {
    if refs.is_empty() {
        return Err(FinderError::invalid_argument("at least one ref is required"));
    }

    for name in refs {
        let name = name.as_ref();
        if !is_valid_ref_name(name) {
            return Err(FinderError::invalid_argument(format!(
                "invalid ref name '{}'",
                name.escape_debug()
            )));
        }
    }

    Ok(())
}

/// Validate a ref-to-checksum map. A `None` checksum marks a missing ref.
pub fn validate_ref_map<K: AsRef<str>>(ref_to_checksum: &BTreeMap<K, Option<String>>) -> Result<()> {
    if ref_to_checksum.is_empty() {
        return Err(FinderError::invalid_argument("ref map must not be empty"));
    }

    for (name, checksum) in ref_to_checksum {
        let name = name.as_ref();
        if !is_valid_ref_name(name) {
            return Err(FinderError::invalid_argument(format!(
                "invalid ref name '{}'",
                name.escape_debug()
            )));
        }
        if let Some(checksum) = checksum {
            if !is_valid_checksum(checksum) {
                return Err(FinderError::invalid_argument(format!(
                    "invalid checksum '{}' for ref '{}'",
                    checksum, name
                )));
            }
        }
    }

    Ok(())
}

/// A validated ref name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RefName(String);

impl RefName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !is_valid_ref_name(&name) {
            return Err(FinderError::invalid_argument(format!(
                "invalid ref name '{}'",
                name.escape_debug()
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments of the ref below a base directory. Empty segments from
    /// leading or doubled `/` are dropped. Returns `None` when nothing is
    /// left or a segment is `.` or `..`, as such a ref names no path below
    /// the base.
    pub fn path_segments(&self) -> Option<Vec<&str>> {
        let segments: Vec<&str> = self.0.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() || segments.iter().any(|s| matches!(*s, "." | "..")) {
            return None;
        }
        Some(segments)
    }
}

impl TryFrom<String> for RefName {
    type Error = FinderError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<RefName> for String {
    fn from(value: RefName) -> Self {
        value.0
    }
}

impl AsRef<str> for RefName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RefName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The refs a caller wants to fetch. Never empty; order is the caller's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefList(Vec<RefName>);

impl RefList {
    pub fn new(refs: Vec<RefName>) -> Result<Self> {
        if refs.is_empty() {
            return Err(FinderError::invalid_argument("at least one ref is required"));
        }
        Ok(Self(refs))
    }

    /// Validate and wrap raw ref strings.
    pub fn parse<S: AsRef<str>>(refs: &[S]) -> Result<Self> {
        validate_ref_array(refs)?;
        Ok(Self(
            refs.iter()
                .map(|name| RefName(name.as_ref().to_string()))
                .collect(),
        ))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RefName> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|r| r.as_str() == name)
    }

    pub fn as_slice(&self) -> &[RefName] {
        &self.0
    }
}

impl<'a> IntoIterator for &'a RefList {
    type Item = &'a RefName;
    type IntoIter = std::slice::Iter<'a, RefName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::fmt::Display for RefList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(RefName::as_str).collect();
        write!(f, "{}", joined.join(", "))
    }
}
