use super::refs::{validate_ref_map, RefName};
use super::remote::Remote;
use crate::error::{FinderError, Result};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One remote that claims to serve some of the queried refs.
///
/// Results are built by a finder during a single resolve call and are
/// read-only afterwards; all fields are exposed through accessors.
#[derive(Debug, Clone, PartialEq)]
pub struct FinderResult {
    remote: Remote,
    finder: String,
    priority: i32,
    supported_refs: Vec<RefName>,
    ref_to_checksum: Option<BTreeMap<RefName, Option<String>>>,
    summary_last_modified: u64,
}

impl FinderResult {
    /// `supported_refs` must be non-empty. `summary_last_modified` is seconds
    /// since the epoch, or 0 when unknown.
    pub fn new(
        remote: Remote,
        finder: impl Into<String>,
        priority: i32,
        supported_refs: Vec<RefName>,
        summary_last_modified: u64,
    ) -> Result<Self> {
        if supported_refs.is_empty() {
            return Err(FinderError::invalid_argument(format!(
                "result for remote '{}' has no supported refs",
                remote.name
            )));
        }

        Ok(Self {
            remote,
            finder: finder.into(),
            priority,
            supported_refs,
            ref_to_checksum: None,
            summary_last_modified,
        })
    }

    /// Build a result from `(ref, checksum)` pairs in the order the finder
    /// encountered the refs; that order becomes `supported_refs`. A `None`
    /// checksum means the remote advertises the ref but its commit is not
    /// known yet. Each ref may appear once.
    pub fn with_checksums(
        remote: Remote,
        finder: impl Into<String>,
        priority: i32,
        checksums: Vec<(RefName, Option<String>)>,
        summary_last_modified: u64,
    ) -> Result<Self> {
        let mut supported_refs = Vec::with_capacity(checksums.len());
        let mut ref_to_checksum = BTreeMap::new();
        for (name, checksum) in checksums {
            if ref_to_checksum.insert(name.clone(), checksum).is_some() {
                return Err(FinderError::invalid_argument(format!(
                    "ref '{}' listed twice for remote '{}'",
                    name, remote.name
                )));
            }
            supported_refs.push(name);
        }
        validate_ref_map(&ref_to_checksum)?;

        let mut result = Self::new(remote, finder, priority, supported_refs, summary_last_modified)?;
        result.ref_to_checksum = Some(ref_to_checksum);
        Ok(result)
    }

    pub fn remote(&self) -> &Remote {
        &self.remote
    }

    /// Name of the finder that produced this result.
    pub fn finder(&self) -> &str {
        &self.finder
    }

    /// Lower values are preferred.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn supported_refs(&self) -> &[RefName] {
        &self.supported_refs
    }

    pub fn ref_to_checksum(&self) -> Option<&BTreeMap<RefName, Option<String>>> {
        self.ref_to_checksum.as_ref()
    }

    pub fn summary_last_modified(&self) -> u64 {
        self.summary_last_modified
    }

    pub fn supports(&self, name: &str) -> bool {
        self.supported_refs.iter().any(|r| r.as_str() == name)
    }

    /// Total preorder over results; `Less` means `self` is preferred.
    ///
    /// Criteria, first difference wins: lower priority; older summary when
    /// both timestamps are known; fewer supported refs; remote name.
    // TODO: the timestamp and ref-count criteria look inverted (newer and
    // more refs should probably win); confirm with pull-engine owners first.
    pub fn compare(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| {
                let (a, b) = (self.summary_last_modified, other.summary_last_modified);
                if a != 0 && b != 0 {
                    a.cmp(&b)
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| self.supported_refs.len().cmp(&other.supported_refs.len()))
            .then_with(|| self.remote.name.cmp(&other.remote.name))
    }
}

/// Stable insertion sort by [`FinderResult::compare`].
///
/// `compare` is not transitive once an unknown summary timestamp meets two
/// known ones, which `slice::sort_by` may reject with a panic. Here every
/// adjacent pair of the output is in order and equal results keep their
/// input order.
pub fn sort_results(results: &mut [FinderResult]) {
    for i in 1..results.len() {
        let mut j = i;
        while j > 0 && results[j - 1].compare(&results[j]) == Ordering::Greater {
            results.swap(j - 1, j);
            j -= 1;
        }
    }
}
