//! # ReportTags: observations attached to one reported outcome.
//!
//! An append-only, ordered multiset of `key = value` pairs. The same key may
//! appear more than once; every occurrence is counted by the reporter.
//!
//! ```rust
//! use objmigrate::ReportTags;
//!
//! let mut tags = ReportTags::new();
//! tags.push("status", "active").push("reason", "Already created in previous runs");
//! assert_eq!(tags.get("status"), Some("active"));
//! assert_eq!(tags.len(), 2);
//! ```

use std::fmt;

/// Ordered multiset of key/value observations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTags {
    entries: Vec<(String, String)>,
}

impl ReportTags {
    /// Creates an empty set of tags.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one observation.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.entries.push((key.into(), value.into()));
        self
    }

    /// Builder-style variant of [`push`](Self::push).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    /// Appends every observation of `other`, keeping its order.
    pub fn extend_from(&mut self, other: &ReportTags) {
        self.entries.extend(other.entries.iter().cloned());
    }

    /// First value recorded for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ReportTags {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl fmt::Display for ReportTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{k}={v:?}")?;
        }
        Ok(())
    }
}
