//! Per-branch review metadata
//!
//! A [`BranchRecord`] ties one local branch to a remote branch and a hosted
//! review issue. Fields that identify those counterparts are protected by
//! [`WriteOnce`]: once recorded they may be re-asserted with the same value
//! but never changed, which is what keeps a half-finished workflow safe to
//! re-run. Records serialize to JSON and live in repository-local git
//! config (see [`store`]).

mod store;

pub use store::RecordStore;

use crate::error::{Error, Result};
use crate::git::validate_hash;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A field that may be set once and re-asserted, but never changed
///
/// Serializes transparently as the inner value (or absent when unset), so
/// records round-trip as plain JSON objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteOnce<T>(Option<T>);

impl<T> Default for WriteOnce<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<T: PartialEq + Debug> WriteOnce<T> {
    /// The stored value, if any
    pub const fn get(&self) -> Option<&T> {
        self.0.as_ref()
    }

    /// Whether no value has been stored yet
    pub const fn is_none(&self) -> bool {
        self.0.is_none()
    }

    /// Store a value, or re-assert the stored one
    ///
    /// Setting the same value again is a no-op; a diverging value is an
    /// error naming `field`.
    pub fn set(&mut self, field: &'static str, value: T) -> Result<()> {
        match &self.0 {
            None => {
                self.0 = Some(value);
                Ok(())
            }
            Some(current) if *current == value => Ok(()),
            Some(current) => Err(Error::ImmutableField {
                field,
                current: format!("{current:?}"),
            }),
        }
    }
}

impl<T> From<T> for WriteOnce<T> {
    fn from(value: T) -> Self {
        Self(Some(value))
    }
}

/// Linkage between a local branch and the remote branch it reviews against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLinkage {
    /// Name of the git remote
    #[serde(default, skip_serializing_if = "WriteOnce::is_none")]
    pub remote: WriteOnce<String>,
    /// Branch on that remote
    #[serde(default, skip_serializing_if = "WriteOnce::is_none")]
    pub branch: WriteOnce<String>,
    /// URL of the remote at the time of linking
    #[serde(default, skip_serializing_if = "WriteOnce::is_none")]
    pub url: WriteOnce<String>,
    /// Remote tip at the time of linking; the review's base commit
    #[serde(default, skip_serializing_if = "WriteOnce::is_none")]
    pub commit_hash: WriteOnce<String>,
    /// Most recent remote tip that has been merged into the branch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_synced: Option<String>,
}

impl RemoteLinkage {
    /// Build a fresh linkage; `last_synced` starts at the base commit
    pub fn new(remote: String, branch: String, url: String, commit_hash: String) -> Self {
        Self {
            remote: remote.into(),
            branch: branch.into(),
            url: url.into(),
            last_synced: Some(commit_hash.clone()),
            commit_hash: commit_hash.into(),
        }
    }

    /// The `remote/branch` reference, once both halves are known
    pub fn remote_ref(&self) -> Option<String> {
        match (self.remote.get(), self.branch.get()) {
            (Some(remote), Some(branch)) => Some(format!("{remote}/{branch}")),
            _ => None,
        }
    }

    /// Merge fields present in `delta`, enforcing write-once protection
    pub fn update(&mut self, delta: &Self) -> Result<()> {
        if let Some(value) = delta.remote.get() {
            self.remote.set("remote", value.clone())?;
        }
        if let Some(value) = delta.branch.get() {
            self.branch.set("branch", value.clone())?;
        }
        if let Some(value) = delta.url.get() {
            self.url.set("url", value.clone())?;
        }
        if let Some(value) = delta.commit_hash.get() {
            self.commit_hash.set("commit_hash", value.clone())?;
        }
        if let Some(value) = &delta.last_synced {
            self.last_synced = Some(value.clone());
        }
        Ok(())
    }
}

/// Linkage between a local branch and its hosted review issue
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewLinkage {
    /// Issue identifier on the review server
    #[serde(default, skip_serializing_if = "WriteOnce::is_none")]
    pub issue: WriteOnce<u64>,
    /// Current review subject line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Current review description (may be empty)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Branch tip at the most recent export
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<String>,
}

impl ReviewLinkage {
    /// Merge fields present in `delta`, enforcing write-once protection
    pub fn update(&mut self, delta: &Self) -> Result<()> {
        if let Some(value) = delta.issue.get() {
            self.issue.set("issue", *value)?;
        }
        if let Some(value) = &delta.subject {
            self.subject = Some(value.clone());
        }
        if let Some(value) = &delta.description {
            self.description = Some(value.clone());
        }
        if let Some(value) = &delta.last_commit {
            self.last_commit = Some(value.clone());
        }
        Ok(())
    }
}

/// All review state recorded for one local branch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRecord {
    /// Branch name; the store key, not part of the serialized payload
    #[serde(skip)]
    pub(crate) branch: String,

    /// Review server host, recorded at first export
    #[serde(default, skip_serializing_if = "WriteOnce::is_none")]
    pub server: WriteOnce<String>,
    /// Whether the review is restricted-access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    /// CC addresses on the review
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cc: Option<Vec<String>>,
    /// Reviewer addresses on the review
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewers: Option<Vec<String>>,
    /// Set when a sync stopped at a merge conflict awaiting `sync --continue`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_halted: Option<bool>,

    /// Remote linkage
    #[serde(default, rename = "remote_info")]
    pub remote: RemoteLinkage,
    /// Review linkage
    #[serde(default, rename = "review_info")]
    pub review: ReviewLinkage,
}

impl BranchRecord {
    /// Create an empty record for a branch
    pub fn new(branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            ..Default::default()
        }
    }

    /// The branch this record describes
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Re-key the record to a different branch name
    pub fn set_branch(&mut self, branch: &str) {
        self.branch = branch.to_string();
    }

    /// Whether an issue has been created for this branch
    pub const fn in_review(&self) -> bool {
        !self.review.issue.is_none()
    }

    /// The issue identifier, or the no-review error for this branch
    pub fn issue(&self) -> Result<u64> {
        self.review
            .issue
            .get()
            .copied()
            .ok_or_else(|| Error::NoReview(self.branch.clone()))
    }

    /// The review server, which every linked record carries
    pub fn server(&self) -> Result<&str> {
        self.server
            .get()
            .map(String::as_str)
            .ok_or_else(|| Error::Internal(format!("record for {:?} has no server", self.branch)))
    }

    /// Merge remote-linkage fields present in `delta`
    pub fn merge_remote(&mut self, delta: &RemoteLinkage) -> Result<()> {
        self.remote.update(delta)
    }

    /// Merge review-linkage fields present in `delta`
    pub fn merge_review(&mut self, delta: &ReviewLinkage) -> Result<()> {
        self.review.update(delta)
    }

    /// Check hash-valued fields after decoding an untrusted payload
    pub fn validate(&self) -> Result<()> {
        for hash in [
            self.remote.commit_hash.get(),
            self.remote.last_synced.as_ref(),
            self.review.last_commit.as_ref(),
        ]
        .into_iter()
        .flatten()
        {
            validate_hash(hash)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const HASH_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn linked_remote() -> RemoteLinkage {
        RemoteLinkage::new(
            "origin".into(),
            "main".into(),
            "https://example.com/repo.git".into(),
            HASH_A.into(),
        )
    }

    #[test]
    fn write_once_reassert_is_noop() {
        let mut field = WriteOnce::default();
        field.set("issue", 42u64).unwrap();
        field.set("issue", 42u64).unwrap();
        assert_eq!(field.get(), Some(&42));
    }

    #[test]
    fn write_once_rejects_divergence() {
        let mut field = WriteOnce::default();
        field.set("issue", 42u64).unwrap();
        let err = field.set("issue", 43u64).unwrap_err();
        assert!(matches!(err, Error::ImmutableField { field: "issue", .. }));
        assert_eq!(field.get(), Some(&42));
    }

    #[test]
    fn new_linkage_seeds_last_synced() {
        let remote = linked_remote();
        assert_eq!(remote.last_synced.as_deref(), Some(HASH_A));
        assert_eq!(remote.remote_ref().as_deref(), Some("origin/main"));
    }

    #[test]
    fn update_merges_only_present_fields() {
        let mut remote = linked_remote();
        let delta = RemoteLinkage {
            last_synced: Some(HASH_B.into()),
            ..Default::default()
        };
        remote.update(&delta).unwrap();
        assert_eq!(remote.last_synced.as_deref(), Some(HASH_B));
        assert_eq!(remote.commit_hash.get().map(String::as_str), Some(HASH_A));
    }

    #[test]
    fn update_rejects_changed_base_commit() {
        let mut remote = linked_remote();
        let delta = RemoteLinkage {
            commit_hash: HASH_B.to_string().into(),
            ..Default::default()
        };
        assert!(remote.update(&delta).is_err());
    }

    #[test]
    fn record_round_trips_as_json() {
        let mut record = BranchRecord::new("feature");
        record.server.set("server", "codereview.example".into()).unwrap();
        record.reviewers = Some(vec!["alice@example.com".into()]);
        record.merge_remote(&linked_remote()).unwrap();
        record
            .merge_review(&ReviewLinkage {
                issue: 1234u64.into(),
                subject: Some("Add feature".into()),
                description: Some("Details.".into()),
                last_commit: Some(HASH_B.into()),
            })
            .unwrap();

        let json = serde_json::to_string(&record).unwrap();
        let mut decoded: BranchRecord = serde_json::from_str(&json).unwrap();
        decoded.branch = record.branch.clone();
        assert_eq!(decoded, record);
        decoded.validate().unwrap();
    }

    #[test]
    fn unset_fields_are_omitted_from_json() {
        let record = BranchRecord::new("feature");
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"remote_info":{},"review_info":{}}"#);
    }

    #[test]
    fn validate_rejects_corrupt_hash() {
        let mut record = BranchRecord::new("feature");
        record.review.last_commit = Some("not-a-hash".into());
        assert!(record.validate().is_err());
    }

    #[test]
    fn issue_error_names_branch() {
        let record = BranchRecord::new("feature");
        assert!(!record.in_review());
        let err = record.issue().unwrap_err();
        assert!(matches!(err, Error::NoReview(branch) if branch == "feature"));
    }
}
