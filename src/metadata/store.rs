//! Branch records persisted in repository-local git config
//!
//! Each record is stored under `review-branches.<branch>` as base64 of its
//! JSON payload, so values survive git's config quoting rules and stay with
//! the clone they describe.

use crate::error::{Error, Result};
use crate::git::Git;
use crate::metadata::BranchRecord;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

const SECTION: &str = "review-branches";

/// Loads, saves and removes [`BranchRecord`]s for one repository
pub struct RecordStore<'a> {
    git: &'a Git,
}

impl<'a> RecordStore<'a> {
    /// Build a store over the given repository
    pub const fn new(git: &'a Git) -> Self {
        Self { git }
    }

    fn key(branch: &str) -> String {
        format!("{SECTION}.{branch}")
    }

    /// Load the record for a branch, `None` when nothing is stored
    pub async fn load(&self, branch: &str) -> Result<Option<BranchRecord>> {
        let Some(encoded) = self.git.config_get(&Self::key(branch)).await? else {
            return Ok(None);
        };
        let payload = STANDARD
            .decode(encoded.as_bytes())
            .map_err(|e| Error::RecordDecode {
                branch: branch.to_string(),
                reason: e.to_string(),
            })?;
        let mut record: BranchRecord =
            serde_json::from_slice(&payload).map_err(|e| Error::RecordDecode {
                branch: branch.to_string(),
                reason: e.to_string(),
            })?;
        record.branch = branch.to_string();
        record.validate()?;
        Ok(Some(record))
    }

    /// Load the record for a branch, failing when nothing is stored
    pub async fn require(&self, branch: &str) -> Result<BranchRecord> {
        self.load(branch)
            .await?
            .ok_or_else(|| Error::NoRecord(branch.to_string()))
    }

    /// Persist a record, overwriting any previous value for its branch
    pub async fn save(&self, record: &BranchRecord) -> Result<()> {
        let payload = serde_json::to_vec(record)?;
        let encoded = STANDARD.encode(payload);
        self.git.config_set(&Self::key(&record.branch), &encoded).await
    }

    /// Remove a branch's record, pruning the section once it is empty
    pub async fn remove(&self, branch: &str) -> Result<()> {
        self.git.config_unset(&Self::key(branch)).await?;
        let section_regex = format!("^{SECTION}\\.");
        if !self.git.config_has_matching(&section_regex).await? {
            self.git.config_remove_section(SECTION).await?;
        }
        Ok(())
    }
}
