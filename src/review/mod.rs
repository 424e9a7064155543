//! Hosted code-review collaborator
//!
//! [`ReviewService`] abstracts the Rietveld-style review server so workflows
//! can be driven against a mock in tests; [`RietveldClient`] is the real
//! HTTP implementation.

mod rietveld;

pub use rietveld::RietveldClient;

use crate::error::Result;
use crate::git::Git;
use crate::metadata::{BranchRecord, RecordStore};
use async_trait::async_trait;
use serde::Deserialize;

/// One message posted on a review issue
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueMessage {
    /// Whether this message carried the reviewer's approval
    #[serde(default)]
    pub approval: bool,
    /// Message body
    #[serde(default)]
    pub text: String,
}

/// Metadata the review server reports for an issue
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueMetadata {
    /// Issue subject line
    pub subject: Option<String>,
    /// Issue description
    pub description: Option<String>,
    /// Reviewer addresses
    pub reviewers: Option<Vec<String>>,
    /// CC addresses
    pub cc: Option<Vec<String>>,
    /// Messages posted on the issue so far
    #[serde(default)]
    pub messages: Vec<IssueMessage>,
}

impl IssueMetadata {
    /// Whether any message on the issue carried an approval
    pub fn approved(&self) -> bool {
        self.messages.iter().any(|message| message.approval)
    }
}

/// A patch set destined for the review server
#[derive(Debug, Clone, Default)]
pub struct PatchUpload {
    /// Commit the patch is based on
    pub base_revision: String,
    /// Subject for the issue or patch set
    pub subject: String,
    /// Description body
    pub description: String,
    /// CC addresses
    pub cc: Option<Vec<String>>,
    /// Reviewer addresses
    pub reviewers: Option<Vec<String>>,
    /// Whether the issue is restricted-access
    pub private: bool,
    /// Whether the server should mail reviewers about the upload
    pub send_mail: bool,
}

/// A message to publish on an existing issue
#[derive(Debug, Clone, Default)]
pub struct MessagePost {
    /// Message body
    pub message: String,
    /// Issue subject to assert while publishing
    pub subject: String,
    /// CC addresses
    pub cc: Option<Vec<String>>,
    /// Reviewer addresses
    pub reviewers: Option<Vec<String>>,
}

/// Operations the workflows need from a review server
#[async_trait]
pub trait ReviewService: Send + Sync {
    /// Fetch metadata, including messages, for an issue
    async fn issue_metadata(&self, server: &str, issue: u64) -> Result<IssueMetadata>;

    /// Upload a first patch set, creating an issue; returns the issue id
    async fn create_issue(&self, server: &str, upload: &PatchUpload) -> Result<u64>;

    /// Upload a new patch set to an existing issue
    async fn upload_patch(&self, server: &str, issue: u64, upload: &PatchUpload) -> Result<()>;

    /// Publish a message on an issue
    async fn publish_message(&self, server: &str, issue: u64, post: &MessagePost) -> Result<()>;

    /// Mark an issue closed
    async fn close_issue(&self, server: &str, issue: u64) -> Result<()>;
}

/// Pull reviewer, CC and subject state from the hosted issue into the record
///
/// Returns whether a refresh was applied; a record without a review linkage,
/// or issue metadata missing any of the three required fields, leaves the
/// record untouched. A description identical to the subject collapses to
/// empty, matching how the server echoes subject-only issues.
pub async fn refresh_record_from_issue(
    service: &dyn ReviewService,
    git: &Git,
    record: &mut BranchRecord,
) -> Result<bool> {
    if !record.in_review() {
        return Ok(false);
    }
    let issue = record.issue()?;
    let server = record.server()?.to_string();
    let metadata = service.issue_metadata(&server, issue).await?;

    let (Some(reviewers), Some(cc), Some(subject)) =
        (metadata.reviewers, metadata.cc, metadata.subject)
    else {
        return Ok(false);
    };

    record.reviewers = Some(reviewers);
    record.cc = Some(cc);
    if let Some(description) = metadata.description {
        record.review.description = if description == subject {
            Some(String::new())
        } else {
            Some(description)
        };
    }
    record.review.subject = Some(subject);

    RecordStore::new(git).save(record).await?;
    Ok(true)
}
