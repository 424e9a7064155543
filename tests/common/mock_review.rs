//! Mock review service for testing
//!
//! Manually implements `ReviewService` with call tracking, configurable
//! issue metadata, and error injection for failure path testing.

use async_trait::async_trait;
use git_rv::error::{Error, Result};
use git_rv::review::{IssueMessage, IssueMetadata, MessagePost, PatchUpload, ReviewService};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Call record for `upload_patch`
#[derive(Debug, Clone)]
pub struct UploadCall {
    pub issue: u64,
    pub upload: PatchUpload,
}

/// Call record for `publish_message`
#[derive(Debug, Clone)]
pub struct PublishCall {
    pub issue: u64,
    pub post: MessagePost,
}

/// Simple in-memory review service
///
/// Issues are auto-numbered from 1. Creating an issue seeds its metadata
/// from the upload so the metadata-refresh path succeeds by default.
#[derive(Default)]
pub struct MockReviewService {
    next_issue: AtomicU64,
    metadata: Mutex<HashMap<u64, IssueMetadata>>,
    // Call tracking
    create_calls: Mutex<Vec<PatchUpload>>,
    upload_calls: Mutex<Vec<UploadCall>>,
    publish_calls: Mutex<Vec<PublishCall>>,
    close_calls: Mutex<Vec<u64>>,
    // Error injection
    error_on_metadata: Mutex<Option<String>>,
    error_on_close: Mutex<Option<String>>,
}

impl MockReviewService {
    pub fn new() -> Self {
        Self {
            next_issue: AtomicU64::new(1),
            ..Default::default()
        }
    }

    /// Attach an approval message to an issue
    pub fn approve(&self, issue: u64) {
        let mut metadata = self.metadata.lock().unwrap();
        metadata.entry(issue).or_default().messages.push(IssueMessage {
            approval: true,
            text: "LGTM".to_string(),
        });
    }

    /// Replace the stored metadata for an issue
    pub fn set_metadata(&self, issue: u64, value: IssueMetadata) {
        self.metadata.lock().unwrap().insert(issue, value);
    }

    /// Make `issue_metadata` return an error
    pub fn fail_metadata(&self, msg: &str) {
        *self.error_on_metadata.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `close_issue` return an error
    pub fn fail_close(&self, msg: &str) {
        *self.error_on_close.lock().unwrap() = Some(msg.to_string());
    }

    pub fn create_calls(&self) -> Vec<PatchUpload> {
        self.create_calls.lock().unwrap().clone()
    }

    pub fn upload_calls(&self) -> Vec<UploadCall> {
        self.upload_calls.lock().unwrap().clone()
    }

    pub fn publish_calls(&self) -> Vec<PublishCall> {
        self.publish_calls.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> Vec<u64> {
        self.close_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReviewService for MockReviewService {
    async fn issue_metadata(&self, _server: &str, issue: u64) -> Result<IssueMetadata> {
        if let Some(msg) = self.error_on_metadata.lock().unwrap().clone() {
            return Err(Error::Review(msg));
        }
        self.metadata
            .lock()
            .unwrap()
            .get(&issue)
            .cloned()
            .ok_or_else(|| Error::Review(format!("no such issue {issue}")))
    }

    async fn create_issue(&self, _server: &str, upload: &PatchUpload) -> Result<u64> {
        let issue = self.next_issue.fetch_add(1, Ordering::SeqCst);
        self.create_calls.lock().unwrap().push(upload.clone());
        self.metadata.lock().unwrap().insert(
            issue,
            IssueMetadata {
                subject: Some(upload.subject.clone()),
                description: Some(upload.description.clone()),
                reviewers: Some(upload.reviewers.clone().unwrap_or_default()),
                cc: Some(upload.cc.clone().unwrap_or_default()),
                messages: Vec::new(),
            },
        );
        Ok(issue)
    }

    async fn upload_patch(&self, _server: &str, issue: u64, upload: &PatchUpload) -> Result<()> {
        self.upload_calls.lock().unwrap().push(UploadCall {
            issue,
            upload: upload.clone(),
        });
        let mut metadata = self.metadata.lock().unwrap();
        let entry = metadata.entry(issue).or_default();
        entry.subject = Some(upload.subject.clone());
        entry.description = Some(upload.description.clone());
        entry.reviewers.get_or_insert_with(Vec::new);
        entry.cc.get_or_insert_with(Vec::new);
        Ok(())
    }

    async fn publish_message(&self, _server: &str, issue: u64, post: &MessagePost) -> Result<()> {
        self.publish_calls.lock().unwrap().push(PublishCall {
            issue,
            post: post.clone(),
        });
        Ok(())
    }

    async fn close_issue(&self, _server: &str, issue: u64) -> Result<()> {
        if let Some(msg) = self.error_on_close.lock().unwrap().clone() {
            return Err(Error::Review(msg));
        }
        self.close_calls.lock().unwrap().push(issue);
        Ok(())
    }
}
