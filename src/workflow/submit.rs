//! Submit workflow: land an approved review as a single squashed commit
//!
//! The reviewed content is replayed onto the remote's last-synced commit on
//! a disposable landing branch, committed once, and pushed to the tracked
//! remote branch. Local state is rolled back on any mid-flight failure; on
//! success the review branch is re-created tracking the updated remote and
//! the branch record is discarded.

use crate::error::{Error, Result};
use crate::hosting::classify;
use crate::metadata::{BranchRecord, RecordStore};
use crate::review::{MessagePost, refresh_record_from_issue};
use crate::workflow::WorkflowContext;
use tracing::info;

/// Push rejection text identifying a stale local view of the remote
pub const TIP_BEHIND_HINT: &str =
    "Updates were rejected because the tip of your current branch is behind";

enum SubmitState {
    CheckEnvironment,
    VerifyApproval,
    RefreshMetadata,
    EnterDetached,
    ReplayRemoteHistory,
    CreateLandingBranch,
    CommitSquashed { landing: String },
    Push { landing: String },
    NotifyFailure { landing: Option<String>, stderr: String },
    CleanUpLocal { landing: Option<String>, success: bool },
    CleanUpReview,
    Finished,
}

/// Drives one branch through a submit
pub struct SubmitWorkflow<'a> {
    ctx: WorkflowContext<'a>,
    record: BranchRecord,
    branch: String,
    issue: u64,
    leave_open: bool,
    /// Head of the review branch before any mutation; the rollback target
    original_head: String,
    last_synced: String,
}

impl std::fmt::Debug for SubmitWorkflow<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmitWorkflow")
            .field("record", &self.record)
            .field("branch", &self.branch)
            .field("issue", &self.issue)
            .field("leave_open", &self.leave_open)
            .field("original_head", &self.original_head)
            .field("last_synced", &self.last_synced)
            .finish_non_exhaustive()
    }
}

impl<'a> SubmitWorkflow<'a> {
    /// Prepare a submit of `branch`; requires a record with a review linkage
    pub async fn begin(
        ctx: WorkflowContext<'a>,
        branch: &str,
        leave_open: bool,
    ) -> Result<SubmitWorkflow<'a>> {
        let record = RecordStore::new(ctx.git).require(branch).await?;
        let issue = record.issue()?;
        let last_synced = record
            .remote
            .last_synced
            .clone()
            .ok_or_else(|| Error::Internal("record has no last-synced commit".to_string()))?;
        let original_head = ctx.git.head_commit(branch).await?;
        Ok(SubmitWorkflow {
            ctx,
            record,
            branch: branch.to_string(),
            issue,
            leave_open,
            original_head,
            last_synced,
        })
    }

    /// Run the machine to its terminal state
    pub async fn run(mut self) -> Result<()> {
        let mut state = SubmitState::CheckEnvironment;
        loop {
            state = match state {
                SubmitState::CheckEnvironment => self.check_environment().await?,
                SubmitState::VerifyApproval => self.verify_approval().await?,
                SubmitState::RefreshMetadata => self.refresh_metadata().await?,
                SubmitState::EnterDetached => {
                    let out = self.ctx.git.checkout_detach(&self.branch).await?;
                    if out.success() {
                        SubmitState::ReplayRemoteHistory
                    } else {
                        SubmitState::NotifyFailure {
                            landing: None,
                            stderr: out.stderr,
                        }
                    }
                }
                SubmitState::ReplayRemoteHistory => {
                    // Keeps the reviewed tree and index but swaps the
                    // ancestry for the remote's history.
                    let out = self.ctx.git.reset_soft(&self.last_synced).await?;
                    if out.success() {
                        SubmitState::CreateLandingBranch
                    } else {
                        SubmitState::NotifyFailure {
                            landing: None,
                            stderr: out.stderr,
                        }
                    }
                }
                SubmitState::CreateLandingBranch => self.create_landing_branch().await?,
                SubmitState::CommitSquashed { landing } => self.commit_squashed(landing).await?,
                SubmitState::Push { landing } => self.push(landing).await?,
                SubmitState::NotifyFailure { landing, stderr } => {
                    notify_failure(&stderr);
                    SubmitState::CleanUpLocal {
                        landing,
                        success: false,
                    }
                }
                SubmitState::CleanUpLocal { landing, success } => {
                    self.clean_up_local(landing, success).await?
                }
                SubmitState::CleanUpReview => self.clean_up_review().await?,
                SubmitState::Finished => return Ok(()),
            };
        }
    }

    async fn check_environment(&mut self) -> Result<SubmitState> {
        if self.ctx.git.is_clean().await? {
            Ok(SubmitState::VerifyApproval)
        } else {
            Err(Error::DirtyTree {
                branch: self.branch.clone(),
                diff: self.ctx.git.diff().await?,
            })
        }
    }

    async fn verify_approval(&mut self) -> Result<SubmitState> {
        let metadata = self
            .ctx
            .review
            .issue_metadata(self.record.server()?, self.issue)
            .await?;
        if metadata.approved() {
            Ok(SubmitState::RefreshMetadata)
        } else {
            println!("This review has not been approved.");
            Ok(SubmitState::Finished)
        }
    }

    async fn refresh_metadata(&mut self) -> Result<SubmitState> {
        let refreshed =
            refresh_record_from_issue(self.ctx.review, self.ctx.git, &mut self.record).await?;
        if refreshed {
            Ok(SubmitState::EnterDetached)
        } else {
            // The landing commit message cannot be constructed without the
            // authoritative subject and description.
            println!("Metadata update from code server failed.");
            Ok(SubmitState::Finished)
        }
    }

    async fn create_landing_branch(&mut self) -> Result<SubmitState> {
        let mut landing = format!("review-{}", self.issue);
        while self.ctx.git.branch_exists(&landing).await? {
            landing.push_str("_0");
        }
        let out = self.ctx.git.checkout_new_branch(&landing).await?;
        if out.success() {
            Ok(SubmitState::CommitSquashed { landing })
        } else {
            Ok(SubmitState::NotifyFailure {
                landing: None,
                stderr: out.stderr,
            })
        }
    }

    async fn commit_squashed(&mut self, landing: String) -> Result<SubmitState> {
        let subject = self
            .record
            .review
            .subject
            .clone()
            .ok_or_else(|| Error::Internal("refreshed record has no subject".to_string()))?;
        let description = self.record.review.description.clone().unwrap_or_default();
        let message = squash_commit_message(
            &subject,
            &description,
            self.record.server()?,
            self.issue,
        );
        println!("Adding commit:\n{message}");
        let out = self.ctx.git.try_run(&["commit", "-m", &message]).await?;
        if out.success() {
            Ok(SubmitState::Push { landing })
        } else {
            Ok(SubmitState::NotifyFailure {
                landing: Some(landing),
                stderr: out.stderr,
            })
        }
    }

    async fn push(&mut self, landing: String) -> Result<SubmitState> {
        let remote = self.remote()?;
        let remote_branch = self
            .record
            .remote
            .branch
            .get()
            .cloned()
            .ok_or_else(|| Error::Internal("record has no remote branch".to_string()))?;
        let refspec = format!("{landing}:{remote_branch}");
        let out = self.ctx.git.push(&remote, &refspec).await?;
        if out.success() {
            info!(issue = self.issue, "pushed landing commit");
            Ok(SubmitState::CleanUpLocal {
                landing: Some(landing),
                success: true,
            })
        } else {
            Ok(SubmitState::NotifyFailure {
                landing: Some(landing),
                stderr: out.stderr,
            })
        }
    }

    /// Restore local branch state; on success replace the review branch with
    /// one tracking the updated remote and drop the record
    async fn clean_up_local(
        &mut self,
        landing: Option<String>,
        success: bool,
    ) -> Result<SubmitState> {
        self.ctx.git.checkout_force(&self.branch).await?;
        self.ctx.git.reset_hard(&self.original_head).await?;
        if let Some(landing) = landing {
            if self.ctx.git.branch_exists(&landing).await? {
                self.ctx.git.delete_branch(&landing).await?;
            }
        }

        if !success {
            return Ok(SubmitState::Finished);
        }

        println!(
            "Replacing review branch {:?} with newly committed content.",
            self.branch
        );
        let remote_ref = self
            .record
            .remote
            .remote_ref()
            .ok_or_else(|| Error::Internal("record has no remote linkage".to_string()))?;
        self.ctx.git.checkout_detach("HEAD").await?;
        self.ctx.git.delete_branch(&self.branch).await?;
        self.ctx
            .git
            .create_tracking_branch(&self.branch, &remote_ref)
            .await?;
        self.ctx.git.checkout(&self.branch).await?;
        RecordStore::new(self.ctx.git).remove(&self.branch).await?;
        Ok(SubmitState::CleanUpReview)
    }

    /// Best-effort: link the landed commit on the issue, then close it
    async fn clean_up_review(&mut self) -> Result<SubmitState> {
        let server = self.record.server()?.to_string();
        let commit_hash = self.ctx.git.head_commit(&self.branch).await?;

        if let Some(link) = self.landed_commit_link(&commit_hash).await? {
            let message = format!("Added in\n{link}");
            let post = MessagePost {
                message: message.clone(),
                subject: self.record.review.subject.clone().unwrap_or_default(),
                cc: self.record.cc.clone(),
                reviewers: self.record.reviewers.clone(),
            };
            if self
                .ctx
                .review
                .publish_message(&server, self.issue, &post)
                .await
                .is_err()
            {
                println!("Adding link to commit for issue {} failed.", self.issue);
                println!("To add it manually, visit https://{server}/{}/publish", self.issue);
                println!("and add this message:\n\n{message}");
            }
        }

        if !self.leave_open {
            match self.ctx.review.close_issue(&server, self.issue).await {
                Ok(()) => println!("Issue {} has been closed.", self.issue),
                Err(_) => {
                    println!("Closing issue {} failed.", self.issue);
                    println!(
                        "To close the issue manually, visit https://{server}/{}/",
                        self.issue
                    );
                    println!("and click the X in the top left corner.");
                }
            }
        }
        Ok(SubmitState::Finished)
    }

    /// Commit permalink on the hosting provider, when one is recognized
    async fn landed_commit_link(&self, commit_hash: &str) -> Result<Option<String>> {
        let Some(url) = self.record.remote.url.get() else {
            return Ok(None);
        };
        let git_root = self.ctx.git.repo_root().await?;
        let Some(kind) = classify(url, &git_root)? else {
            return Ok(None);
        };
        Ok(Some(kind.commit_link(commit_hash)?))
    }

    fn remote(&self) -> Result<String> {
        self.record
            .remote
            .remote
            .get()
            .cloned()
            .ok_or_else(|| Error::Internal("record has no remote".to_string()))
    }
}

fn notify_failure(stderr: &str) {
    if stderr.contains(TIP_BEHIND_HINT) {
        println!("{TIP_BEHIND_HINT}");
        println!();
        println!("Run \"git rv sync\".");
    } else {
        println!("Unknown error occurred:");
        println!("{stderr}");
    }
}

/// Message for the single landed commit
fn squash_commit_message(subject: &str, description: &str, server: &str, issue: u64) -> String {
    let description_newline = if description.is_empty() { "" } else { "\n" };
    format!(
        "{subject}\n\n{description}{description_newline}Reviewed in https://{server}/{issue}/"
    )
}
