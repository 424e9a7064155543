//! Export workflow: send the branch's changes to the review server
//!
//! A branch with no review linkage gets a fresh issue; a branch already in
//! review gets a new patch set on its existing issue. Either way the branch
//! record is reseeded with the exported head and then refreshed from the
//! server, so later workflows see the authoritative subject and reviewer
//! lists.

use crate::error::{Error, Result};
use crate::git::MAX_SUBJECT_LEN;
use crate::metadata::{BranchRecord, RecordStore, RemoteLinkage, ReviewLinkage};
use crate::review::{PatchUpload, refresh_record_from_issue};
use crate::workflow::{DEFAULT_SERVER, WorkflowContext};
use tracing::info;

const REMOTE_PROMPT: &str =
    "You have more than one remote associated with this repository. Pick the remote to review against";
const REMOTE_BRANCH_PROMPT: &str =
    "You have more than one branch associated with this remote. Pick the branch to review against";
const MESSAGE_PROMPT: &str = "You have made more than one commit since the last export. Pick the commit message for this patch";
const NO_REMOTES: &str = "No remotes found in the current repository.";

/// CLI-supplied knobs for one export invocation
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Review server to export to; absent means keep or default
    pub server: Option<String>,
    /// Whether the issue should be restricted-access
    pub private: bool,
    /// CC addresses to record
    pub cc: Option<Vec<String>>,
    /// Reviewer addresses to record
    pub reviewers: Option<Vec<String>>,
    /// Explicit subject, overriding commit-message selection
    pub title: Option<String>,
    /// Explicit description; only allowed together with a title
    pub message: Option<String>,
    /// Whether the server should mail reviewers about the upload
    pub send_mail: bool,
}

enum ExportState {
    Assess,
    CreateIssue,
    UpdateIssue,
    UpdateMetadata { seed: Option<IssueSeed> },
    Finished,
}

/// Identity and message of a freshly-created issue, carried forward to
/// metadata seeding
struct IssueSeed {
    issue: u64,
    subject: String,
    description: String,
}

/// Drives one branch through an export
pub struct ExportWorkflow<'a> {
    ctx: WorkflowContext<'a>,
    record: BranchRecord,
    head: String,
    subject: String,
    description: String,
    send_mail: bool,
}

impl std::fmt::Debug for ExportWorkflow<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportWorkflow")
            .field("record", &self.record)
            .field("head", &self.head)
            .field("subject", &self.subject)
            .field("description", &self.description)
            .field("send_mail", &self.send_mail)
            .finish_non_exhaustive()
    }
}

impl<'a> ExportWorkflow<'a> {
    /// Prepare an export of `branch`
    ///
    /// Loads or creates the branch record, folds in the CLI options,
    /// establishes the remote linkage on first use (prompting where there is
    /// a real choice), persists the record, and resolves the patch message.
    pub async fn begin(
        ctx: WorkflowContext<'a>,
        branch: &str,
        options: ExportOptions,
    ) -> Result<ExportWorkflow<'a>> {
        let head = ctx.git.head_commit(branch).await?;
        let store = RecordStore::new(ctx.git);
        let mut record = store
            .load(branch)
            .await?
            .unwrap_or_else(|| BranchRecord::new(branch));

        apply_options(&mut record, &options)?;

        if record.remote.remote.get().is_none() {
            let linkage = establish_remote_linkage(ctx, branch).await?;
            record.merge_remote(&linkage)?;
        }
        store.save(&record).await?;

        let (subject, description) =
            resolve_message(ctx, &record, &head, options.title, options.message).await?;

        Ok(ExportWorkflow {
            ctx,
            record,
            head,
            subject,
            description,
            send_mail: options.send_mail,
        })
    }

    /// Run the machine to its terminal state; returns the final record
    pub async fn run(mut self) -> Result<BranchRecord> {
        let mut state = ExportState::Assess;
        loop {
            state = match state {
                ExportState::Assess => {
                    if self.record.in_review() {
                        ExportState::UpdateIssue
                    } else {
                        ExportState::CreateIssue
                    }
                }
                ExportState::CreateIssue => {
                    let issue = self
                        .ctx
                        .review
                        .create_issue(self.record.server()?, &self.upload())
                        .await?;
                    info!(issue, "created review issue");
                    ExportState::UpdateMetadata {
                        seed: Some(IssueSeed {
                            issue,
                            subject: self.subject.clone(),
                            description: self.description.clone(),
                        }),
                    }
                }
                ExportState::UpdateIssue => {
                    let mut do_upload = true;
                    if self.record.review.last_commit.as_deref() == Some(self.head.as_str()) {
                        println!("You have made no commits since your last export.");
                        println!("Exporting now will upload an empty patch, but may");
                        println!("update your metadata.");
                        do_upload = self.ctx.prompter.confirm("Upload anyway?")?;
                    }
                    if do_upload {
                        self.ctx
                            .review
                            .upload_patch(self.record.server()?, self.record.issue()?, &self.upload())
                            .await?;
                    }
                    ExportState::UpdateMetadata { seed: None }
                }
                ExportState::UpdateMetadata { seed } => {
                    self.update_metadata(seed).await?;
                    ExportState::Finished
                }
                ExportState::Finished => return Ok(self.record),
            };
        }
    }

    fn upload(&self) -> PatchUpload {
        PatchUpload {
            base_revision: self.record.remote.last_synced.clone().unwrap_or_default(),
            subject: self.subject.clone(),
            description: self.description.clone(),
            cc: self.record.cc.clone(),
            reviewers: self.record.reviewers.clone(),
            private: self.record.private.unwrap_or(false),
            send_mail: self.send_mail,
        }
    }

    async fn update_metadata(&mut self, seed: Option<IssueSeed>) -> Result<()> {
        let mut delta = ReviewLinkage {
            last_commit: Some(self.head.clone()),
            ..Default::default()
        };
        if let Some(seed) = seed {
            delta.issue = seed.issue.into();
            delta.description = if seed.description == seed.subject {
                Some(String::new())
            } else {
                Some(seed.description)
            };
            delta.subject = Some(seed.subject);
        }
        self.record.merge_review(&delta)?;
        RecordStore::new(self.ctx.git).save(&self.record).await?;

        match refresh_record_from_issue(self.ctx.review, self.ctx.git, &mut self.record).await {
            Ok(true) => println!("Metadata update from code server succeeded."),
            Ok(false) | Err(_) => {
                println!("Metadata update from code server failed.");
                println!("To try again run:");
                println!("\tgit rv getinfo --pull");
            }
        }
        Ok(())
    }
}

fn apply_options(record: &mut BranchRecord, options: &ExportOptions) -> Result<()> {
    match &options.server {
        Some(server) => record.server.set("server", server.clone())?,
        None => {
            if record.server.get().is_none() {
                record.server.set("server", DEFAULT_SERVER.to_string())?;
            }
        }
    }
    record.private = Some(options.private);
    if let Some(cc) = &options.cc {
        record.cc = Some(cc.clone());
    }
    if let Some(reviewers) = &options.reviewers {
        record.reviewers = Some(reviewers.clone());
    }
    Ok(())
}

/// Pick the remote and remote branch to review against and verify that the
/// remote tip is already part of the branch's history
async fn establish_remote_linkage(
    ctx: WorkflowContext<'_>,
    branch: &str,
) -> Result<RemoteLinkage> {
    let remotes = ctx.git.remotes().await?;
    let remote = ctx.prompter.choose(REMOTE_PROMPT, NO_REMOTES, &remotes)?;

    let branches = ctx.git.remote_branches(&remote).await?;
    let names: Vec<String> = branches.keys().cloned().collect();
    let no_branches = format!("No branches found for remote {remote:?}.");
    let remote_branch = ctx
        .prompter
        .choose(REMOTE_BRANCH_PROMPT, &no_branches, &names)?;
    let commit_hash = branches[&remote_branch].clone();

    let url = ctx.git.remote_url(&remote).await?;

    let containing = ctx.git.branches_containing(&commit_hash).await?;
    if !containing.iter().any(|b| b == branch) {
        return Err(Error::RemoteNotMerged {
            remote_ref: format!("{remote}/{remote_branch}"),
            commit_hash,
            branch: branch.to_string(),
        });
    }

    Ok(RemoteLinkage::new(remote, remote_branch, url, commit_hash))
}

/// Settle the subject and description for this patch set
///
/// An explicit title wins; otherwise the commits since the review's base are
/// the candidates, with exactly one commit skipping the prompt.
async fn resolve_message(
    ctx: WorkflowContext<'_>,
    record: &BranchRecord,
    head: &str,
    title: Option<String>,
    message: Option<String>,
) -> Result<(String, String)> {
    if let Some(title) = title {
        if title.len() > MAX_SUBJECT_LEN {
            return Err(Error::SubjectTooLong(title));
        }
        return Ok((title, message.unwrap_or_default()));
    }
    if message.is_some() {
        return Err(Error::Internal(
            "a patch description can only be set together with a title".to_string(),
        ));
    }

    let base = if record.in_review() {
        record
            .review
            .last_commit
            .clone()
            .ok_or_else(|| Error::NoReview(record.branch().to_string()))?
    } else {
        record
            .remote
            .commit_hash
            .get()
            .cloned()
            .ok_or_else(|| Error::Internal("remote linkage has no base commit".to_string()))?
    };

    let commits = ctx.git.commits_between(&base, head).await?;
    if commits.is_empty() {
        return Err(Error::NothingToExport(base));
    }

    let mut candidates = Vec::with_capacity(commits.len());
    for commit_hash in &commits {
        let (subject, description) = ctx.git.commit_message_parts(commit_hash).await?;
        let display = if description.is_empty() {
            subject.clone()
        } else {
            format!("{subject}\n\n{description}")
        };
        candidates.push((display, (subject, description)));
    }

    if candidates.len() == 1 {
        let (_, parts) = candidates.into_iter().next().unwrap_or_default();
        return Ok(parts);
    }

    let displays: Vec<String> = candidates.iter().map(|(d, _)| d.clone()).collect();
    let chosen = ctx
        .prompter
        .choose(MESSAGE_PROMPT, "no commit messages to choose from", &displays)?;
    candidates
        .into_iter()
        .find(|(display, _)| *display == chosen)
        .map(|(_, parts)| parts)
        .ok_or(Error::InvalidChoice(chosen))
}
