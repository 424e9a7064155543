//! Sync workflow: reconcile upstream remote changes into the review branch
//!
//! New upstream commits are squash-merged into the branch and re-exported as
//! a patch set. A merge conflict halts the workflow with a persisted marker;
//! the user resolves, commits once, and re-invokes with `--continue`.

use crate::error::{Error, Result};
use crate::metadata::{BranchRecord, RecordStore};
use crate::workflow::{ExportOptions, ExportWorkflow, WorkflowContext};
use tracing::info;

enum SyncState {
    Start,
    CheckNew,
    CheckContinuing,
    FetchRemote,
    Merge { tip: String },
    AlertConflict { tip: String },
    ExportSynced { tip: Option<String> },
    CleanUp { clear: bool },
    Finished,
}

/// Drives one branch through a sync
pub struct SyncWorkflow<'a> {
    ctx: WorkflowContext<'a>,
    record: BranchRecord,
    branch: String,
    continuing: bool,
    last_commit: String,
    halted: bool,
}

impl std::fmt::Debug for SyncWorkflow<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncWorkflow")
            .field("record", &self.record)
            .field("branch", &self.branch)
            .field("continuing", &self.continuing)
            .field("last_commit", &self.last_commit)
            .field("halted", &self.halted)
            .finish_non_exhaustive()
    }
}

impl<'a> SyncWorkflow<'a> {
    /// Prepare a sync of `branch`; a branch without a record cannot sync
    pub async fn begin(
        ctx: WorkflowContext<'a>,
        branch: &str,
        continuing: bool,
    ) -> Result<SyncWorkflow<'a>> {
        let record = RecordStore::new(ctx.git).require(branch).await?;
        Ok(SyncWorkflow {
            ctx,
            record,
            branch: branch.to_string(),
            continuing,
            last_commit: String::new(),
            halted: false,
        })
    }

    /// Run the machine to its terminal state; returns the final record
    pub async fn run(mut self) -> Result<BranchRecord> {
        let mut state = SyncState::Start;
        loop {
            state = match state {
                SyncState::Start => self.start().await?,
                SyncState::CheckNew => self.check_new().await?,
                SyncState::CheckContinuing => self.check_continuing().await?,
                SyncState::FetchRemote => self.fetch_remote().await?,
                SyncState::Merge { tip } => self.merge(tip).await?,
                SyncState::AlertConflict { tip } => self.alert_conflict(tip).await?,
                SyncState::ExportSynced { tip } => self.export_synced(tip).await?,
                SyncState::CleanUp { clear } => self.clean_up(clear).await?,
                SyncState::Finished => return Ok(self.record),
            };
        }
    }

    async fn start(&mut self) -> Result<SyncState> {
        if !self.ctx.git.is_clean().await? {
            return Err(Error::DirtyTree {
                branch: self.branch.clone(),
                diff: self.ctx.git.diff().await?,
            });
        }
        self.last_commit = self
            .record
            .review
            .last_commit
            .clone()
            .ok_or_else(|| Error::NoReview(self.branch.clone()))?;
        self.halted = self.record.sync_halted.unwrap_or(false);
        Ok(if self.continuing {
            SyncState::CheckContinuing
        } else {
            SyncState::CheckNew
        })
    }

    async fn check_new(&mut self) -> Result<SyncState> {
        if self.halted {
            println!(
                "A \"git rv sync\" was previously halted in branch {:?}.",
                self.branch
            );
            println!("Please execute the command:");
            println!("\tgit rv sync --continue");
            println!("instead.");
            return Ok(SyncState::Finished);
        }
        let head = self.ctx.git.head_commit(&self.branch).await?;
        if head != self.last_commit {
            println!("You have changes which have not been exported.");
            println!("Please export them before syncing.");
            return Ok(SyncState::Finished);
        }
        Ok(SyncState::FetchRemote)
    }

    async fn check_continuing(&mut self) -> Result<SyncState> {
        if !self.halted {
            println!(
                "Can't continue sync; no halted sync detected in branch {:?}.",
                self.branch
            );
            return Ok(SyncState::Finished);
        }
        let commits = self
            .ctx
            .git
            .commits_between(&self.last_commit, "HEAD")
            .await?;
        match commits.len() {
            0 => {
                println!("Please make a commit after resolving the merge conflict.");
                Ok(SyncState::Finished)
            }
            // Resolution is exactly one commit; the tip fetched before the
            // conflict is already persisted in the record.
            1 => Ok(SyncState::ExportSynced { tip: None }),
            _ => {
                let oldest = commits.last().map(String::as_str).unwrap_or_default();
                println!("You have made more than one commit to resolve the merge");
                println!(
                    "conflict. Please revert back to commit {oldest:?} and attempt"
                );
                println!("to run \"git rv sync --continue\" again.");
                println!();
                println!("To revert back, you could execute");
                println!("\tgit reset {oldest}");
                Ok(SyncState::Finished)
            }
        }
    }

    async fn fetch_remote(&mut self) -> Result<SyncState> {
        let remote = self
            .record
            .remote
            .remote
            .get()
            .cloned()
            .ok_or_else(|| Error::Internal("record has no remote linkage".to_string()))?;
        println!("{}", self.ctx.git.fetch(&remote).await?);

        let remote_ref = self
            .record
            .remote
            .remote_ref()
            .ok_or_else(|| Error::Internal("record has no remote branch".to_string()))?;
        let tip = self.ctx.git.head_commit(&remote_ref).await?;
        if Some(tip.as_str()) == self.record.remote.last_synced.as_deref() {
            println!("No new changes in {remote_ref}.");
            return Ok(SyncState::Finished);
        }
        Ok(SyncState::Merge { tip })
    }

    async fn merge(&mut self, tip: String) -> Result<SyncState> {
        let out = self.ctx.git.merge_squash(&tip).await?;
        println!("{}", out.stdout);
        if out.success() {
            let message = format!("Syncing review {} at {}.", self.branch, tip);
            println!("{}", self.ctx.git.commit(&message).await?);
            info!(%tip, "merged remote tip");
            Ok(SyncState::ExportSynced { tip: Some(tip) })
        } else {
            Ok(SyncState::AlertConflict { tip })
        }
    }

    async fn alert_conflict(&mut self, tip: String) -> Result<SyncState> {
        // The halt must be durable before the user is told to continue;
        // recording the fetched tip now lets the continuation pick up where
        // the merge left off without re-fetching.
        self.record.sync_halted = Some(true);
        self.record.remote.last_synced = Some(tip);
        RecordStore::new(self.ctx.git).save(&self.record).await?;

        println!("There are merge conflicts with the remote repository.");
        println!("Please resolve these conflicts, make a commit and run:");
        println!("\tgit rv sync --continue");
        Ok(SyncState::CleanUp { clear: false })
    }

    async fn export_synced(&mut self, tip: Option<String>) -> Result<SyncState> {
        if let Some(tip) = tip {
            // Persisted before the export so a crash in between cannot lose
            // the fact that the tip's content is already merged locally.
            self.record.remote.last_synced = Some(tip);
            RecordStore::new(self.ctx.git).save(&self.record).await?;
        }

        println!("Exporting synced changes.");
        let options = ExportOptions {
            server: self.record.server.get().cloned(),
            private: self.record.private.unwrap_or(false),
            send_mail: true,
            ..Default::default()
        };
        let export = ExportWorkflow::begin(self.ctx, &self.branch, options).await?;
        self.record = export.run().await?;
        Ok(SyncState::CleanUp { clear: true })
    }

    async fn clean_up(&mut self, clear: bool) -> Result<SyncState> {
        if clear && self.record.sync_halted.take().is_some() {
            RecordStore::new(self.ctx.git).save(&self.record).await?;
        }
        Ok(SyncState::Finished)
    }
}
