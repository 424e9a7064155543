//! Branch bookkeeping workflows: rename and delete review branches
//!
//! Both only apply to branches with a branch record; for anything else the
//! plain git command is the right tool and the user is pointed at it.

use crate::error::Result;
use crate::metadata::RecordStore;
use crate::workflow::WorkflowContext;

/// Renames a review branch, moving its record under the new key
pub struct RenameWorkflow<'a> {
    ctx: WorkflowContext<'a>,
    source: String,
    target: String,
}

impl<'a> RenameWorkflow<'a> {
    /// Prepare a rename of `source` to `target`
    pub const fn begin(ctx: WorkflowContext<'a>, source: String, target: String) -> Self {
        Self {
            ctx,
            source,
            target,
        }
    }

    /// Check preconditions and perform the rename
    pub async fn run(self) -> Result<()> {
        let git = self.ctx.git;
        if git.branch_exists(&self.target).await? {
            println!("Target branch {:?} already exists.", self.target);
            return Ok(());
        }
        if !git.branch_exists(&self.source).await? {
            println!("Branch {:?} doesn't exist.", self.source);
            return Ok(());
        }
        if git.current_branch().await? == self.source {
            println!("Can't rename branch you're currently in.");
            return Ok(());
        }
        let store = RecordStore::new(git);
        let Some(mut record) = store.load(&self.source).await? else {
            println!("Branch {:?} has no review in progress.", self.source);
            println!("Instead, use the git command:");
            println!("\tgit branch -m {} {}", self.source, self.target);
            return Ok(());
        };

        println!("Renaming branch...");
        git.rename_branch(&self.source, &self.target).await?;

        println!("Moving review info.");
        record.set_branch(&self.target);
        store.save(&record).await?;
        store.remove(&self.source).await?;
        Ok(())
    }
}

/// Deletes a review branch together with its record
pub struct DeleteWorkflow<'a> {
    ctx: WorkflowContext<'a>,
    branch: String,
}

impl<'a> DeleteWorkflow<'a> {
    /// Prepare a delete of `branch`
    pub const fn begin(ctx: WorkflowContext<'a>, branch: String) -> Self {
        Self { ctx, branch }
    }

    /// Check preconditions and perform the delete
    pub async fn run(self) -> Result<()> {
        let git = self.ctx.git;
        if !git.branch_exists(&self.branch).await? {
            println!("Branch {:?} doesn't exist.", self.branch);
            return Ok(());
        }
        if git.current_branch().await? == self.branch {
            println!("Can't delete current branch.");
            return Ok(());
        }
        let store = RecordStore::new(git);
        if store.load(&self.branch).await?.is_none() {
            println!("Branch {:?} has no review in progress.", self.branch);
            println!("Instead, use the git command:");
            println!("\tgit branch -D {}", self.branch);
            return Ok(());
        }

        println!("Deleting branch...");
        git.delete_branch(&self.branch).await?;

        println!("Deleting review info.");
        store.remove(&self.branch).await?;
        Ok(())
    }
}
