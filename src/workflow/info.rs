//! Get-info workflow: report the review state of the current branch

use crate::error::Result;
use crate::metadata::RecordStore;
use crate::review::refresh_record_from_issue;
use crate::workflow::WorkflowContext;

/// Prints a branch's record, optionally refreshing it from the server first
pub struct GetInfoWorkflow<'a> {
    ctx: WorkflowContext<'a>,
    branch: String,
    pull: bool,
}

impl<'a> GetInfoWorkflow<'a> {
    /// Prepare a report for `branch`
    pub const fn begin(ctx: WorkflowContext<'a>, branch: String, pull: bool) -> Self {
        Self { ctx, branch, pull }
    }

    /// Load, optionally refresh, and print the record
    pub async fn run(self) -> Result<()> {
        let store = RecordStore::new(self.ctx.git);
        let Some(mut record) = store.load(&self.branch).await? else {
            println!("No review data found in branch {:?}.", self.branch);
            return Ok(());
        };

        if self.pull {
            match refresh_record_from_issue(self.ctx.review, self.ctx.git, &mut record).await {
                Ok(true) => println!("Metadata update from code server succeeded."),
                Ok(false) | Err(_) => println!("Metadata update from code server failed."),
            }
        }

        println!("{}", serde_json::to_string_pretty(&record)?);
        Ok(())
    }
}
