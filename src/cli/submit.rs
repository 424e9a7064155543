//! Submit command - land an approved review on the remote

use crate::cli::Session;
use git_rv::error::{Error, Result};
use git_rv::workflow::SubmitWorkflow;
use std::path::Path;

/// Run the submit command
pub async fn run_submit(path: &Path, leave_open: bool) -> Result<()> {
    let session = Session::open(path);
    let branch = session.git.current_branch().await?;

    let workflow = match SubmitWorkflow::begin(session.ctx(), &branch, leave_open).await {
        Ok(workflow) => workflow,
        Err(Error::NoRecord(branch)) => {
            println!("There is no review data for branch {branch:?}.");
            return Ok(());
        }
        Err(Error::NoReview(branch)) => {
            println!("No issue set in branch {branch:?}.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    workflow.run().await
}
