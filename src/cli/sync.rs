//! Sync command - reconcile upstream changes into the review branch

use crate::cli::Session;
use git_rv::error::{Error, Result};
use git_rv::workflow::SyncWorkflow;
use std::path::Path;

/// Run the sync command
pub async fn run_sync(path: &Path, continuing: bool) -> Result<()> {
    let session = Session::open(path);
    let branch = session.git.current_branch().await?;

    let workflow = match SyncWorkflow::begin(session.ctx(), &branch, continuing).await {
        Ok(workflow) => workflow,
        Err(Error::NoRecord(branch)) => {
            println!("There is no review data for branch {branch:?}.");
            return Ok(());
        }
        Err(e) => return Err(e),
    };
    workflow.run().await?;
    Ok(())
}
