//! Getinfo command - report the review state of the current branch

use crate::cli::Session;
use git_rv::error::Result;
use git_rv::workflow::GetInfoWorkflow;
use std::path::Path;

/// Run the getinfo command
pub async fn run_getinfo(path: &Path, pull: bool) -> Result<()> {
    let session = Session::open(path);
    let branch = session.git.current_branch().await?;
    GetInfoWorkflow::begin(session.ctx(), branch, pull).run().await
}
