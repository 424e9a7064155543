//! Branch bookkeeping commands - rename and delete review branches

use crate::cli::Session;
use git_rv::error::Result;
use git_rv::workflow::{DeleteWorkflow, RenameWorkflow};
use std::path::Path;

/// Run the rename command
pub async fn run_rename(path: &Path, source: String, target: String) -> Result<()> {
    let session = Session::open(path);
    RenameWorkflow::begin(session.ctx(), source, target).run().await
}

/// Run the delete command
pub async fn run_delete(path: &Path, branch: String) -> Result<()> {
    let session = Session::open(path);
    DeleteWorkflow::begin(session.ctx(), branch).run().await
}
