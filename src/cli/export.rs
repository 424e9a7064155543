//! Export command - send the current branch's changes to review

use crate::cli::Session;
use crate::cli::style::{Stylize, check, cross};
use git_rv::error::Result;
use git_rv::workflow::{ExportOptions, ExportWorkflow};
use std::path::Path;

/// Run the export command
pub async fn run_export(path: &Path, options: ExportOptions) -> Result<()> {
    let session = Session::open(path);
    let branch = session.git.current_branch().await?;

    // No machine is built against a dirty tree; show what is uncommitted.
    if !session.git.is_clean().await? {
        println!(
            "{} Branch {} not in clean state:",
            cross(),
            branch.error()
        );
        println!("{}", session.git.diff().await?);
        return Ok(());
    }

    let workflow = ExportWorkflow::begin(session.ctx(), &branch, options).await?;
    let record = workflow.run().await?;
    println!(
        "{} Exported branch {} to issue {}.",
        check(),
        branch.accent(),
        record.issue()?.accent()
    );
    Ok(())
}
