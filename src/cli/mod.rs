//! CLI commands
//!
//! Command implementations for the `git-rv` binary. Each command opens the
//! repository, wires up the real collaborators, and hands control to the
//! matching workflow.

mod branch;
mod export;
mod info;
mod submit;
mod sync;

pub mod style;

pub use branch::{run_delete, run_rename};
pub use export::run_export;
pub use info::run_getinfo;
pub use submit::run_submit;
pub use sync::run_sync;

use git_rv::git::Git;
use git_rv::prompt::TerminalPrompt;
use git_rv::review::RietveldClient;
use git_rv::workflow::WorkflowContext;
use std::path::Path;

/// The real collaborators behind one command invocation
pub(crate) struct Session {
    git: Git,
    review: RietveldClient,
    prompter: TerminalPrompt,
}

impl Session {
    pub(crate) fn open(path: &Path) -> Self {
        Self {
            git: Git::open(path),
            review: RietveldClient::from_env(),
            prompter: TerminalPrompt,
        }
    }

    pub(crate) fn ctx(&self) -> WorkflowContext<'_> {
        WorkflowContext {
            git: &self.git,
            review: &self.review,
            prompter: &self.prompter,
        }
    }
}
