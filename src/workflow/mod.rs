//! The workflow state machines
//!
//! Each workflow is an explicit state enum plus a `run` loop that matches on
//! the current state, performs that state's side effects, and assigns the
//! successor state. Data travels between states only as variant fields, so
//! every reachable configuration is spelled out in the type.
//!
//! Construction (`begin`) performs the workflow's precondition checks; a
//! workflow that cannot start never mutates anything.

mod branch;
mod export;
mod info;
mod submit;
mod sync;

pub use branch::{DeleteWorkflow, RenameWorkflow};
pub use export::{ExportOptions, ExportWorkflow};
pub use info::GetInfoWorkflow;
pub use submit::SubmitWorkflow;
pub use sync::SyncWorkflow;

use crate::git::Git;
use crate::prompt::Prompter;
use crate::review::ReviewService;

/// Review server used when a branch record does not name one
pub const DEFAULT_SERVER: &str = "codereview.appspot.com";

/// The collaborators every workflow runs against
#[derive(Clone, Copy)]
pub struct WorkflowContext<'a> {
    /// Local repository
    pub git: &'a Git,
    /// Hosted review service
    pub review: &'a dyn ReviewService,
    /// Interactive decision point
    pub prompter: &'a dyn Prompter,
}
