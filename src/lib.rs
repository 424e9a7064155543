//! git-rv - review-branch workflow tool
//!
//! Coordinates three independently-mutable stores of truth (a local feature
//! branch, a hosted code-review issue, and a shared remote repository)
//! through a family of resumable workflow state machines: export, sync,
//! submit, plus branch bookkeeping.
//!
//! The library assumes one interactive user per repository clone: workflows
//! take exclusive ownership of the working tree and the metadata store for
//! the duration of a single invocation, and no locking is performed.

pub mod error;
pub mod git;
pub mod hosting;
pub mod metadata;
pub mod prompt;
pub mod review;
pub mod workflow;
