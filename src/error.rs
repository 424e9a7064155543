//! Error types for git-rv

use thiserror::Error;

/// Result alias using the crate error type
pub type Result<T> = std::result::Result<T, Error>;

/// All errors produced by git-rv
#[derive(Debug, Error)]
pub enum Error {
    /// A git command exited with a non-zero status where success was required
    #[error("command `{command}` failed:\n{stderr}")]
    Command {
        /// The command line that was executed
        command: String,
        /// Captured standard error
        stderr: String,
    },

    /// Command output expected to be a single line was not
    #[error("output {0:?} is incorrectly formatted; expected a single line")]
    MalformedOutput(String),

    /// A value expected to be a 40-character hex commit hash was not
    #[error("{0:?} is not a valid commit hash")]
    InvalidHash(String),

    /// Unexpected output from `git ls-remote`
    #[error("unexpected output from \"git ls-remote\":\n{0}")]
    LsRemote(String),

    /// A write-once field was assigned a diverging value
    #[error("field {field:?} can't be changed; already set to {current}")]
    ImmutableField {
        /// Name of the protected field
        field: &'static str,
        /// Debug rendering of the value already stored
        current: String,
    },

    /// No branch record exists for the named branch
    #[error("there is no review data for branch {0:?}")]
    NoRecord(String),

    /// A branch record exists but carries no review linkage
    #[error("no issue set in branch {0:?}")]
    NoReview(String),

    /// The working tree has uncommitted changes
    #[error("branch {branch:?} not in clean state:\n{diff}")]
    DirtyTree {
        /// The branch that was checked
        branch: String,
        /// Output of `git diff`
        diff: String,
    },

    /// A commit subject exceeded the maximum length
    #[error("commit subject {0:?} exceeds 100 characters")]
    SubjectTooLong(String),

    /// A commit message did not begin with its own subject line
    #[error("commit message:\n{message:?}\ndoes not begin with the subject:\n{subject:?}")]
    MismatchedSubject {
        /// The full commit message
        message: String,
        /// The subject reported by git
        subject: String,
    },

    /// No commits exist between the tracked base and the branch head
    #[error("no commits have been made since {0}, can't get commit message")]
    NothingToExport(String),

    /// A choice prompt was invoked with an empty candidate list
    #[error("{0}")]
    NoChoices(String),

    /// The user's selection did not name a candidate or a valid index
    #[error("choice {0:?} is invalid")]
    InvalidChoice(String),

    /// The remote tip is not an ancestor of the branch under review
    #[error(
        "the HEAD commit in the remote {remote_ref} is {commit_hash:?}, but this commit \
         is not in the commit history for the current branch {branch:?}"
    )]
    RemoteNotMerged {
        /// `remote/branch` reference
        remote_ref: String,
        /// Tip commit of the remote branch
        commit_hash: String,
        /// The local branch being exported
        branch: String,
    },

    /// The review service returned a non-success status
    #[error("issue {issue} requested from {server:?} returned {status} {reason}")]
    ReviewStatus {
        /// Issue identifier
        issue: u64,
        /// Review server address
        server: String,
        /// HTTP status code
        status: u16,
        /// Status reason phrase
        reason: String,
    },

    /// A review-service call failed for a non-status reason
    #[error("review service error: {0}")]
    Review(String),

    /// Authentication against the review service failed or was unavailable
    #[error("authentication error: {0}")]
    Auth(String),

    /// A git commit hash has no entry in the foreign-VCS mapping file
    #[error("git commit hash {0} not in commit mapping")]
    NoCommitMapping(String),

    /// A hosting-provider URL was malformed in a provider-specific way
    #[error("{0}")]
    HostingUrl(String),

    /// The metadata store returned data that could not be decoded
    #[error("could not decode branch record for {branch:?}: {reason}")]
    RecordDecode {
        /// Branch whose record failed to decode
        branch: String,
        /// Human-readable decode failure
        reason: String,
    },

    /// HTTP transport error
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// JSON (de)serialization error
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// I/O error (subprocess spawn, mapfile read)
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Invariant violation inside git-rv itself
    #[error("internal error: {0}")]
    Internal(String),
}
