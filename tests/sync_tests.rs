//! Sync workflow tests against real git repositories

mod common;

use common::Harness;
use common::repo::git;
use git_rv::error::Error;
use git_rv::metadata::{BranchRecord, RecordStore};
use git_rv::workflow::{ExportOptions, ExportWorkflow, SyncWorkflow};

/// Create `feature-x` with one exported commit touching README
async fn exported_branch(h: &Harness) -> BranchRecord {
    git(&h.pair.work, &["checkout", "-b", "feature-x"]);
    h.pair
        .commit_file(&h.pair.work, "README", "feature\n", "Rework readme");
    let options = ExportOptions {
        reviewers: Some(vec!["alice@example.com".to_string()]),
        send_mail: true,
        ..Default::default()
    };
    ExportWorkflow::begin(h.ctx(), "feature-x", options)
        .await
        .unwrap()
        .run()
        .await
        .unwrap()
}

/// Advance the remote's main branch from an independent clone
fn advance_remote(h: &Harness, name: &str, content: &str, message: &str) -> String {
    let other = h.pair.second_clone();
    let tip = h.pair.commit_file(&other, name, content, message);
    git(&other, &["push", "origin", "main"]);
    tip
}

#[tokio::test]
async fn sync_without_upstream_changes_is_noop() {
    let h = Harness::new();
    let exported = exported_branch(&h).await;

    let record = SyncWorkflow::begin(h.ctx(), "feature-x", false)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(record, exported);
    // No re-export happened.
    assert_eq!(h.review.upload_calls().len(), 0);
}

#[tokio::test]
async fn sync_merges_upstream_and_reexports() {
    let h = Harness::new();
    exported_branch(&h).await;
    let tip = advance_remote(&h, "notes.txt", "notes\n", "Add notes");

    let record = SyncWorkflow::begin(h.ctx(), "feature-x", false)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    let head = h.pair.head("HEAD");
    assert_eq!(record.remote.last_synced.as_deref(), Some(tip.as_str()));
    assert_eq!(record.review.last_commit.as_deref(), Some(head.as_str()));
    assert_eq!(record.sync_halted, None);

    let subject = git(&h.pair.work, &["log", "-s", "-1", "--pretty=%s"]);
    assert_eq!(subject, format!("Syncing review feature-x at {tip}."));

    // The synced content was uploaded as a new patch set.
    let uploads = h.review.upload_calls();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].upload.subject, subject);
}

#[tokio::test]
async fn sync_conflict_halts_and_persists_tip() {
    let h = Harness::new();
    exported_branch(&h).await;
    // Both sides rewrote README; the squash merge cannot complete.
    let tip = advance_remote(&h, "README", "upstream\n", "Upstream readme");

    SyncWorkflow::begin(h.ctx(), "feature-x", false)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    let stored = RecordStore::new(&h.git)
        .require("feature-x")
        .await
        .unwrap();
    assert_eq!(stored.sync_halted, Some(true));
    assert_eq!(stored.remote.last_synced.as_deref(), Some(tip.as_str()));
    assert_eq!(h.review.upload_calls().len(), 0);
}

#[tokio::test]
async fn sync_refuses_to_restart_while_halted() {
    let h = Harness::new();
    exported_branch(&h).await;
    advance_remote(&h, "README", "upstream\n", "Upstream readme");

    SyncWorkflow::begin(h.ctx(), "feature-x", false)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();
    // Abandon the conflicted merge so the tree is clean again.
    git(&h.pair.work, &["reset", "--hard", "HEAD"]);

    let record = SyncWorkflow::begin(h.ctx(), "feature-x", false)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    // Still halted; nothing was merged or exported.
    assert_eq!(record.sync_halted, Some(true));
    assert_eq!(h.review.upload_calls().len(), 0);
}

#[tokio::test]
async fn sync_continue_finishes_halted_sync() {
    let h = Harness::new();
    exported_branch(&h).await;
    let tip = advance_remote(&h, "README", "upstream\n", "Upstream readme");

    SyncWorkflow::begin(h.ctx(), "feature-x", false)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    // Resolve the conflict with a single commit.
    std::fs::write(h.pair.work.join("README"), "merged\n").unwrap();
    git(&h.pair.work, &["add", "README"]);
    git(&h.pair.work, &["commit", "-m", "Resolve upstream conflict"]);

    let record = SyncWorkflow::begin(h.ctx(), "feature-x", true)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    let head = h.pair.head("HEAD");
    assert_eq!(record.sync_halted, None);
    assert_eq!(record.remote.last_synced.as_deref(), Some(tip.as_str()));
    assert_eq!(record.review.last_commit.as_deref(), Some(head.as_str()));
    assert_eq!(h.review.upload_calls().len(), 1);

    let stored = RecordStore::new(&h.git)
        .require("feature-x")
        .await
        .unwrap();
    assert_eq!(stored.sync_halted, None);
}

#[tokio::test]
async fn sync_continue_requires_resolution_commit() {
    let h = Harness::new();
    exported_branch(&h).await;
    advance_remote(&h, "README", "upstream\n", "Upstream readme");

    SyncWorkflow::begin(h.ctx(), "feature-x", false)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();
    git(&h.pair.work, &["reset", "--hard", "HEAD"]);

    // No resolution commit yet; the continuation declines to export.
    let record = SyncWorkflow::begin(h.ctx(), "feature-x", true)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(record.sync_halted, Some(true));
    assert_eq!(h.review.upload_calls().len(), 0);
}

#[tokio::test]
async fn sync_continue_refuses_multiple_resolution_commits() {
    let h = Harness::new();
    exported_branch(&h).await;
    advance_remote(&h, "README", "upstream\n", "Upstream readme");

    SyncWorkflow::begin(h.ctx(), "feature-x", false)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    // Two commits after the halt; the user must collapse them first.
    std::fs::write(h.pair.work.join("README"), "merged\n").unwrap();
    git(&h.pair.work, &["add", "README"]);
    git(&h.pair.work, &["commit", "-m", "Resolve upstream conflict"]);
    h.pair
        .commit_file(&h.pair.work, "extra.txt", "extra\n", "Second thoughts");

    let record = SyncWorkflow::begin(h.ctx(), "feature-x", true)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(record.sync_halted, Some(true));
    assert_eq!(h.review.upload_calls().len(), 0);
    let stored = RecordStore::new(&h.git)
        .require("feature-x")
        .await
        .unwrap();
    assert_eq!(stored.sync_halted, Some(true));
}

#[tokio::test]
async fn sync_continue_without_halt_is_noop() {
    let h = Harness::new();
    let exported = exported_branch(&h).await;

    let record = SyncWorkflow::begin(h.ctx(), "feature-x", true)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(record, exported);
}

#[tokio::test]
async fn sync_requires_exported_changes() {
    let h = Harness::new();
    exported_branch(&h).await;
    h.pair
        .commit_file(&h.pair.work, "extra.txt", "extra\n", "Unexported work");
    advance_remote(&h, "notes.txt", "notes\n", "Add notes");

    let record = SyncWorkflow::begin(h.ctx(), "feature-x", false)
        .await
        .unwrap()
        .run()
        .await
        .unwrap();

    // The unexported commit blocked the sync before any fetch or merge.
    assert_ne!(
        record.review.last_commit.as_deref(),
        Some(h.pair.head("HEAD").as_str())
    );
    assert_eq!(h.review.upload_calls().len(), 0);
}

#[tokio::test]
async fn sync_requires_record() {
    let h = Harness::new();
    git(&h.pair.work, &["checkout", "-b", "feature-x"]);

    let err = SyncWorkflow::begin(h.ctx(), "feature-x", false)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NoRecord(branch) if branch == "feature-x"));
}

#[tokio::test]
async fn sync_rejects_dirty_tree() {
    let h = Harness::new();
    exported_branch(&h).await;
    std::fs::write(h.pair.work.join("README"), "dirty\n").unwrap();

    let err = SyncWorkflow::begin(h.ctx(), "feature-x", false)
        .await
        .unwrap()
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DirtyTree { .. }));
}
