//! Real-git repository fixtures
//!
//! Workflows are exercised against throwaway repositories in temp
//! directories: a bare "remote", a working clone under review, and an
//! optional second clone for advancing the remote behind the first one's
//! back.

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Run git in `dir`, panicking on failure; returns trimmed stdout
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to spawn git");
    assert!(
        output.status.success(),
        "git {:?} failed:\n{}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout)
        .trim_end_matches('\n')
        .to_string()
}

/// Run git in `dir` without asserting success; returns the exit status
pub fn git_status(dir: &Path, args: &[&str]) -> i32 {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to spawn git")
        .status
        .code()
        .unwrap_or(-1)
}

/// One working clone wired to a shared bare remote
pub struct RemotePair {
    root: TempDir,
    /// Path of the working clone
    pub work: PathBuf,
    /// Path of the bare remote
    pub remote: PathBuf,
}

impl RemotePair {
    /// Bare remote plus a clone with one commit on `main`, pushed
    pub fn new() -> Self {
        let root = TempDir::new().expect("tempdir");
        let remote = root.path().join("remote.git");
        let work = root.path().join("work");

        std::fs::create_dir(&remote).expect("mkdir remote");
        git(&remote, &["init", "--bare", "-b", "main"]);

        std::fs::create_dir(&work).expect("mkdir work");
        git(&work, &["init", "-b", "main"]);
        configure_user(&work);
        std::fs::write(work.join("README"), "hello\n").expect("write README");
        git(&work, &["add", "README"]);
        git(&work, &["commit", "-m", "Initial commit"]);
        git(&work, &["remote", "add", "origin", remote.to_str().expect("utf-8 path")]);
        git(&work, &["push", "-u", "origin", "main"]);

        Self { root, work, remote }
    }

    /// A second clone of the remote, for advancing it independently
    pub fn second_clone(&self) -> PathBuf {
        let other = self.root.path().join("other");
        git(
            self.root.path(),
            &[
                "clone",
                self.remote.to_str().expect("utf-8 path"),
                other.to_str().expect("utf-8 path"),
            ],
        );
        configure_user(&other);
        other
    }

    /// Commit a file change in `dir`
    pub fn commit_file(&self, dir: &Path, name: &str, content: &str, message: &str) -> String {
        std::fs::write(dir.join(name), content).expect("write file");
        git(dir, &["add", name]);
        git(dir, &["commit", "-m", message]);
        git(dir, &["rev-parse", "HEAD"])
    }

    /// Tip of `refname` in the working clone
    pub fn head(&self, refname: &str) -> String {
        git(&self.work, &["rev-parse", refname])
    }

    /// Whether a local branch exists in the working clone
    pub fn branch_exists(&self, branch: &str) -> bool {
        let branch_ref = format!("refs/heads/{branch}");
        git_status(&self.work, &["show-ref", "--verify", "--quiet", &branch_ref]) == 0
    }
}

fn configure_user(dir: &Path) {
    git(dir, &["config", "user.email", "dev@example.com"]);
    git(dir, &["config", "user.name", "Dev Example"]);
}
