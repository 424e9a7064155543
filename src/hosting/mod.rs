//! Repository link classifier
//!
//! Maps a remote URL to the hosting provider it lives on, so that a landed
//! change can be announced with a browsable commit link. Matching is a
//! fixed list of providers tried in order; an unrecognized URL is simply
//! `None` and callers skip link generation.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static GITHUB_SIMPLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^(http|https|git)://(www\\.)?github\\.com/(?P<organization>[^/]+)/(?P<rest>[^/]+)/?$")
        .expect("valid regex")
});

static GITHUB_SSH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^git@github\\.com:(?P<organization>[^/]+)/(?P<rest>[^/]+)/?$")
        .expect("valid regex")
});

static GOOGLE_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^(http|https)://code\\.google\\.com/p/(?P<rest>[^/]+)/?$").expect("valid regex")
});

static GOOGLE_CODE_HG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^hg::(http|https)://code\\.google\\.com/p/(?P<rest>[^/]+)/?$")
        .expect("valid regex")
});

/// A recognized hosting provider for a remote URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryKind {
    /// A repository hosted on GitHub
    Github {
        /// Organization or user owning the repository
        organization: String,
        /// Repository name
        repository: String,
    },
    /// A git repository on Google Code project hosting
    GoogleCode {
        /// Project name
        project: String,
        /// Secondary repository within the project, if any
        repository: Option<String>,
    },
    /// A Mercurial repository on Google Code, accessed via git-remote-hg
    GoogleCodeHg {
        /// Project name
        project: String,
        /// Secondary repository within the project, if any
        repository: Option<String>,
        /// Path of the git-to-hg commit mapping maintained by the bridge
        mapfile: PathBuf,
    },
}

impl RepositoryKind {
    /// Browsable link to a commit on this provider
    ///
    /// For the Mercurial bridge the git hash is first translated through the
    /// bridge's mapfile, since the hosted history only knows hg hashes.
    pub fn commit_link(&self, commit_hash: &str) -> Result<String> {
        match self {
            Self::Github {
                organization,
                repository,
            } => Ok(format!(
                "https://github.com/{organization}/{repository}/commit/{commit_hash}"
            )),
            Self::GoogleCode {
                project,
                repository,
            } => Ok(google_code_link(project, repository.as_deref(), commit_hash)),
            Self::GoogleCodeHg {
                project,
                repository,
                mapfile,
            } => {
                let hg_hash = lookup_hg_commit(mapfile, commit_hash)?;
                Ok(google_code_link(project, repository.as_deref(), &hg_hash))
            }
        }
    }
}

fn google_code_link(project: &str, repository: Option<&str>, commit_hash: &str) -> String {
    let mut query = format!("r={}", urlencoding::encode(commit_hash));
    if let Some(repository) = repository {
        query.push_str("&repo=");
        query.push_str(&urlencoding::encode(repository));
    }
    format!("https://code.google.com/p/{project}/source/detail?{query}")
}

/// Translate a git hash to its hg counterpart via the bridge's mapfile
fn lookup_hg_commit(mapfile: &Path, commit_hash: &str) -> Result<String> {
    let content = std::fs::read_to_string(mapfile)?;
    let mapping: HashMap<&str, &str> = content
        .lines()
        .filter_map(|row| row.split_once(' '))
        .collect();
    mapping
        .get(commit_hash)
        .map(|hg| (*hg).to_string())
        .ok_or_else(|| Error::NoCommitMapping(commit_hash.to_string()))
}

/// Strip a trailing `.git` from a path segment captured out of a URL
fn trim_git_suffix(segment: &str) -> &str {
    segment.strip_suffix(".git").unwrap_or(segment)
}

/// Split a Google Code project segment into project and optional repository
///
/// One dot means `project.repository`; more than one is a malformed URI.
fn split_project(segment: &str) -> Result<(String, Option<String>)> {
    let mut parts = segment.split('.');
    let project = parts.next().unwrap_or_default().to_string();
    match (parts.next(), parts.next()) {
        (None, _) => Ok((project, None)),
        (Some(repository), None) => Ok((project, Some(repository.to_string()))),
        (Some(_), Some(_)) => Err(Error::HostingUrl(format!(
            "project names in URIs can contain at most one '.'; {segment:?} is invalid"
        ))),
    }
}

/// Where git-remote-hg keeps the commit mapping for a bridged remote
fn hg_mapfile_path(git_root: &Path, remote_url: &str) -> Result<PathBuf> {
    let actual_uri = remote_url
        .strip_prefix("hg::")
        .ok_or_else(|| Error::HostingUrl(format!("remote {remote_url:?} is not an hg remote")))?;
    let encoded = urlencoding::encode(actual_uri).into_owned();
    Ok(git_root
        .join(".git")
        .join("hgremotes")
        .join(encoded)
        .join(".hg")
        .join("git-mapfile"))
}

/// Classify a remote URL against the known hosting providers
pub fn classify(remote_url: &str, git_root: &Path) -> Result<Option<RepositoryKind>> {
    for regex in [&*GITHUB_SIMPLE, &*GITHUB_SSH] {
        if let Some(captures) = regex.captures(remote_url) {
            return Ok(Some(RepositoryKind::Github {
                organization: captures["organization"].to_string(),
                repository: trim_git_suffix(&captures["rest"]).to_string(),
            }));
        }
    }

    if let Some(captures) = GOOGLE_CODE_HG.captures(remote_url) {
        let (project, repository) = split_project(&captures["rest"])?;
        return Ok(Some(RepositoryKind::GoogleCodeHg {
            project,
            repository,
            mapfile: hg_mapfile_path(git_root, remote_url)?,
        }));
    }

    if let Some(captures) = GOOGLE_CODE.captures(remote_url) {
        let (project, repository) = split_project(trim_git_suffix(&captures["rest"]))?;
        return Ok(Some(RepositoryKind::GoogleCode {
            project,
            repository,
        }));
    }

    Ok(None)
}
