//! Repository resolution - local paths and remote clones
//!
//! A repo argument is either a local directory or a git URL. Remote repos
//! are shallow-cloned into a temporary directory that lives exactly as long
//! as the run; the clone directory is removed when the source is dropped.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("repository path does not exist: {0}")]
    NotFound(PathBuf),
    #[error("repository path is not a directory: {0}")]
    NotADirectory(PathBuf),
    #[error("failed to resolve repository path")]
    Resolve(#[source] std::io::Error),
    #[error("failed to create clone directory")]
    TempDir(#[source] std::io::Error),
    #[error("failed to run git clone")]
    CloneSpawn(#[source] std::io::Error),
    #[error("git clone failed: {0}")]
    CloneFailed(String),
}

/// A resolved repository, keeping any backing temp directory alive
#[derive(Debug)]
pub enum RepoSource {
    /// Existing local directory
    Local(PathBuf),
    /// Shallow clone of a remote; removed on drop
    Cloned { path: PathBuf, _temp: TempDir },
}

impl RepoSource {
    pub fn path(&self) -> &Path {
        match self {
            RepoSource::Local(path) => path,
            RepoSource::Cloned { path, .. } => path,
        }
    }
}

/// Whether the argument names a remote repository rather than a local path
pub fn is_remote(spec: &str) -> bool {
    spec.starts_with("http://") || spec.starts_with("https://") || spec.starts_with("git@")
}

/// Resolve a repository argument into a usable local directory
pub async fn resolve_repo(spec: &str) -> Result<RepoSource, RepoError> {
    debug!(%spec, "resolve_repo");
    if is_remote(spec) {
        clone_remote(spec).await
    } else {
        let path = PathBuf::from(spec);
        if !path.exists() {
            return Err(RepoError::NotFound(path));
        }
        if !path.is_dir() {
            return Err(RepoError::NotADirectory(path));
        }
        let path = path.canonicalize().map_err(RepoError::Resolve)?;
        Ok(RepoSource::Local(path))
    }
}

async fn clone_remote(url: &str) -> Result<RepoSource, RepoError> {
    let temp = TempDir::new().map_err(RepoError::TempDir)?;
    let target = temp.path().join("repo");
    info!(%url, target = %target.display(), "cloning repository");

    let output = tokio::process::Command::new("git")
        .arg("clone")
        .arg("--depth")
        .arg("1")
        .arg(url)
        .arg(&target)
        .output()
        .await
        .map_err(RepoError::CloneSpawn)?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(RepoError::CloneFailed(stderr.trim().to_string()));
    }

    Ok(RepoSource::Cloned {
        path: target,
        _temp: temp,
    })
}
