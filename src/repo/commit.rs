//! Latest-commit lookup and commit diffs.
//!
//! Both operations run `git -C <path> ...` as a child process and read its
//! standard output as UTF-8. A non-zero exit status is an error.

use crate::models::{DiffText, RevisionId};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors from invoking git.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to spawn git: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("git {args} exited with {status}: {stderr}")]
    Failed {
        args: String,
        status: String,
        stderr: String,
    },

    #[error("git {args} produced non-UTF-8 output")]
    InvalidUtf8 { args: String },
}

/// Resolve `HEAD` of the repository at `repo_path` to its full identifier.
pub async fn head_revision(repo_path: &str) -> Result<RevisionId, GitError> {
    let stdout = run_git(repo_path, &["rev-parse", "HEAD"]).await?;
    let rev = RevisionId::new(stdout);
    debug!("HEAD of '{}' is {}", repo_path, rev);
    Ok(rev)
}

/// Diff between `rev`'s first parent and `rev`.
///
/// Fails for a root commit, since `<rev>~1` does not resolve.
pub async fn commit_diff(repo_path: &str, rev: &RevisionId) -> Result<DiffText, GitError> {
    let parent = rev.parent_spec();
    let stdout = run_git(repo_path, &["diff", &parent, rev.as_str()]).await?;
    debug!("Diff for {} is {} bytes", rev, stdout.len());
    Ok(DiffText::new(stdout))
}

async fn run_git(repo_path: &str, args: &[&str]) -> Result<String, GitError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_path)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await?;

    let joined = args.join(" ");

    if !output.status.success() {
        return Err(GitError::Failed {
            args: joined,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    String::from_utf8(output.stdout).map_err(|_| GitError::InvalidUtf8 { args: joined })
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;
    use std::process::Command;
    use tempfile::TempDir;

    /// Run git synchronously in `dir`, panicking on failure.
    pub fn git(dir: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args([
                "-c",
                "user.name=Test",
                "-c",
                "user.email=test@example.com",
                "-c",
                "commit.gpgsign=false",
                "-c",
                "init.defaultBranch=main",
            ])
            .arg("-C")
            .arg(dir)
            .args(args)
            .output()
            .expect("failed to run git");
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8(output.stdout).unwrap()
    }

    /// A directory git refuses to treat as, or search upward for, a repository.
    ///
    /// The `.git` file points at a missing gitdir, so git stops here even when
    /// the temp root lives inside another checkout.
    pub fn non_repository_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(".git"),
            format!("gitdir: {}\n", dir.path().join("missing").display()),
        )
        .unwrap();
        dir
    }

    /// Initialize a repository and commit each `(file, content)` pair as its own commit.
    pub fn repo_with_commits(dir: &Path, commits: &[(&str, &str)]) {
        git(dir, &["init"]);
        for (i, (file, content)) in commits.iter().enumerate() {
            std::fs::write(dir.join(file), content).unwrap();
            git(dir, &["add", file]);
            git(dir, &["commit", "-m", &format!("commit {}", i + 1)]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{git, non_repository_dir, repo_with_commits};
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_head_revision_matches_git() {
        let dir = TempDir::new().unwrap();
        repo_with_commits(dir.path(), &[("a.py", "x = 1\n"), ("a.py", "x = 2\n")]);

        let path = dir.path().to_str().unwrap();
        let rev = head_revision(path).await.unwrap();
        let expected = git(dir.path(), &["rev-parse", "HEAD"]);

        assert!(!rev.as_str().is_empty());
        assert_eq!(rev.as_str(), expected.trim());
    }

    #[tokio::test]
    async fn test_head_revision_not_a_repo() {
        let dir = non_repository_dir();
        let result = head_revision(dir.path().to_str().unwrap()).await;
        assert!(matches!(result, Err(GitError::Failed { .. })));
    }

    #[tokio::test]
    async fn test_head_revision_missing_path() {
        let result = head_revision("/definitely/not/a/real/path").await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_commit_diff_matches_git() {
        let dir = TempDir::new().unwrap();
        repo_with_commits(
            dir.path(),
            &[
                ("math.py", "def add(a, b):\n    return a + b\n"),
                (
                    "math.py",
                    "def add(a, b):\n    return a + b\n\ndef subtract(a, b):\n    return a - b\n",
                ),
            ],
        );

        let path = dir.path().to_str().unwrap();
        let rev = head_revision(path).await.unwrap();
        let diff = commit_diff(path, &rev).await.unwrap();

        let expected = git(dir.path(), &["diff", &rev.parent_spec(), rev.as_str()]);
        assert_eq!(diff.as_str(), expected);
        assert!(diff.as_str().contains("+def subtract(a, b):"));
    }

    #[tokio::test]
    async fn test_commit_diff_root_commit_fails() {
        let dir = TempDir::new().unwrap();
        repo_with_commits(dir.path(), &[("only.txt", "hello\n")]);

        let path = dir.path().to_str().unwrap();
        let rev = head_revision(path).await.unwrap();
        let result = commit_diff(path, &rev).await;

        assert!(matches!(result, Err(GitError::Failed { .. })));
    }
}
