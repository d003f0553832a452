use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::{Duration, timeout};
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const FIELD_SEP: char = '\x1f';
const RECORD_SEP: char = '\x1e';

/// One commit from `git log`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub hash: String,
    pub short_hash: String,
    /// Subject line
    pub message: String,
    pub author: String,
    pub author_email: String,
    pub date: DateTime<Utc>,
}

/// A file touched in the working tree or index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    /// added, modified, deleted, renamed, copied or changed
    pub change_type: &'static str,
}

/// Summary of `git status`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GitStatus {
    pub branch: String,
    pub is_dirty: bool,
    pub staged_files: Vec<String>,
    pub modified_files: Vec<String>,
    pub untracked_files: Vec<String>,
}

/// Read-only wrapper over the `git` binary
#[derive(Debug, Clone)]
pub struct GitTool {
    repo_path: PathBuf,
    timeout: Duration,
}

impl GitTool {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        debug!(repo = %self.repo_path.display(), ?args, "running git");

        let mut cmd = Command::new("git");
        cmd.args(args)
            .current_dir(&self.repo_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let output = timeout(self.timeout, cmd.output())
            .await
            .with_context(|| format!("git timed out after {} seconds", self.timeout.as_secs()))?
            .context("failed to execute git")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "git {} failed (exit code {}): {}",
                args.join(" "),
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Whether `repo_path` is inside a git work tree
    pub async fn is_repo(&self) -> bool {
        self.git(&["rev-parse", "--is-inside-work-tree"])
            .await
            .map(|out| out.trim() == "true")
            .unwrap_or(false)
    }

    pub async fn recent_commits(&self, limit: usize) -> Result<Vec<CommitInfo>> {
        let format = format!("--format=%H{0}%an{0}%ae{0}%aI{0}%s{1}", FIELD_SEP, RECORD_SEP);
        let count = format!("--max-count={}", limit);
        let out = self.git(&["log", &count, &format]).await?;
        Ok(parse_log(&out))
    }

    /// Diff of the working tree against `target` (HEAD when `None`)
    pub async fn diff(&self, target: Option<&str>) -> Result<String> {
        self.git(&["diff", target.unwrap_or("HEAD")]).await
    }

    pub async fn staged_diff(&self) -> Result<String> {
        self.git(&["diff", "--cached"]).await
    }

    pub async fn status(&self) -> Result<GitStatus> {
        let out = self.git(&["status", "--porcelain=v1", "--branch"]).await?;
        Ok(parse_status(&out))
    }

    pub async fn changed_files(&self, staged_only: bool) -> Result<Vec<FileChange>> {
        let out = if staged_only {
            self.git(&["diff", "--cached", "--name-status"]).await?
        } else {
            self.git(&["diff", "--name-status"]).await?
        };
        Ok(parse_name_status(&out))
    }
}

fn parse_log(out: &str) -> Vec<CommitInfo> {
    out.split(RECORD_SEP)
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .filter_map(|record| {
            let fields: Vec<&str> = record.split(FIELD_SEP).collect();
            let [hash, author, email, date, subject] = fields.as_slice() else {
                return None;
            };
            let date = DateTime::parse_from_rfc3339(date).ok()?.with_timezone(&Utc);
            Some(CommitInfo {
                hash: hash.to_string(),
                short_hash: hash.chars().take(7).collect(),
                message: subject.to_string(),
                author: author.to_string(),
                author_email: email.to_string(),
                date,
            })
        })
        .collect()
}

fn change_type(code: char) -> &'static str {
    match code {
        'A' => "added",
        'D' => "deleted",
        'R' => "renamed",
        'C' => "copied",
        'M' => "modified",
        _ => "changed",
    }
}

fn parse_name_status(out: &str) -> Vec<FileChange> {
    out.lines()
        .filter_map(|line| {
            let mut parts = line.split('\t');
            let code = parts.next()?.chars().next()?;
            // Renames and copies list old then new path.
            let path = parts.last()?;
            Some(FileChange {
                path: path.to_string(),
                change_type: change_type(code),
            })
        })
        .collect()
}

fn parse_status(out: &str) -> GitStatus {
    let mut status = GitStatus::default();

    for line in out.lines() {
        if let Some(branch) = line.strip_prefix("## ") {
            status.branch = branch
                .split("...")
                .next()
                .unwrap_or(branch)
                .trim_start_matches("No commits yet on ")
                .to_string();
            continue;
        }
        if line.len() < 4 {
            continue;
        }

        let mut codes = line.chars();
        let index = codes.next().unwrap_or(' ');
        let worktree = codes.next().unwrap_or(' ');
        let path = line[3..].rsplit(" -> ").next().unwrap_or(&line[3..]).to_string();

        if index == '?' {
            status.untracked_files.push(path);
            continue;
        }
        if index != ' ' {
            status.staged_files.push(path.clone());
        }
        if worktree != ' ' {
            status.modified_files.push(path);
        }
    }

    status.is_dirty = !status.staged_files.is_empty() || !status.modified_files.is_empty();
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_log_records() {
        let out = format!(
            "abcdef1234567{0}Ada{0}ada@example.com{0}2024-05-01T10:00:00+02:00{0}Add parser{1}\n\
             1234567abcdef{0}Bob{0}bob@example.com{0}2024-04-30T09:00:00Z{0}Fix bug{1}\n",
            FIELD_SEP, RECORD_SEP
        );
        let commits = parse_log(&out);

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].short_hash, "abcdef1");
        assert_eq!(commits[0].message, "Add parser");
        assert_eq!(commits[0].date.to_rfc3339(), "2024-05-01T08:00:00+00:00");
        assert_eq!(commits[1].author, "Bob");
    }

    #[test]
    fn parses_name_status() {
        let changes = parse_name_status("M\tsrc/lib.rs\nA\tnew.rs\nR100\told.rs\trenamed.rs\n");
        assert_eq!(
            changes,
            vec![
                FileChange {
                    path: "src/lib.rs".into(),
                    change_type: "modified"
                },
                FileChange {
                    path: "new.rs".into(),
                    change_type: "added"
                },
                FileChange {
                    path: "renamed.rs".into(),
                    change_type: "renamed"
                },
            ]
        );
    }

    #[test]
    fn parses_porcelain_status() {
        let status = parse_status("## main...origin/main [ahead 1]\nM  staged.rs\n M edited.rs\n?? new.txt\n");
        assert_eq!(status.branch, "main");
        assert_eq!(status.staged_files, vec!["staged.rs"]);
        assert_eq!(status.modified_files, vec!["edited.rs"]);
        assert_eq!(status.untracked_files, vec!["new.txt"]);
        assert!(status.is_dirty);
    }

    #[test]
    fn clean_status_is_not_dirty() {
        let status = parse_status("## No commits yet on main\n");
        assert_eq!(status.branch, "main");
        assert!(!status.is_dirty);
    }

    #[tokio::test]
    async fn plain_directory_is_not_a_repo() {
        let dir = TempDir::new().unwrap();
        let tool = GitTool::new(dir.path());
        // The temp dir may sit inside a checkout.
        if tool.is_repo().await {
            return;
        }
        assert!(tool.status().await.is_err());
    }
}
