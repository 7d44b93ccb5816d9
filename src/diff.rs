//! Change detection between the three tree roots: the working tree, the
//! staging tree, and the HEAD image.

use std::fmt::{self, Display};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::refs::{self, RefTable};
use crate::tree::{self, TreeDiff};
use crate::{Repository, WIT_DIR};

/// diff(staging, HEAD image): `left_only` is staged new files,
/// `modified` is staged edits. Before the first commit everything in
/// staging counts as new.
pub fn changes_to_be_committed(repo: &Repository) -> Result<TreeDiff> {
    let staging = repo.staging_dir();
    match RefTable::load_opt(repo)? {
        Some(table) => tree::compare(&staging, &repo.image_dir(&table.head), &[]),
        // No HEAD yet; compare against the empty tree.
        None => tree::compare(&staging, Path::new(""), &[]),
    }
}

/// diff(working tree, staging): `modified` is unstaged edits,
/// `right_only` is files deleted from the working tree, `left_only` is
/// untracked files.
pub fn worktree_changes(repo: &Repository) -> Result<TreeDiff> {
    tree::compare(repo.work_root(), &repo.staging_dir(), &[WIT_DIR])
}

/// True when either report that guards checkout is non-empty. Untracked
/// files do not count.
pub fn has_uncommitted_work(repo: &Repository) -> Result<bool> {
    let staged = changes_to_be_committed(repo)?;
    if !staged.left_only.is_empty() || !staged.modified.is_empty() {
        return Ok(true);
    }
    let worktree = worktree_changes(repo)?;
    Ok(!worktree.modified.is_empty() || !worktree.right_only.is_empty())
}

/// Everything the `status` command shows, assembled once and rendered
/// by the `Display` impl.
#[derive(Debug)]
pub struct Status {
    pub active_branch: Option<String>,
    pub head: Option<String>,
    pub new_files: Vec<PathBuf>,
    pub staged_modified: Vec<PathBuf>,
    pub unstaged_modified: Vec<PathBuf>,
    pub deleted: Vec<PathBuf>,
    pub untracked: Vec<PathBuf>,
}

impl Status {
    pub fn is_clean(&self) -> bool {
        self.new_files.is_empty()
            && self.staged_modified.is_empty()
            && self.unstaged_modified.is_empty()
            && self.deleted.is_empty()
            && self.untracked.is_empty()
    }
}

pub fn status(repo: &Repository) -> Result<Status> {
    let staged = changes_to_be_committed(repo)?;
    let worktree = worktree_changes(repo)?;
    let head = RefTable::load_opt(repo)?.map(|table| table.head.to_string());
    Ok(Status {
        active_branch: refs::active_branch(repo)?,
        head,
        new_files: staged.left_only,
        staged_modified: staged.modified,
        unstaged_modified: worktree.modified,
        deleted: worktree.right_only,
        untracked: worktree.left_only,
    })
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.active_branch, &self.head) {
            (Some(branch), _) => writeln!(f, "On branch {branch}")?,
            (None, Some(head)) => writeln!(f, "HEAD detached at {head}")?,
            (None, None) => writeln!(f, "Not currently on any branch")?,
        }

        if self.is_clean() {
            writeln!(f, "nothing to commit, working tree clean")?;
            return Ok(());
        }

        if !self.new_files.is_empty() || !self.staged_modified.is_empty() {
            writeln!(f, "\nChanges to be committed:")?;
            for path in &self.new_files {
                writeln!(f, "  new file:   {}", path.display())?;
            }
            for path in &self.staged_modified {
                writeln!(f, "  modified:   {}", path.display())?;
            }
        }
        if !self.unstaged_modified.is_empty() || !self.deleted.is_empty() {
            writeln!(f, "\nChanges not staged for commit:")?;
            for path in &self.unstaged_modified {
                writeln!(f, "  modified:   {}", path.display())?;
            }
            for path in &self.deleted {
                writeln!(f, "  deleted:    {}", path.display())?;
            }
        }
        if !self.untracked.is_empty() {
            writeln!(f, "\nUntracked files:")?;
            for path in &self.untracked {
                writeln!(f, "  {}", path.display())?;
            }
        }
        Ok(())
    }
}
