//! The staging manager. Staging is a literal mirror directory of the
//! intended next commit, so `add` and `rm` are plain tree edits and the
//! commit engine is a cheap recursive copy.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{IoResultExt, Result, WitError};
use crate::{tree, Repository, WIT_DIR};

/// Copies each path into the staging tree at its position relative to
/// the repository root. A missing path aborts before any later path is
/// processed. Each path locates its own repository, so a single
/// invocation may span several repositories.
pub fn add(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        if !path.exists() {
            return Err(WitError::PathNotFound(path.clone()));
        }
        let repo = Repository::locate(path)?;
        let rel = repo.relative_to_root(path)?;
        if path.is_dir() {
            add_directory(&repo, path, &rel)?;
        } else {
            add_file(&repo, path, &rel)?;
        }
        debug!(path = %rel.display(), "staged");
    }
    Ok(())
}

/// Deletes each path from the staging tree. A path absent from staging
/// aborts before any later path is processed.
pub fn remove(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        let repo = Repository::locate(path)?;
        let rel = repo.relative_to_root(path)?;
        let target = repo.staging_dir().join(&rel);
        if target.is_dir() {
            fs::remove_dir_all(&target).path_context(&target)?;
        } else if target.is_file() {
            fs::remove_file(&target).path_context(&target)?;
        } else {
            return Err(WitError::StagingEntryMissing(path.clone()));
        }
        debug!(path = %rel.display(), "unstaged");
    }
    Ok(())
}

fn add_file(repo: &Repository, src: &Path, rel: &Path) -> Result<()> {
    let dest = repo.staging_dir().join(rel);
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).path_context(parent)?;
    }
    fs::copy(src, &dest).path_context(&dest)?;
    Ok(())
}

fn add_directory(repo: &Repository, src: &Path, rel: &Path) -> Result<()> {
    if !rel.as_os_str().is_empty() {
        return tree::overlay_copy(src, &repo.staging_dir().join(rel));
    }
    // Adding the work root itself: stage everything except `.wit`.
    for entry in fs::read_dir(src).path_context(src)? {
        let entry = entry.path_context(src)?;
        if entry.file_name() == WIT_DIR {
            continue;
        }
        let entry_path = entry.path();
        let dest = repo.staging_dir().join(entry.file_name());
        if entry.file_type().path_context(&entry_path)?.is_dir() {
            tree::overlay_copy(&entry_path, &dest)?;
        } else {
            fs::copy(&entry_path, &dest).path_context(&dest)?;
        }
    }
    Ok(())
}
