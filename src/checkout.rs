//! The checkout materializer: overlays a committed image back onto the
//! working tree and the staging tree.

use tracing::info;

use crate::commit::CommitId;
use crate::error::{Result, WitError};
use crate::refs::{self, RefTable, RefUpdate};
use crate::{diff, tree, Repository};

/// Moves HEAD to `target`, a branch name or a raw commit id, and
/// materializes that image.
///
/// The working-tree overlay never deletes: files the target image does
/// not know about survive even when the dirty-tree guard has already
/// passed. Staging is reset to equal the image, so the next commit
/// starts from the checked-out snapshot.
pub fn checkout(repo: &Repository, target: &str) -> Result<CommitId> {
    let table = RefTable::load_opt(repo)?;
    let branch_tip = table.as_ref().and_then(|t| t.tip(target).cloned());
    let id = match &branch_tip {
        Some(tip) => tip.clone(),
        None => CommitId::parse(target)?,
    };
    let image = repo.image_dir(&id);
    if !image.is_dir() {
        return Err(WitError::CommitNotFound(target.to_string()));
    }

    // Checkout by branch name activates the branch; by raw id detaches.
    match branch_tip {
        Some(_) => refs::set_active(repo, target)?,
        None => refs::set_active(repo, "")?,
    }

    if diff::has_uncommitted_work(repo)? {
        return Err(WitError::UncommittedWork);
    }

    tree::overlay_copy(&image, repo.work_root())?;
    tree::replace_tree(&image, &repo.staging_dir())?;
    refs::update(repo, &id, RefUpdate::Checkout)?;

    info!(%id, target, "checked out");
    Ok(id)
}

#[cfg(test)]
mod test {
    use std::fs;

    use assert_fs::TempDir;

    use super::*;
    use crate::staging;
    use crate::test_support::{commit_file, init_repo, write_file};

    #[test]
    fn test_checkout_by_id_restores_content_and_detaches() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(&dir);
        let first = commit_file(&repo, "a.txt", "hello", "first");
        let second = commit_file(&repo, "a.txt", "hello2", "second");

        checkout(&repo, first.as_str()).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("a.txt")).unwrap(),
            "hello"
        );
        let table = RefTable::load(&repo).unwrap();
        assert_eq!(table.head, first);
        // master keeps pointing at its own tip.
        assert_eq!(table.master, second);
        assert_eq!(refs::active_branch(&repo).unwrap(), None);
    }

    #[test]
    fn test_checkout_by_branch_name_activates_it() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(&dir);
        let first = commit_file(&repo, "a.txt", "hello", "first");
        refs::create_branch(&repo, "feature").unwrap();

        checkout(&repo, "feature").unwrap();

        assert_eq!(
            refs::active_branch(&repo).unwrap(),
            Some("feature".to_string())
        );
        assert_eq!(RefTable::load(&repo).unwrap().head, first);
    }

    #[test]
    fn test_checkout_unknown_target() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(&dir);
        commit_file(&repo, "a.txt", "hello", "first");

        let ghost = CommitId::generate();
        let err = checkout(&repo, ghost.as_str()).unwrap_err();
        assert!(matches!(err, WitError::CommitNotFound(_)));
    }

    #[test]
    fn test_checkout_refuses_dirty_staging() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(&dir);
        let first = commit_file(&repo, "a.txt", "hello", "first");
        commit_file(&repo, "a.txt", "hello2", "second");

        write_file(dir.path(), "a.txt", "staged but not committed");
        staging::add(&[dir.path().join("a.txt")]).unwrap();

        let err = checkout(&repo, first.as_str()).unwrap_err();
        assert!(matches!(err, WitError::UncommittedWork));
    }

    #[test]
    fn test_checkout_refuses_unstaged_edits() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(&dir);
        let first = commit_file(&repo, "a.txt", "hello", "first");
        commit_file(&repo, "a.txt", "hello2", "second");

        write_file(dir.path(), "a.txt", "edited in place");

        let err = checkout(&repo, first.as_str()).unwrap_err();
        assert!(matches!(err, WitError::UncommittedWork));
    }

    #[test]
    fn test_untracked_files_survive_checkout() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(&dir);
        let first = commit_file(&repo, "a.txt", "hello", "first");
        commit_file(&repo, "a.txt", "hello2", "second");
        write_file(dir.path(), "notes.txt", "scratch");

        checkout(&repo, first.as_str()).unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("notes.txt")).unwrap(),
            "scratch"
        );
    }

    #[test]
    fn test_checkout_resets_staging_to_the_image() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(&dir);
        let first = commit_file(&repo, "a.txt", "hello", "first");
        commit_file(&repo, "b.txt", "other", "second");

        checkout(&repo, first.as_str()).unwrap();

        assert_eq!(
            fs::read_to_string(repo.staging_dir().join("a.txt")).unwrap(),
            "hello"
        );
        // The second commit's file is gone from staging but survives in
        // the working tree.
        assert!(!repo.staging_dir().join("b.txt").exists());
        assert!(dir.path().join("b.txt").is_file());
    }
}
