//! Recursive tree operations shared by staging, commit, checkout and the
//! diff report: overlay copies that never delete, and a two-sided
//! directory comparison.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf};

use fs_extra::dir;
use itertools::{
    EitherOrBoth::{Both, Left, Right},
    Itertools,
};

use crate::error::{IoResultExt, Result};

/// Turns `path` into an absolute path rooted at the current directory and
/// consumes `.`/`..` components. No symlink resolution, so the path does
/// not have to exist yet.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().path_context(path)?.join(path)
    };
    let mut result = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                result.pop();
            }
            _ => result.push(component),
        }
    }
    Ok(result)
}

/// Copies `src` onto `dest`: missing directories are created, existing
/// files are overwritten, and files present only in `dest` survive.
pub fn overlay_copy(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).path_context(dest)?;
    let options = dir::CopyOptions::new().overwrite(true).content_only(true);
    dir::copy(src, dest, &options)?;
    Ok(())
}

/// Makes `dest` an exact copy of `src`, removing anything that was
/// there before.
pub fn replace_tree(src: &Path, dest: &Path) -> Result<()> {
    if dest.exists() {
        fs::remove_dir_all(dest).path_context(dest)?;
    }
    overlay_copy(src, dest)
}

/// One level-by-level comparison of two tree roots. Entries present on
/// only one side are collected at the level they appear (directories
/// included, without descending); files present on both sides are
/// compared by content; directories present on both sides are descended.
#[derive(Debug, Default)]
pub struct TreeDiff {
    /// Relative paths present under the left root only.
    pub left_only: Vec<PathBuf>,
    /// Relative paths present under the right root only.
    pub right_only: Vec<PathBuf>,
    /// Relative paths of files on both sides whose contents differ.
    pub modified: Vec<PathBuf>,
}

impl TreeDiff {
    pub fn is_empty(&self) -> bool {
        self.left_only.is_empty() && self.right_only.is_empty() && self.modified.is_empty()
    }
}

/// Compares the trees rooted at `left` and `right`, skipping any top- or
/// sub-level entry whose name appears in `ignore`. A missing root is
/// treated as an empty tree.
pub fn compare(left: &Path, right: &Path, ignore: &[&str]) -> Result<TreeDiff> {
    let mut diff = TreeDiff::default();
    compare_level(left, right, ignore, Path::new(""), &mut diff)?;
    Ok(diff)
}

fn compare_level(
    left: &Path,
    right: &Path,
    ignore: &[&str],
    prefix: &Path,
    diff: &mut TreeDiff,
) -> Result<()> {
    let left_entries = sorted_entries(left, ignore)?;
    let right_entries = sorted_entries(right, ignore)?;

    for pair in left_entries
        .iter()
        .merge_join_by(right_entries.iter(), |a, b| a.name.cmp(&b.name))
    {
        match pair {
            Left(l) => diff.left_only.push(prefix.join(&l.name)),
            Right(r) => diff.right_only.push(prefix.join(&r.name)),
            Both(l, r) => {
                let rel = prefix.join(&l.name);
                match (l.is_dir, r.is_dir) {
                    (true, true) => {
                        compare_level(&l.path, &r.path, ignore, &rel, diff)?;
                    }
                    (false, false) => {
                        if !file_contents_equal(&l.path, &r.path)? {
                            diff.modified.push(rel);
                        }
                    }
                    // A file shadowed by a directory of the same name (or
                    // the reverse) counts as a modification.
                    _ => diff.modified.push(rel),
                }
            }
        }
    }
    Ok(())
}

struct TreeEntry {
    name: OsString,
    path: PathBuf,
    is_dir: bool,
}

fn sorted_entries(root: &Path, ignore: &[&str]) -> Result<Vec<TreeEntry>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut entries = Vec::new();
    for entry in fs::read_dir(root).path_context(root)? {
        let entry = entry.path_context(root)?;
        let name = entry.file_name();
        if ignore.iter().any(|skip| name == **skip) {
            continue;
        }
        let path = entry.path();
        let is_dir = entry.file_type().path_context(&path)?.is_dir();
        entries.push(TreeEntry { name, path, is_dir });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn file_contents_equal(a: &Path, b: &Path) -> Result<bool> {
    let meta_a = fs::metadata(a).path_context(a)?;
    let meta_b = fs::metadata(b).path_context(b)?;
    if meta_a.len() != meta_b.len() {
        return Ok(false);
    }
    let bytes_a = fs::read(a).path_context(a)?;
    let bytes_b = fs::read(b).path_context(b)?;
    Ok(bytes_a == bytes_b)
}

#[cfg(test)]
mod test {
    use std::fs;

    use assert_fs::TempDir;

    use super::*;
    use crate::test_support::write_file;

    #[test]
    fn test_overlay_copy_never_deletes() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write_file(src.path(), "a.txt", "new");
        write_file(src.path(), "sub/b.txt", "nested");
        write_file(dest.path(), "a.txt", "old");
        write_file(dest.path(), "keep.txt", "survivor");

        overlay_copy(src.path(), dest.path()).unwrap();

        assert_eq!(fs::read_to_string(dest.path().join("a.txt")).unwrap(), "new");
        assert_eq!(
            fs::read_to_string(dest.path().join("sub/b.txt")).unwrap(),
            "nested"
        );
        assert_eq!(
            fs::read_to_string(dest.path().join("keep.txt")).unwrap(),
            "survivor"
        );
    }

    #[test]
    fn test_replace_tree_drops_stale_entries() {
        let src = TempDir::new().unwrap();
        let dest = TempDir::new().unwrap();
        write_file(src.path(), "a.txt", "new");
        write_file(dest.path(), "stale.txt", "old");

        let target = dest.path().join("tree");
        fs::create_dir(&target).unwrap();
        fs::rename(dest.path().join("stale.txt"), target.join("stale.txt")).unwrap();
        replace_tree(src.path(), &target).unwrap();

        assert_eq!(fs::read_to_string(target.join("a.txt")).unwrap(), "new");
        assert!(!target.join("stale.txt").exists());
    }

    #[test]
    fn test_compare_classifies_entries() {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        write_file(left.path(), "only_left.txt", "l");
        write_file(right.path(), "only_right.txt", "r");
        write_file(left.path(), "same.txt", "same");
        write_file(right.path(), "same.txt", "same");
        write_file(left.path(), "changed.txt", "one");
        write_file(right.path(), "changed.txt", "two");
        write_file(left.path(), "sub/nested.txt", "a");
        write_file(right.path(), "sub/nested.txt", "b");

        let diff = compare(left.path(), right.path(), &[]).unwrap();

        assert_eq!(diff.left_only, vec![PathBuf::from("only_left.txt")]);
        assert_eq!(diff.right_only, vec![PathBuf::from("only_right.txt")]);
        assert_eq!(
            diff.modified,
            vec![PathBuf::from("changed.txt"), PathBuf::from("sub/nested.txt")]
        );
    }

    #[test]
    fn test_compare_reports_lone_directory_at_its_level() {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        write_file(left.path(), "dir/deep/file.txt", "x");

        let diff = compare(left.path(), right.path(), &[]).unwrap();

        // The directory itself is reported, not its contents.
        assert_eq!(diff.left_only, vec![PathBuf::from("dir")]);
    }

    #[test]
    fn test_compare_honours_ignore_list() {
        let left = TempDir::new().unwrap();
        let right = TempDir::new().unwrap();
        write_file(left.path(), ".wit/references.txt", "HEAD=x");
        write_file(left.path(), "a.txt", "same");
        write_file(right.path(), "a.txt", "same");

        let diff = compare(left.path(), right.path(), &[".wit"]).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn test_compare_missing_root_is_empty_tree() {
        let left = TempDir::new().unwrap();
        write_file(left.path(), "a.txt", "x");

        let diff = compare(left.path(), &left.path().join("absent"), &[]).unwrap();
        assert_eq!(diff.left_only, vec![PathBuf::from("a.txt")]);
        assert!(diff.right_only.is_empty());
    }
}
