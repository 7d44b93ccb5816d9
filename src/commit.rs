//! Commit ids, commit metadata, and the commit engine.

use std::fmt::{self, Display};
use std::fs;

use chrono::Local;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use tracing::info;

use crate::error::{IoResultExt, Result, WitError};
use crate::refs::{self, RefTable, RefUpdate};
use crate::{tree, Repository};

const ID_LEN: usize = 40;
const ID_ALPHABET: &[u8] = b"abcdef0123456789";
const DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y %z";
const NO_PARENT: &str = "None";

static COMMIT_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-f0-9]{40}$").unwrap());

/// A 40-character lowercase hex commit id. Drawn uniformly at random,
/// never content-derived.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommitId(String);

impl CommitId {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let id = (0..ID_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();
        Self(id)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        if COMMIT_ID.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(WitError::CommitNotFound(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three fixed metadata lines stored next to each image:
/// `parent=`, `date=`, `message=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitMeta {
    pub parents: Vec<CommitId>,
    pub date: String,
    pub message: String,
}

impl CommitMeta {
    pub fn new(parents: Vec<CommitId>, message: &str) -> Self {
        Self {
            parents,
            date: Local::now().format(DATE_FORMAT).to_string(),
            message: message.to_string(),
        }
    }

    fn parent_field(&self) -> String {
        if self.parents.is_empty() {
            NO_PARENT.to_string()
        } else {
            self.parents
                .iter()
                .map(CommitId::as_str)
                .collect::<Vec<_>>()
                .join(",")
        }
    }

    pub fn serialize(&self) -> String {
        format!(
            "parent={}\ndate={}\nmessage={}\n",
            self.parent_field(),
            self.date,
            self.message
        )
    }

    pub fn parse(id: &CommitId, raw: &str) -> Result<Self> {
        let corrupt = |reason: &str| WitError::CorruptMetadata {
            id: id.to_string(),
            reason: reason.to_string(),
        };
        let mut lines = raw.lines();
        let parent_line = lines.next().ok_or_else(|| corrupt("empty file"))?;
        let date_line = lines.next().ok_or_else(|| corrupt("missing date line"))?;
        let message_line = lines.next().ok_or_else(|| corrupt("missing message line"))?;

        let parent_value = parent_line
            .strip_prefix("parent=")
            .ok_or_else(|| corrupt("first line is not parent="))?;
        let date = date_line
            .strip_prefix("date=")
            .ok_or_else(|| corrupt("second line is not date="))?;
        let message = message_line
            .strip_prefix("message=")
            .ok_or_else(|| corrupt("third line is not message="))?;

        let parents = if parent_value == NO_PARENT {
            Vec::new()
        } else {
            parent_value
                .split(',')
                .map(|p| CommitId::parse(p).map_err(|_| corrupt("bad parent id")))
                .collect::<Result<Vec<_>>>()?
        };

        Ok(Self {
            parents,
            date: date.to_string(),
            message: message.to_string(),
        })
    }

    pub fn load(repo: &Repository, id: &CommitId) -> Result<Self> {
        let path = repo.image_meta_path(id);
        if !path.is_file() {
            return Err(WitError::CommitNotFound(id.to_string()));
        }
        let raw = fs::read_to_string(&path).path_context(&path)?;
        Self::parse(id, &raw)
    }
}

/// Snapshots the staging tree as a new image and advances the references.
///
/// Guarded by change detection: committing a staging tree with nothing
/// new or modified relative to the HEAD image is refused. The guard is
/// skipped for the very first commit, before any HEAD exists.
pub fn create(
    repo: &Repository,
    message: &str,
    merge_parent: Option<CommitId>,
) -> Result<CommitId> {
    let table = RefTable::load_opt(repo)?;
    if let Some(table) = &table {
        let head_image = repo.image_dir(&table.head);
        let staged = tree::compare(&repo.staging_dir(), &head_image, &[])?;
        if staged.left_only.is_empty() && staged.modified.is_empty() {
            return Err(WitError::NoChanges);
        }
    }

    let id = CommitId::generate();
    let image = repo.image_dir(&id);
    if image.exists() {
        return Err(WitError::CommitIdCollision(id.to_string()));
    }
    fs::create_dir(&image).path_context(&image)?;

    let mut parents: Vec<CommitId> = table
        .as_ref()
        .map(|t| vec![t.head.clone()])
        .unwrap_or_default();
    if let Some(merge_parent) = merge_parent {
        parents.push(merge_parent);
    }
    let meta = CommitMeta::new(parents, message);
    let meta_path = repo.image_meta_path(&id);
    fs::write(&meta_path, meta.serialize()).path_context(&meta_path)?;

    tree::overlay_copy(&repo.staging_dir(), &image)?;
    refs::update(repo, &id, RefUpdate::Commit)?;

    info!(%id, message, "created commit");
    Ok(id)
}

#[cfg(test)]
mod test {
    use assert_fs::TempDir;
    use rstest::rstest;

    use super::*;
    use crate::test_support::{init_repo, write_file};
    use crate::staging;

    #[test]
    fn test_generated_ids_use_the_hex_alphabet() {
        for _ in 0..32 {
            let id = CommitId::generate();
            assert!(COMMIT_ID.is_match(id.as_str()), "bad id: {id}");
        }
    }

    #[rstest]
    #[case::short("abc123")]
    #[case::bad_alphabet("gggggggggggggggggggggggggggggggggggggggg")]
    #[case::uppercase("ABCDEF0123456789ABCDEF0123456789ABCDEF01")]
    fn test_reject_malformed_ids(#[case] raw: &str) {
        assert!(CommitId::parse(raw).is_err());
    }

    #[test]
    fn test_meta_serialization_round_trip_for_merge_parents() {
        let id = CommitId::generate();
        let parents = vec![CommitId::generate(), CommitId::generate()];
        let meta = CommitMeta::new(parents.clone(), "merge \"feature\"");

        let parsed = CommitMeta::parse(&id, &meta.serialize()).unwrap();
        assert_eq!(parsed.parents, parents);
        assert_eq!(parsed.message, "merge \"feature\"");
    }

    #[test]
    fn test_root_commit_has_parent_none() {
        let meta = CommitMeta::new(vec![], "first");
        assert!(meta.serialize().starts_with("parent=None\n"));
    }

    #[test]
    fn test_date_carries_timezone_offset() {
        let meta = CommitMeta::new(vec![], "m");
        // e.g. "Sat Aug 01 12:30:00 2026 +0000"
        let date = &meta.date;
        assert!(date.ends_with(|c: char| c.is_ascii_digit()));
        assert!(date.contains('+') || date.contains('-'), "no offset: {date}");
    }

    #[test]
    fn test_first_commit_writes_image_and_references() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(&dir);
        write_file(dir.path(), "a.txt", "hello");
        staging::add(&[dir.path().join("a.txt")]).unwrap();

        let id = create(&repo, "first", None).unwrap();

        assert_eq!(
            std::fs::read_to_string(repo.image_dir(&id).join("a.txt")).unwrap(),
            "hello"
        );
        let meta = CommitMeta::load(&repo, &id).unwrap();
        assert!(meta.parents.is_empty());
        let table = RefTable::load(&repo).unwrap();
        assert_eq!(table.head, id);
        assert_eq!(table.master, id);
    }

    #[test]
    fn test_second_commit_records_parent() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(&dir);
        write_file(dir.path(), "a.txt", "hello");
        staging::add(&[dir.path().join("a.txt")]).unwrap();
        let first = create(&repo, "first", None).unwrap();

        write_file(dir.path(), "a.txt", "hello2");
        staging::add(&[dir.path().join("a.txt")]).unwrap();
        let second = create(&repo, "second", None).unwrap();

        let meta = CommitMeta::load(&repo, &second).unwrap();
        assert_eq!(meta.parents, vec![first]);
    }

    #[test]
    fn test_unchanged_staging_is_refused() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(&dir);
        write_file(dir.path(), "a.txt", "hello");
        staging::add(&[dir.path().join("a.txt")]).unwrap();
        create(&repo, "first", None).unwrap();

        let err = create(&repo, "again", None).unwrap_err();
        assert!(matches!(err, WitError::NoChanges));
    }

    #[test]
    fn test_empty_staging_commits_on_fresh_repo() {
        // No HEAD yet, so the change guard does not apply.
        let dir = TempDir::new().unwrap();
        let repo = init_repo(&dir);

        let id = create(&repo, "empty root", None).unwrap();
        assert!(repo.image_dir(&id).is_dir());
    }

    #[test]
    fn test_staging_and_image_are_tree_equal_after_commit() {
        let dir = TempDir::new().unwrap();
        let repo = init_repo(&dir);
        write_file(dir.path(), "src/deep/f.txt", "body");
        staging::add(&[dir.path().join("src")]).unwrap();

        let id = create(&repo, "tree", None).unwrap();

        let diff = tree::compare(&repo.staging_dir(), &repo.image_dir(&id), &[]).unwrap();
        assert!(diff.is_empty());
    }
}
