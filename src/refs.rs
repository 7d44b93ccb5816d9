//! The reference table (`references.txt`) and the active-branch file
//! (`activated.txt`). The table is rewritten whole on every mutation,
//! through a temp file renamed over the old one so a torn write can
//! never be observed.

use std::fs;
use std::io::Write;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::commit::CommitId;
use crate::error::{IoResultExt, Result, WitError};
use crate::Repository;

pub const DEFAULT_BRANCH: &str = "master";
const HEAD_KEY: &str = "HEAD";

/// Which state transition to apply when rewriting the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefUpdate {
    Commit,
    Checkout,
}

/// In-memory form of `references.txt`. Branch rows keep their insertion
/// order; serialization always emits HEAD first and master second.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefTable {
    pub head: CommitId,
    pub master: CommitId,
    branches: Vec<(String, CommitId)>,
}

impl RefTable {
    fn first(head: CommitId) -> Self {
        Self {
            master: head.clone(),
            head,
            branches: Vec::new(),
        }
    }

    /// Loads the table, failing if no commit has created it yet.
    pub fn load(repo: &Repository) -> Result<Self> {
        Self::load_opt(repo)?.ok_or(WitError::ReferencesMissing)
    }

    /// Loads the table, or `None` before the first commit.
    pub fn load_opt(repo: &Repository) -> Result<Option<Self>> {
        let path = repo.references_path();
        if !path.is_file() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&path).path_context(&path)?;
        Self::parse(&raw).map(Some)
    }

    fn parse(raw: &str) -> Result<Self> {
        let corrupt = |reason: &str| WitError::CorruptReferences(reason.to_string());
        let mut head = None;
        let mut master = None;
        let mut branches = Vec::new();
        for line in raw.lines() {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line
                .split_once('=')
                .ok_or_else(|| corrupt("line without key=value"))?;
            let id = CommitId::parse(value).map_err(|_| corrupt("value is not a commit id"))?;
            match key {
                HEAD_KEY => head = Some(id),
                DEFAULT_BRANCH => master = Some(id),
                _ => branches.push((key.to_string(), id)),
            }
        }
        Ok(Self {
            head: head.ok_or_else(|| corrupt("missing HEAD row"))?,
            master: master.ok_or_else(|| corrupt("missing master row"))?,
            branches,
        })
    }

    fn serialize(&self) -> String {
        let mut out = format!("{HEAD_KEY}={}\n{DEFAULT_BRANCH}={}\n", self.head, self.master);
        for (name, id) in &self.branches {
            out.push_str(&format!("{name}={id}\n"));
        }
        out
    }

    /// Atomically replaces `references.txt` with this table.
    pub fn save(&self, repo: &Repository) -> Result<()> {
        let wit_dir = repo.wit_dir();
        let mut temp = NamedTempFile::new_in(&wit_dir).path_context(&wit_dir)?;
        temp.write_all(self.serialize().as_bytes())
            .path_context(repo.references_path())?;
        temp.persist(repo.references_path())
            .map_err(|err| WitError::Io {
                path: repo.references_path(),
                source: err.error,
            })?;
        Ok(())
    }

    /// Resolves any named tip: master or a user branch.
    pub fn tip(&self, name: &str) -> Option<&CommitId> {
        if name == DEFAULT_BRANCH {
            return Some(&self.master);
        }
        self.branches
            .iter()
            .find(|(branch, _)| branch == name)
            .map(|(_, id)| id)
    }

    fn set_tip(&mut self, name: &str, id: CommitId) {
        if name == DEFAULT_BRANCH {
            self.master = id;
        } else if let Some(row) = self.branches.iter_mut().find(|(branch, _)| branch == name) {
            row.1 = id;
        }
    }

    /// Whether `name` is already a key in the table, HEAD included.
    pub fn contains_key(&self, name: &str) -> bool {
        name == HEAD_KEY || name == DEFAULT_BRANCH || self.tip(name).is_some()
    }

    /// User branches, master excluded.
    pub fn branches(&self) -> impl Iterator<Item = (&str, &CommitId)> {
        self.branches.iter().map(|(name, id)| (name.as_str(), id))
    }
}

/// Reads the active branch name; `None` means HEAD is detached.
pub fn active_branch(repo: &Repository) -> Result<Option<String>> {
    let path = repo.activated_path();
    let raw = fs::read_to_string(&path).path_context(&path)?;
    let name = raw.trim_end_matches('\n');
    if name.is_empty() {
        Ok(None)
    } else {
        Ok(Some(name.to_string()))
    }
}

/// Overwrites the active branch name; the empty string detaches HEAD.
pub fn set_active(repo: &Repository, name: &str) -> Result<()> {
    let path = repo.activated_path();
    fs::write(&path, name).path_context(&path)
}

/// Applies one reference-table transition for a freshly created commit
/// or a checkout target.
pub fn update(repo: &Repository, id: &CommitId, flow: RefUpdate) -> Result<()> {
    match flow {
        RefUpdate::Commit => update_on_commit(repo, id),
        RefUpdate::Checkout => update_on_checkout(repo, id),
    }
}

fn update_on_commit(repo: &Repository, new_id: &CommitId) -> Result<()> {
    let Some(mut table) = RefTable::load_opt(repo)? else {
        debug!(%new_id, "writing first reference table");
        return RefTable::first(new_id.clone()).save(repo);
    };

    // All conditions are judged against the pre-commit snapshot. The
    // active branch (master included) advances only when its tip was in
    // sync with HEAD; a detached or stale HEAD moves alone.
    let prev_head = table.head.clone();
    let active = active_branch(repo)?;
    let prev_active_tip = active.as_deref().and_then(|name| table.tip(name).cloned());

    if prev_active_tip.as_ref() == Some(&prev_head) {
        if let Some(name) = &active {
            table.set_tip(name, new_id.clone());
        }
    }
    table.head = new_id.clone();
    table.save(repo)
}

fn update_on_checkout(repo: &Repository, target: &CommitId) -> Result<()> {
    let mut table = RefTable::load(repo)?;
    if *target == table.master {
        table.master = target.clone();
    }
    table.head = target.clone();
    table.save(repo)
}

/// Records a new branch pointing at the current HEAD.
pub fn create_branch(repo: &Repository, name: &str) -> Result<()> {
    let mut table = RefTable::load(repo)?;
    if table.contains_key(name) {
        return Err(WitError::BranchExists(name.to_string()));
    }
    let head = table.head.clone();
    table.branches.push((name.to_string(), head));
    table.save(repo)
}
