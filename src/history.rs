//! History traversal over the commit DAG and the merge planner.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};

use crate::commit::{self, CommitId, CommitMeta};
use crate::error::{Result, WitError};
use crate::refs::RefTable;
use crate::{tree, Repository};

/// All commits reachable from `start`, `start` included. The visited
/// set terminates the walk on merge diamonds.
pub fn ancestors(repo: &Repository, start: &CommitId) -> Result<HashSet<CommitId>> {
    let mut visited = HashSet::new();
    let mut stack = vec![start.clone()];
    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        stack.extend(CommitMeta::load(repo, &id)?.parents);
    }
    Ok(visited)
}

/// Lazily built `child -> parents` mapping for every commit reachable
/// from `start`. Root commits map to an empty list.
pub fn parent_map(repo: &Repository, start: &CommitId) -> Result<HashMap<CommitId, Vec<CommitId>>> {
    let mut map = HashMap::new();
    let mut stack = vec![start.clone()];
    while let Some(id) = stack.pop() {
        if map.contains_key(&id) {
            continue;
        }
        let parents = CommitMeta::load(repo, &id)?.parents;
        stack.extend(parents.iter().cloned());
        map.insert(id, parents);
    }
    Ok(map)
}

/// Folds the named branch into the current HEAD.
///
/// The changes set is every commit reachable from the branch tip but not
/// from HEAD. Each of those images is overlaid onto staging in sorted id
/// order, so repeated merges resolve overlapping files the same way
/// every time; there is no conflict detection beyond last-write-wins.
pub fn merge(repo: &Repository, branch_name: &str) -> Result<CommitId> {
    let table = RefTable::load(repo)?;
    let tip = table
        .tip(branch_name)
        .ok_or_else(|| WitError::BranchNotFound(branch_name.to_string()))?
        .clone();
    if tip == table.head {
        return Err(WitError::NothingToMerge(branch_name.to_string()));
    }

    let branch_ancestors = ancestors(repo, &tip)?;
    let head_ancestors = ancestors(repo, &table.head)?;
    let mut changes: Vec<&CommitId> = branch_ancestors.difference(&head_ancestors).collect();
    changes.sort();
    debug!(branch = branch_name, count = changes.len(), "merge changes set");

    for id in changes {
        tree::overlay_copy(&repo.image_dir(id), &repo.staging_dir())?;
    }

    let message = format!("merge \"{branch_name}\"");
    let merged = commit::create(repo, &message, Some(tip))?;
    info!(%merged, branch = branch_name, "merged");
    Ok(merged)
}
